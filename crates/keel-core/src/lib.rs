// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! keel-core: deterministic multi-space robot safety kernel.
//!
//! The kernel is the sole authority deciding whether an actuator vector may
//! leave the process. Two coupled subsystems share one data model:
//!
//! - the **gate** admits or rejects discrete control-plane actions
//!   (skill lifecycle, goals, phases, envelope swaps, emergency stop)
//!   against a bounded state snapshot, the active envelope and the action
//!   ledger;
//! - the **controller pipeline** runs at tick rate: aggregate safety
//!   events, inject safety commands, arbitrate per space, clamp to the
//!   lease, clamp dynamics against history, reject DOF conflicts and merge
//!   the survivors into full-DOF actuator targets with per-space HOLD.
//!
//! Determinism contract
//! - Every operation is a pure function of its inputs (the controller tick
//!   additionally mutates [`ControllerState`]); nothing blocks, sleeps,
//!   performs I/O or reads a clock.
//! - All iteration over space and source maps is by sorted key, so outputs
//!   — including tie-broken reason strings — are byte-stable given equal
//!   inputs and prior state.
//! - IEEE-754 arithmetic only, in fixed evaluation order; no hash-order
//!   leakage into any output.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::redundant_pub_crate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::use_self,
    clippy::float_cmp,
    clippy::cast_precision_loss
)]

pub mod action;
pub mod actuator;
pub mod arbiter;
pub mod catalog;
pub mod command;
pub mod controller;
pub mod envelope;
pub mod gate;
pub mod hold;
pub mod injector;
pub mod lease;
pub mod ledger;
pub mod limits;
pub mod monitor;
pub mod partition;
pub mod phase;
pub mod reject;
pub mod snapshot;
pub mod space;
/// Best-effort JSONL diagnostics; compiled in only with the `telemetry`
/// feature and never part of the deterministic outputs.
pub mod telemetry;

pub use action::{Action, ActionKind, Goal, GOAL_TYPES};
pub use actuator::{build_actuator_targets, ActuatorTargets, BuildResult};
pub use arbiter::{arbitrate, ArbiterDecision};
pub use catalog::{default_envelopes, tighten, BASELINE_ENVELOPE};
pub use command::{CommandShapeError, MaskedCommand, SAFETY_SOURCE};
pub use controller::{ControllerOutput, ControllerState, InstallError};
pub use envelope::{Aabb, Envelope};
pub use gate::{gate, GateDecision};
pub use hold::HoldPolicy;
pub use injector::{inject_safety_commands, SafetyInjectorConfig};
pub use lease::CapabilityLease;
pub use ledger::{Ledger, LedgerError};
pub use limits::{clamp_dynamics, clamp_to_lease, LimitError};
pub use monitor::{aggregate, MonitorRegistry, SafetyEvent, SafetyLevel};
pub use partition::{SpaceDofs, SpaceDofsError};
pub use phase::Phase;
pub use reject::RejectCode;
pub use snapshot::{EePose, PerceptionTrust, StateSnapshot, Timestamped};
pub use space::{CommandKind, ControlSpace};
