// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! High-rate controller state and tick.
//!
//! The controller is the data-plane half of the kernel: per tick it
//! arbitrates proposals, clamps the winners (absolute then dynamics),
//! rejects DOF conflicts and commits the survivors to history. It owns the
//! active lease, the active envelope and the per-space command history.
//!
//! State machine:
//!
//! - `READY` (lease installed, not stopped) stays `READY` while ticks
//!   succeed, becomes `EXPIRED` when a tick observes the lease past its
//!   window (the lease is cleared), and returns to `READY` on a fresh
//!   install.
//! - `READY` or `EXPIRED` become `ESTOPPED` on [`ControllerState::apply_estop`],
//!   which clears the lease.
//! - `ESTOPPED` is terminal until [`ControllerState::clear_estop`] followed
//!   by a new install.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::arbiter::arbitrate;
use crate::command::MaskedCommand;
use crate::envelope::Envelope;
use crate::lease::CapabilityLease;
use crate::limits::{clamp_dynamics, clamp_to_lease};
use crate::space::ControlSpace;

/// Smallest tick delta used for dynamics bounds.
const MIN_TICK_DT_S: f64 = 0.001;
/// Largest tick delta used for dynamics bounds; longer stalls are treated
/// as 100 ms so a sleeping system cannot buy itself a huge velocity step.
const MAX_TICK_DT_S: f64 = 0.1;

/// Lease installation failure.
#[derive(Debug, Error, PartialEq)]
pub enum InstallError {
    /// The controller is latched stopped.
    #[error("E-STOP active")]
    EstopActive,
    /// The lease's validity window does not cover the install time.
    #[error("lease {lease_id} not active at t={now_t}")]
    NotActive {
        /// Identifier of the rejected lease.
        lease_id: String,
        /// Install time.
        now_t: f64,
    },
    /// The lease does not supersede the currently installed one.
    #[error("lease seq {proposed} does not supersede active seq {active}")]
    StaleSeq {
        /// Sequence of the rejected lease.
        proposed: u64,
        /// Sequence of the installed lease.
        active: u64,
    },
}

/// Outcome of one controller tick.
#[derive(Clone, Debug, PartialEq)]
pub struct ControllerOutput {
    /// Whether the tick produced commands.
    pub ok: bool,
    /// Human-readable explanation.
    pub reason: String,
    /// Final clamped command per space; empty on failure. The actuator
    /// layer merges these to full DOF and holds unspecified joints.
    pub final_by_space: BTreeMap<ControlSpace, MaskedCommand>,
}

impl ControllerOutput {
    fn reject(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: reason.into(),
            final_by_space: BTreeMap::new(),
        }
    }
}

/// Mutable controller state. Owned by exactly one caller (the kernel
/// loop); the core performs no locking.
#[derive(Clone, Debug, Default)]
pub struct ControllerState {
    active_lease: Option<CapabilityLease>,
    active_envelope: Option<Envelope>,
    estop: bool,
    last_commands: BTreeMap<ControlSpace, MaskedCommand>,
    last_tick_t: f64,
}

impl ControllerState {
    /// Creates an empty controller: no lease, no envelope, not stopped.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently installed lease, if any.
    #[must_use]
    pub fn active_lease(&self) -> Option<&CapabilityLease> {
        self.active_lease.as_ref()
    }

    /// Currently installed envelope, if any.
    #[must_use]
    pub fn active_envelope(&self) -> Option<&Envelope> {
        self.active_envelope.as_ref()
    }

    /// Whether the emergency stop is latched.
    #[must_use]
    pub fn is_estopped(&self) -> bool {
        self.estop
    }

    /// Last committed command per space.
    #[must_use]
    pub fn last_commands(&self) -> &BTreeMap<ControlSpace, MaskedCommand> {
        &self.last_commands
    }

    /// Latches the emergency stop and revokes the lease. Irreversible
    /// until [`ControllerState::clear_estop`].
    pub fn apply_estop(&mut self) {
        self.estop = true;
        self.active_lease = None;
    }

    /// Releases the emergency stop latch. Motion stays blocked until a new
    /// lease is installed.
    pub fn clear_estop(&mut self) {
        self.estop = false;
    }

    /// Installs a lease (and optionally the envelope used for dynamics
    /// limits).
    ///
    /// Rejected while stopped, when the lease is not active at `now_t`, or
    /// when its sequence does not exceed the installed lease's. Command
    /// history is kept across installs: an authority change under a new
    /// lease still rate-limits against the previous tick rather than
    /// allowing a step change.
    pub fn install_lease(
        &mut self,
        lease: CapabilityLease,
        now_t: f64,
        envelope: Option<Envelope>,
    ) -> Result<(), InstallError> {
        if self.estop {
            return Err(InstallError::EstopActive);
        }
        if !lease.is_active_at(now_t) {
            return Err(InstallError::NotActive {
                lease_id: lease.lease_id,
                now_t,
            });
        }
        if let Some(active) = &self.active_lease {
            if lease.seq <= active.seq {
                return Err(InstallError::StaleSeq {
                    proposed: lease.seq,
                    active: active.seq,
                });
            }
        }
        self.active_lease = Some(lease);
        self.active_envelope = envelope;
        Ok(())
    }

    /// Runs one data-plane tick over `proposals`.
    ///
    /// Protocol: E-STOP and lease validity first, then arbitration, then
    /// per-space absolute and dynamics clamps in lexicographic space
    /// order, then the DOF conflict check. Any failure aborts the tick
    /// with an empty final map; success commits the clamped commands to
    /// history.
    pub fn step(&mut self, now_t: f64, proposals: &[MaskedCommand]) -> ControllerOutput {
        if self.estop {
            return ControllerOutput::reject("E-STOP active");
        }
        let Some(lease) = self.active_lease.clone() else {
            return ControllerOutput::reject("no active lease");
        };
        if !lease.is_active_at(now_t) {
            self.active_lease = None;
            return ControllerOutput::reject("lease expired");
        }

        let dt = (now_t - self.last_tick_t).max(MIN_TICK_DT_S).min(MAX_TICK_DT_S);

        let arb = arbitrate(&lease, proposals);
        if !arb.ok {
            return ControllerOutput::reject(format!("arbiter reject: {}", arb.reason));
        }

        let mut final_by_space: BTreeMap<ControlSpace, MaskedCommand> = BTreeMap::new();
        for (&space, cmd) in &arb.selected_by_space {
            let clamped_abs = match clamp_to_lease(cmd, &lease) {
                Ok(c) => c,
                Err(e) => {
                    return ControllerOutput::reject(format!(
                        "absolute clamp reject in {space}: {e}"
                    ));
                }
            };
            let clamped = if let Some(envelope) = &self.active_envelope {
                match clamp_dynamics(&clamped_abs, self.last_commands.get(&space), envelope, dt) {
                    Ok(c) => c,
                    Err(e) => {
                        return ControllerOutput::reject(format!(
                            "dynamics clamp reject in {space}: {e}"
                        ));
                    }
                }
            } else {
                clamped_abs
            };
            final_by_space.insert(space, clamped);
        }

        let mut used: FxHashSet<usize> = FxHashSet::default();
        for cmd in final_by_space.values() {
            let mut overlap: Vec<usize> = cmd
                .dof_mask()
                .iter()
                .copied()
                .filter(|i| used.contains(i))
                .collect();
            if !overlap.is_empty() {
                overlap.sort_unstable();
                return ControllerOutput::reject(format!("DOF conflict: {overlap:?}"));
            }
            used.extend(cmd.dof_mask().iter().copied());
        }

        #[cfg(feature = "telemetry")]
        crate::telemetry::tick(now_t, true, final_by_space.len());

        self.last_commands = final_by_space.clone();
        self.last_tick_t = now_t;

        ControllerOutput {
            ok: true,
            reason: "OK".to_owned(),
            final_by_space,
        }
    }
}
