// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Bounded state snapshots.
//!
//! The gate never consumes raw streaming signals. It consumes a snapshot in
//! which every field carries its own acquisition timestamp, and validates
//! the skew / staleness / future-dating invariants against the active
//! envelope's budgets before admitting any control-plane action.

use std::collections::BTreeMap;

/// Trust level reported by the perception stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PerceptionTrust {
    /// Perception output is trustworthy.
    Valid,
    /// Perception output is usable but degraded (e.g. partial occlusion).
    Degraded,
    /// Perception output must not be acted upon.
    Untrusted,
}

impl PerceptionTrust {
    /// Wire name of the trust level.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::Degraded => "DEGRADED",
            Self::Untrusted => "UNTRUSTED",
        }
    }
}

/// A value paired with the monotonic time it was acquired.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamped<T> {
    /// The sampled value.
    pub value: T,
    /// Acquisition time (monotonic seconds).
    pub t: f64,
}

impl<T> Timestamped<T> {
    /// Pairs `value` with its acquisition time.
    pub fn new(value: T, t: f64) -> Self {
        Self { value, t }
    }
}

/// End-effector pose as `(x, y, z, qw, qx, qy, qz)`.
pub type EePose = [f64; 7];

/// A bounded snapshot of robot and environment state.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateSnapshot {
    /// Time at which the kernel is evaluating this snapshot.
    pub t_kernel: f64,
    /// Full-DOF joint positions.
    pub joints_q: Timestamped<Vec<f64>>,
    /// Full-DOF joint velocities.
    pub joints_qd: Timestamped<Vec<f64>>,
    /// End-effector pose, if the platform publishes one.
    pub ee_pose: Timestamped<Option<EePose>>,
    /// Named contact states, e.g. `{"left_foot": true}`.
    pub contacts: Timestamped<BTreeMap<String, bool>>,
    /// Perception trust level.
    pub perception_trust: Timestamped<PerceptionTrust>,
    /// Current task phase tracked by the kernel.
    pub phase: crate::phase::Phase,
    /// Last committed control-plane sequence number.
    pub seq: u64,
    /// Environment fingerprint used for envelope scoping,
    /// e.g. `"lab_v1|camrig_v3|lighting_industrial"`.
    pub env_fingerprint: String,
}

impl StateSnapshot {
    /// Acquisition timestamps of all per-field signals, in declaration
    /// order. The gate folds these for the skew and staleness checks.
    #[must_use]
    pub fn field_timestamps(&self) -> [f64; 5] {
        [
            self.joints_q.t,
            self.joints_qd.t,
            self.ee_pose.t,
            self.contacts.t,
            self.perception_trust.t,
        ]
    }
}
