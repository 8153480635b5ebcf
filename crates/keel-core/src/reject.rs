// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Stable rejection codes.
//!
//! Every admission failure in the kernel maps to exactly one of these
//! codes. The wire strings are a compatibility surface: reporting and
//! replay tooling key on them, so renames are breaking changes.

/// Stable machine-readable code attached to admission decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RejectCode {
    /// Accepted; not a rejection.
    Ok,
    /// Ledger ordering or replay violation.
    OrderViolation,
    /// Envelope does not apply to the snapshot's environment fingerprint.
    EnvScopeMismatch,
    /// Snapshot field timestamps spread wider than the skew budget.
    SnapshotSkew,
    /// Oldest snapshot field is older than the staleness budget.
    SnapshotStale,
    /// Snapshot contains future-dated signals.
    SnapshotFuture,
    /// Perception degraded and the envelope does not opt in.
    PerceptionDegraded,
    /// Perception untrusted and the envelope does not opt in.
    PerceptionUntrusted,
    /// State and envelope disagree about the DOF count.
    DofMismatch,
    /// A masked DOF index is out of range for the lease.
    DofOutOfBounds,
    /// A joint position violates the envelope bounds.
    JointLimit,
    /// A joint velocity violates the envelope bounds.
    JointVelocity,
    /// End-effector outside the workspace box.
    EeWorkspace,
    /// End-effector inside an exclusion zone.
    EeInZone,
    /// Lease bound vectors have inconsistent shapes.
    LeaseShape,
    /// Action not allowed in the current phase.
    PhaseRule,
    /// Proposed phase transition is not a legal edge.
    PhaseEdge,
    /// Skill name is not known to the kernel.
    UnknownSkill,
    /// Goal payload failed validation.
    BadGoal,
    /// Action payload is missing a required field.
    BadAction,
    /// Action kind is not recognized.
    BadActionKind,
    /// Torque commanded under a lease without torque bounds.
    TorqueNotAllowed,
    /// Time delta unusable for a dynamics check.
    BadDt,
}

impl RejectCode {
    /// Stable wire string for this code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::OrderViolation => "ORDER_VIOLATION",
            Self::EnvScopeMismatch => "ENV_SCOPE_MISMATCH",
            Self::SnapshotSkew => "SNAPSHOT_SKEW",
            Self::SnapshotStale => "SNAPSHOT_STALE",
            Self::SnapshotFuture => "SNAPSHOT_FUTURE",
            Self::PerceptionDegraded => "PERCEPTION_DEGRADED",
            Self::PerceptionUntrusted => "PERCEPTION_UNTRUSTED",
            Self::DofMismatch => "DOF_MISMATCH",
            Self::DofOutOfBounds => "DOF_OOB",
            Self::JointLimit => "JOINT_LIMIT",
            Self::JointVelocity => "JOINT_VELOCITY",
            Self::EeWorkspace => "EE_WORKSPACE",
            Self::EeInZone => "EE_IN_ZONE",
            Self::LeaseShape => "LEASE_SHAPE",
            Self::PhaseRule => "PHASE_RULE",
            Self::PhaseEdge => "PHASE_EDGE",
            Self::UnknownSkill => "UNKNOWN_SKILL",
            Self::BadGoal => "BAD_GOAL",
            Self::BadAction => "BAD_ACTION",
            Self::BadActionKind => "BAD_ACTION_KIND",
            Self::TorqueNotAllowed => "TORQUE_NOT_ALLOWED",
            Self::BadDt => "BAD_DT",
        }
    }
}

impl core::fmt::Display for RejectCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
