// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Task phases.

/// Phase of the task state machine the kernel tracks for the running skill.
///
/// Which transitions are legal is not encoded here; envelopes carry the
/// allowed phase-edge set and the gate checks proposed transitions against
/// it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    /// No task in progress; skills and envelopes may be changed.
    Idle,
    /// Moving toward the work area.
    Approach,
    /// Fine alignment before contact.
    Align,
    /// Closing on the object.
    Grasp,
    /// Carrying the object upward.
    Lift,
    /// Withdrawing from the work area.
    Retreat,
    /// Recovering from a fault; skills and envelopes may be changed.
    Recovery,
    /// Terminal phase; no further transitions.
    Terminated,
}

impl Phase {
    /// Wire name of the phase.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Approach => "APPROACH",
            Self::Align => "ALIGN",
            Self::Grasp => "GRASP",
            Self::Lift => "LIFT",
            Self::Retreat => "RETREAT",
            Self::Recovery => "RECOVERY",
            Self::Terminated => "TERMINATED",
        }
    }

    /// Whether skills and envelopes may be swapped in this phase.
    #[must_use]
    pub fn allows_reconfiguration(self) -> bool {
        matches!(self, Self::Idle | Self::Recovery)
    }
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
