// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Control-plane actions.
//!
//! Actions are the discrete mutations a planner proposes against the
//! kernel: skill lifecycle, goals, phase transitions, envelope swaps and
//! the emergency stop. They are sequenced by the ledger and admitted (or
//! not) by the gate.

use crate::phase::Phase;

/// Discriminant of a control-plane action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionKind {
    /// Enable a named skill.
    EnableSkill,
    /// Disable a named skill.
    DisableSkill,
    /// Hand the active skill a new goal.
    SetGoal,
    /// Transition the task phase.
    SetPhase,
    /// Swap the active safety envelope.
    ApplyEnvelope,
    /// Emergency stop. Bypasses sequencing and most gate checks.
    EmergencyStop,
}

impl ActionKind {
    /// Wire name of the action kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnableSkill => "ENABLE_SKILL",
            Self::DisableSkill => "DISABLE_SKILL",
            Self::SetGoal => "SET_GOAL",
            Self::SetPhase => "SET_PHASE",
            Self::ApplyEnvelope => "APPLY_ENVELOPE",
            Self::EmergencyStop => "EMERGENCY_STOP",
        }
    }
}

impl core::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Goal types the gate accepts, sorted. The goal payload crosses a trust
/// boundary (it comes from a planner), so the type stays a string and is
/// validated here rather than being a closed enum.
pub const GOAL_TYPES: [&str; 4] = ["grasp", "lift", "move_base", "reach"];

/// A shallow, checkable goal payload.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Goal {
    /// Planner-declared goal type; must be one of [`GOAL_TYPES`].
    pub goal_type: String,
    /// Optional workspace target.
    pub target_xyz: Option<[f64; 3]>,
}

impl Goal {
    /// Builds a goal of the given type with no target.
    pub fn new(goal_type: impl Into<String>) -> Self {
        Self {
            goal_type: goal_type.into(),
            target_xyz: None,
        }
    }

    /// Attaches a workspace target.
    #[must_use]
    pub fn with_target(mut self, target_xyz: [f64; 3]) -> Self {
        self.target_xyz = Some(target_xyz);
        self
    }
}

/// A proposed control-plane mutation.
///
/// `seq` must be exactly one past the ledger's last committed sequence
/// (emergency stops are exempt). `action_id`, when present, makes the
/// action at-most-once: the ledger rejects a second application.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Action {
    /// What the action does.
    pub kind: ActionKind,
    /// Proposed sequence number.
    pub seq: u64,
    /// Skill name for `EnableSkill` / `DisableSkill`.
    pub skill_name: Option<String>,
    /// Goal payload for `SetGoal`.
    pub goal: Option<Goal>,
    /// Target phase for `SetPhase`.
    pub next_phase: Option<Phase>,
    /// Envelope catalog name for `ApplyEnvelope`.
    pub envelope_name: Option<String>,
    /// Idempotency key for replay protection.
    pub action_id: Option<String>,
}

impl Action {
    fn base(kind: ActionKind, seq: u64) -> Self {
        Self {
            kind,
            seq,
            skill_name: None,
            goal: None,
            next_phase: None,
            envelope_name: None,
            action_id: None,
        }
    }

    /// Proposes enabling a skill.
    pub fn enable_skill(seq: u64, skill: impl Into<String>) -> Self {
        let mut a = Self::base(ActionKind::EnableSkill, seq);
        a.skill_name = Some(skill.into());
        a
    }

    /// Proposes disabling a skill.
    pub fn disable_skill(seq: u64, skill: impl Into<String>) -> Self {
        let mut a = Self::base(ActionKind::DisableSkill, seq);
        a.skill_name = Some(skill.into());
        a
    }

    /// Proposes a new goal.
    #[must_use]
    pub fn set_goal(seq: u64, goal: Goal) -> Self {
        let mut a = Self::base(ActionKind::SetGoal, seq);
        a.goal = Some(goal);
        a
    }

    /// Proposes a phase transition.
    #[must_use]
    pub fn set_phase(seq: u64, next_phase: Phase) -> Self {
        let mut a = Self::base(ActionKind::SetPhase, seq);
        a.next_phase = Some(next_phase);
        a
    }

    /// Proposes swapping the active envelope.
    pub fn apply_envelope(seq: u64, envelope: impl Into<String>) -> Self {
        let mut a = Self::base(ActionKind::ApplyEnvelope, seq);
        a.envelope_name = Some(envelope.into());
        a
    }

    /// Proposes an emergency stop.
    #[must_use]
    pub fn emergency_stop(seq: u64) -> Self {
        Self::base(ActionKind::EmergencyStop, seq)
    }

    /// Attaches an idempotency key.
    #[must_use]
    pub fn with_action_id(mut self, action_id: impl Into<String>) -> Self {
        self.action_id = Some(action_id.into());
        self
    }
}
