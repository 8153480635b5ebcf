// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! HOLD semantics for uncommanded joints.

use std::collections::BTreeMap;

use crate::space::{CommandKind, ControlSpace};

/// Per-space HOLD preference for joints no command drives this tick.
///
/// HOLD values equal their identity: current `q` for a position hold, zero
/// for velocity and torque holds. The preference only decides which target
/// vector the actuator builder allocates for a space's idle joints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HoldPolicy {
    /// Space → hold kind for joints owned by that space. A space with no
    /// entry gets no HOLD treatment at all.
    pub preferred_hold_kind: BTreeMap<ControlSpace, CommandKind>,
}

impl Default for HoldPolicy {
    /// Conservative default: hold the arm at its current position, hold
    /// everything else with zero velocity.
    fn default() -> Self {
        let mut preferred_hold_kind = BTreeMap::new();
        preferred_hold_kind.insert(ControlSpace::Arm, CommandKind::JointPosition);
        preferred_hold_kind.insert(ControlSpace::Base, CommandKind::JointVelocity);
        preferred_hold_kind.insert(ControlSpace::Legs, CommandKind::JointVelocity);
        preferred_hold_kind.insert(ControlSpace::WholeBody, CommandKind::JointVelocity);
        Self {
            preferred_hold_kind,
        }
    }
}
