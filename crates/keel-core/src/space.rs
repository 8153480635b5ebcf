// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Control spaces and command kinds.
//!
//! Ordering invariant:
//! - Every per-space iteration in the kernel runs in lexicographic order of
//!   the space's wire name, so reason strings and merged outputs are
//!   byte-stable across runs.
//! - Variants are declared in lexicographic wire-name order; the derived
//!   `Ord` therefore *is* the wire-name order. Keep it that way when adding
//!   a variant.

/// A logical partition of the robot's joints that one authority commands at
/// a time.
///
/// `WholeBody` is mutually exclusive with every other space within a single
/// tick; the actuator builder rejects mixed selections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControlSpace {
    /// Manipulator joints.
    Arm,
    /// Mobile base joints (wheels or equivalent).
    Base,
    /// Leg joints of a legged platform.
    Legs,
    /// All joints at once; exclusive with the other spaces.
    WholeBody,
}

impl ControlSpace {
    /// Wire name of the space, used in authority maps and reason strings.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arm => "arm",
            Self::Base => "base",
            Self::Legs => "legs",
            Self::WholeBody => "whole_body",
        }
    }
}

impl core::fmt::Display for ControlSpace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The interpretation of a command's per-DOF values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommandKind {
    /// Desired joint positions on the masked DOFs.
    JointPosition,
    /// Desired joint velocities on the masked DOFs.
    JointVelocity,
    /// Desired joint torques on the masked DOFs.
    JointTorque,
}

impl CommandKind {
    /// Wire name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::JointPosition => "JOINT_POSITION",
            Self::JointVelocity => "JOINT_VELOCITY",
            Self::JointTorque => "JOINT_TORQUE",
        }
    }
}

impl core::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
