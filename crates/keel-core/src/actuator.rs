// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Full-DOF actuator target construction.
//!
//! The builder merges the tick's final per-space commands into up to three
//! full-DOF target vectors (position, velocity, torque), enforcing the
//! space/kind compatibility matrix, the mixed-kind policy and per-space
//! HOLD for joints nothing commanded.
//!
//! Compatibility matrix:
//!
//! | space        | allowed kinds          |
//! |--------------|------------------------|
//! | `arm`        | position, velocity     |
//! | `base`       | velocity               |
//! | `legs`       | velocity               |
//! | `whole_body` | velocity               |
//!
//! Safety-sourced torque is exempt in every space when
//! `allow_safety_torque_stop` is set (damping stops). A later pass
//! re-checks that no *non-safety* torque is mixed with other kinds; the
//! two layers are intentionally kept separate.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::command::MaskedCommand;
use crate::hold::HoldPolicy;
use crate::partition::SpaceDofs;
use crate::space::{CommandKind, ControlSpace};

/// Full-DOF targets handed to the actuator transport. Each vector is
/// present iff some command or HOLD preference needed it this tick.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActuatorTargets {
    /// Desired joint positions.
    pub q_des: Option<Vec<f64>>,
    /// Desired joint velocities.
    pub qd_des: Option<Vec<f64>>,
    /// Desired joint torques.
    pub tau_des: Option<Vec<f64>>,
}

/// Outcome of building actuator targets.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildResult {
    /// Whether targets were produced.
    pub ok: bool,
    /// Human-readable explanation.
    pub reason: String,
    /// The merged targets on success.
    pub targets: Option<ActuatorTargets>,
}

#[derive(Debug, Error)]
enum BuildError {
    #[error("invalid dof_count")]
    InvalidDofCount,
    #[error("now_q length {0} != dof_count {1}")]
    NowQShape(usize, usize),
    #[error("no commands to build")]
    NoCommands,
    #[error("whole_body is exclusive; other spaces present")]
    WholeBodyExclusive,
    #[error("kind {kind} not allowed in {space}")]
    KindNotAllowed {
        space: ControlSpace,
        kind: CommandKind,
    },
    #[error("disallowed mixed kinds: {0}")]
    MixedKinds(String),
    #[error("DOF index {0} out of range in command")]
    CommandDofOutOfRange(usize),
    #[error("DOF overlap detected at index {0}")]
    DofOverlap(usize),
    #[error("DOF index {0} out of range in space partition")]
    PartitionDofOutOfRange(usize),
    #[error("torque mixed but not safety-sourced")]
    UnsafeTorqueMix,
}

fn allowed_kinds(space: ControlSpace) -> &'static [CommandKind] {
    match space {
        ControlSpace::Arm => &[CommandKind::JointPosition, CommandKind::JointVelocity],
        ControlSpace::Base | ControlSpace::Legs | ControlSpace::WholeBody => {
            &[CommandKind::JointVelocity]
        }
    }
}

/// Builds full-DOF actuator targets from the tick's final commands.
///
/// `now_q` is the measured joint vector used for position holds;
/// `space_dofs` and `hold_policy` decide which idle joints get held and
/// how. Safety-sourced torque stops are admitted into any space when
/// `allow_safety_torque_stop` is set.
#[must_use]
pub fn build_actuator_targets(
    final_by_space: &BTreeMap<ControlSpace, MaskedCommand>,
    now_q: &[f64],
    dof_count: usize,
    space_dofs: &SpaceDofs,
    hold_policy: &HoldPolicy,
    allow_safety_torque_stop: bool,
) -> BuildResult {
    match try_build(
        final_by_space,
        now_q,
        dof_count,
        space_dofs,
        hold_policy,
        allow_safety_torque_stop,
    ) {
        Ok(targets) => BuildResult {
            ok: true,
            reason: "OK".to_owned(),
            targets: Some(targets),
        },
        Err(e) => BuildResult {
            ok: false,
            reason: e.to_string(),
            targets: None,
        },
    }
}

fn try_build(
    final_by_space: &BTreeMap<ControlSpace, MaskedCommand>,
    now_q: &[f64],
    dof_count: usize,
    space_dofs: &SpaceDofs,
    hold_policy: &HoldPolicy,
    allow_safety_torque_stop: bool,
) -> Result<ActuatorTargets, BuildError> {
    if dof_count == 0 {
        return Err(BuildError::InvalidDofCount);
    }
    if now_q.len() != dof_count {
        return Err(BuildError::NowQShape(now_q.len(), dof_count));
    }
    if final_by_space.is_empty() {
        return Err(BuildError::NoCommands);
    }
    if final_by_space.contains_key(&ControlSpace::WholeBody) && final_by_space.len() > 1 {
        return Err(BuildError::WholeBodyExclusive);
    }

    for (&space, cmd) in final_by_space {
        let safety_torque_exempt = allow_safety_torque_stop
            && cmd.is_safety_sourced()
            && cmd.kind() == CommandKind::JointTorque;
        if !allowed_kinds(space).contains(&cmd.kind()) && !safety_torque_exempt {
            return Err(BuildError::KindNotAllowed {
                space,
                kind: cmd.kind(),
            });
        }
    }

    let kinds_present: BTreeSet<CommandKind> =
        final_by_space.values().map(MaskedCommand::kind).collect();
    let mixed = kinds_present.len() > 1;
    if kinds_present.contains(&CommandKind::JointTorque) && mixed && !allow_safety_torque_stop {
        let mut names: Vec<&str> = kinds_present.iter().map(|k| k.as_str()).collect();
        names.sort_unstable();
        return Err(BuildError::MixedKinds(names.join(", ")));
    }

    // Union the commanded DOFs; any duplicate across commands is a merge
    // conflict the controller should already have caught.
    let mut commanded: FxHashSet<usize> = FxHashSet::default();
    for cmd in final_by_space.values() {
        for &i in cmd.dof_mask() {
            if i >= dof_count {
                return Err(BuildError::CommandDofOutOfRange(i));
            }
            if !commanded.insert(i) {
                return Err(BuildError::DofOverlap(i));
            }
        }
    }

    let mut q_des: Option<Vec<f64>> = None;
    let mut qd_des: Option<Vec<f64>> = None;
    let mut tau_des: Option<Vec<f64>> = None;

    // HOLD pass: allocate the preferred vector for every owned joint no
    // command drives. Hold values equal their identity (current q, zero),
    // so allocation is the only work.
    for (space, dofs) in space_dofs.iter() {
        let Some(&pref) = hold_policy.preferred_hold_kind.get(&space) else {
            continue;
        };
        for &i in dofs {
            if i >= dof_count {
                return Err(BuildError::PartitionDofOutOfRange(i));
            }
            if commanded.contains(&i) {
                continue;
            }
            match pref {
                CommandKind::JointPosition => {
                    if q_des.is_none() {
                        q_des = Some(now_q.to_vec());
                    }
                }
                CommandKind::JointVelocity => {
                    if qd_des.is_none() {
                        qd_des = Some(vec![0.0; dof_count]);
                    }
                }
                CommandKind::JointTorque => {
                    if tau_des.is_none() {
                        tau_des = Some(vec![0.0; dof_count]);
                    }
                }
            }
        }
    }

    // Command pass, lexicographic space order.
    for cmd in final_by_space.values() {
        match cmd.kind() {
            CommandKind::JointPosition => {
                let q = q_des.get_or_insert_with(|| now_q.to_vec());
                for (&i, &v) in cmd.dof_mask().iter().zip(cmd.values().iter()) {
                    q[i] = v;
                }
            }
            CommandKind::JointVelocity => {
                let qd = qd_des.get_or_insert_with(|| vec![0.0; dof_count]);
                for (&i, &v) in cmd.dof_mask().iter().zip(cmd.values().iter()) {
                    qd[i] = v;
                }
            }
            CommandKind::JointTorque => {
                // Defense in depth: the matrix check above admits
                // safety-sourced torque broadly; re-validate here that a
                // mixed tick never carries non-safety torque.
                if mixed && !cmd.is_safety_sourced() {
                    return Err(BuildError::UnsafeTorqueMix);
                }
                let tau = tau_des.get_or_insert_with(|| vec![0.0; dof_count]);
                for (&i, &v) in cmd.dof_mask().iter().zip(cmd.values().iter()) {
                    tau[i] = v;
                }
            }
        }
    }

    Ok(ActuatorTargets {
        q_des,
        qd_des,
        tau_des,
    })
}
