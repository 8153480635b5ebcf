// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Safety command injection.
//!
//! Translates one aggregated [`SafetyEvent`] into masked commands carrying
//! the reserved `"safety"` source, which the arbiter then prefers over any
//! skill proposal in the same space. Two stop flavors:
//!
//! - hard stop: all-zero values of the configured stop kind;
//! - active damping: `tau = -gain * qd` torque, when a gain is configured
//!   and velocity feedback covers every masked DOF.

use crate::command::{MaskedCommand, SAFETY_SOURCE};
use crate::monitor::{SafetyEvent, SafetyLevel};
use crate::partition::SpaceDofs;
use crate::space::{CommandKind, ControlSpace};

/// How to stop each space when a `Stop` / `EStop` event is active.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SafetyInjectorConfig {
    /// Kind emitted for hard stops.
    pub stop_kind: CommandKind,
    /// If positive, inject damping torque `-gain * qd` instead of a hard
    /// zero. Requires velocity feedback for every masked DOF; any missing
    /// index falls back to the hard stop for that space.
    pub damping_gain: f64,
    /// If true, a stop event targets every space in the partition
    /// regardless of which spaces the event names.
    pub global_stop: bool,
}

impl Default for SafetyInjectorConfig {
    fn default() -> Self {
        Self {
            stop_kind: CommandKind::JointVelocity,
            damping_gain: 0.0,
            global_stop: true,
        }
    }
}

/// Converts an aggregated safety event into safety-sourced stop commands,
/// one per target space in lexicographic space order.
///
/// `None` and `Warn` events inject nothing. For `Stop` and `EStop`, the
/// target set is every space in the partition when `cfg.global_stop` is
/// set or the event names no spaces; otherwise the named subset.
#[must_use]
pub fn inject_safety_commands(
    event: &SafetyEvent,
    space_dofs: &SpaceDofs,
    cfg: &SafetyInjectorConfig,
    current_velocities: Option<&[f64]>,
) -> Vec<MaskedCommand> {
    if event.level < SafetyLevel::Stop {
        return Vec::new();
    }

    let targets: Vec<ControlSpace> = match &event.affected_spaces {
        Some(named) if !named.is_empty() && !cfg.global_stop => space_dofs
            .spaces()
            .filter(|s| named.contains_key(s))
            .collect(),
        _ => space_dofs.spaces().collect(),
    };

    let mut cmds = Vec::new();
    for space in targets {
        let Some(dofs) = space_dofs.get(space) else {
            continue;
        };
        if dofs.is_empty() {
            continue;
        }

        if let Some(damped) = damping_values(dofs, cfg.damping_gain, current_velocities) {
            cmds.push(MaskedCommand::from_validated_parts(
                space,
                CommandKind::JointTorque,
                dofs.to_vec(),
                damped,
                SAFETY_SOURCE,
            ));
        } else {
            cmds.push(MaskedCommand::from_validated_parts(
                space,
                cfg.stop_kind,
                dofs.to_vec(),
                vec![0.0; dofs.len()],
                SAFETY_SOURCE,
            ));
        }
    }
    cmds
}

/// Damping torques for `dofs`, or `None` when damping is not applicable
/// (no gain, no feedback, or any masked DOF outside the feedback vector).
fn damping_values(dofs: &[usize], gain: f64, velocities: Option<&[f64]>) -> Option<Vec<f64>> {
    if gain <= 0.0 {
        return None;
    }
    let velocities = velocities?;
    if velocities.is_empty() {
        return None;
    }
    let mut out = Vec::with_capacity(dofs.len());
    for &i in dofs {
        out.push(-gain * velocities.get(i).copied()?);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn partition() -> SpaceDofs {
        let mut map = BTreeMap::new();
        map.insert(ControlSpace::Arm, vec![0, 1]);
        map.insert(ControlSpace::Base, vec![6]);
        SpaceDofs::new(map).unwrap()
    }

    #[test]
    fn warn_injects_nothing() {
        let event = SafetyEvent::new(SafetyLevel::Warn, "jitter");
        let cmds = inject_safety_commands(
            &event,
            &partition(),
            &SafetyInjectorConfig::default(),
            None,
        );
        assert!(cmds.is_empty());
    }

    #[test]
    fn stop_emits_hard_zero_per_space_in_order() {
        let event = SafetyEvent::new(SafetyLevel::Stop, "collision");
        let cmds = inject_safety_commands(
            &event,
            &partition(),
            &SafetyInjectorConfig::default(),
            None,
        );
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0].space(), ControlSpace::Arm);
        assert_eq!(cmds[0].kind(), CommandKind::JointVelocity);
        assert_eq!(cmds[0].values(), &[0.0, 0.0]);
        assert_eq!(cmds[1].space(), ControlSpace::Base);
        assert!(cmds.iter().all(MaskedCommand::is_safety_sourced));
    }

    #[test]
    fn targeted_stop_respects_affected_subset() {
        let mut affected = BTreeMap::new();
        affected.insert(ControlSpace::Arm, "too_close".to_owned());
        let event = SafetyEvent::new(SafetyLevel::Stop, "collision").with_affected(affected);
        let cfg = SafetyInjectorConfig {
            global_stop: false,
            ..SafetyInjectorConfig::default()
        };
        let cmds = inject_safety_commands(&event, &partition(), &cfg, None);
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].space(), ControlSpace::Arm);
    }

    #[test]
    fn damping_emits_torque_from_velocity_feedback() {
        let event = SafetyEvent::new(SafetyLevel::Stop, "collision");
        let cfg = SafetyInjectorConfig {
            damping_gain: 5.0,
            ..SafetyInjectorConfig::default()
        };
        let mut map = BTreeMap::new();
        map.insert(ControlSpace::Arm, vec![0, 1]);
        let dofs = SpaceDofs::new(map).unwrap();

        let cmds = inject_safety_commands(&event, &dofs, &cfg, Some(&[1.0, -0.5]));
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].kind(), CommandKind::JointTorque);
        assert!((cmds[0].values()[0] - -5.0).abs() < 1e-9);
        assert!((cmds[0].values()[1] - 2.5).abs() < 1e-9);
    }

    #[test]
    fn damping_falls_back_to_hard_zero_on_short_feedback() {
        let event = SafetyEvent::new(SafetyLevel::Stop, "collision");
        let cfg = SafetyInjectorConfig {
            damping_gain: 5.0,
            ..SafetyInjectorConfig::default()
        };
        let mut map = BTreeMap::new();
        map.insert(ControlSpace::Base, vec![6]);
        let dofs = SpaceDofs::new(map).unwrap();

        // Feedback vector does not cover DOF 6.
        let cmds = inject_safety_commands(&event, &dofs, &cfg, Some(&[1.0, 2.0]));
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].kind(), CommandKind::JointVelocity);
        assert_eq!(cmds[0].values(), &[0.0]);
    }
}
