// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Per-space proposal arbitration.
//!
//! Within each control space, exactly one proposal may win a tick:
//! a safety-sourced proposal overrides everything, otherwise only the
//! lease's primary authority for that space is eligible. More than one
//! candidate from the winning source is ambiguity, and ambiguity fails the
//! whole tick rather than guessing.

use std::collections::BTreeMap;

use crate::command::MaskedCommand;
use crate::lease::CapabilityLease;
use crate::space::ControlSpace;

/// Outcome of arbitrating one tick's proposals.
#[derive(Clone, Debug, PartialEq)]
pub struct ArbiterDecision {
    /// Whether arbitration succeeded.
    pub ok: bool,
    /// Human-readable explanation.
    pub reason: String,
    /// Winning proposal per space. Spaces with no eligible proposal are
    /// absent (the actuator builder applies HOLD to them later).
    pub selected_by_space: BTreeMap<ControlSpace, MaskedCommand>,
}

impl ArbiterDecision {
    fn fail(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: reason.into(),
            selected_by_space: BTreeMap::new(),
        }
    }
}

/// Selects at most one winning proposal per space, in lexicographic space
/// order.
#[must_use]
pub fn arbitrate(lease: &CapabilityLease, proposals: &[MaskedCommand]) -> ArbiterDecision {
    let Some(authority) = &lease.primary_authority else {
        return ArbiterDecision::fail("no primary_authority map in lease");
    };

    let mut by_space: BTreeMap<ControlSpace, Vec<&MaskedCommand>> = BTreeMap::new();
    for p in proposals {
        by_space.entry(p.space()).or_default().push(p);
    }

    let mut selected: BTreeMap<ControlSpace, MaskedCommand> = BTreeMap::new();
    for (&space, candidates) in &by_space {
        let safety: Vec<&MaskedCommand> = candidates
            .iter()
            .copied()
            .filter(|p| p.is_safety_sourced())
            .collect();
        if !safety.is_empty() {
            if safety.len() != 1 {
                return ArbiterDecision::fail(format!("ambiguous safety proposals in {space}"));
            }
            selected.insert(space, safety[0].clone());
            continue;
        }

        let Some(primary) = authority.get(&space) else {
            return ArbiterDecision::fail(format!("no primary authority declared for {space}"));
        };
        let eligible: Vec<&MaskedCommand> = candidates
            .iter()
            .copied()
            .filter(|p| p.source() == primary)
            .collect();
        match eligible.len() {
            // No eligible proposal: leave the space unselected; HOLD
            // applies downstream.
            0 => {}
            1 => {
                selected.insert(space, eligible[0].clone());
            }
            _ => {
                return ArbiterDecision::fail(format!("ambiguous primary proposals in {space}"));
            }
        }
    }

    if selected.is_empty() {
        return ArbiterDecision::fail("no proposals selected");
    }

    ArbiterDecision {
        ok: true,
        reason: "OK".to_owned(),
        selected_by_space: selected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::SAFETY_SOURCE;
    use crate::space::CommandKind;

    fn lease_with_authority(pairs: &[(ControlSpace, &str)]) -> CapabilityLease {
        let authority = pairs
            .iter()
            .map(|&(s, a)| (s, a.to_owned()))
            .collect::<BTreeMap<_, _>>();
        CapabilityLease {
            seq: 1,
            lease_id: "L".to_owned(),
            issued_t: 0.0,
            expiry_t: 10.0,
            q_min: vec![-1.0; 7],
            q_max: vec![1.0; 7],
            qd_abs_max: vec![1.0; 7],
            tau_abs_max: None,
            primary_authority: Some(authority),
        }
    }

    fn velocity(space: ControlSpace, mask: Vec<usize>, source: &str) -> MaskedCommand {
        let values = vec![0.1; mask.len()];
        MaskedCommand::new(space, CommandKind::JointVelocity, mask, values, source).unwrap()
    }

    #[test]
    fn safety_overrides_primary() {
        let lease = lease_with_authority(&[(ControlSpace::Arm, "reach")]);
        let proposals = vec![
            velocity(ControlSpace::Arm, vec![0, 1], "reach"),
            velocity(ControlSpace::Arm, vec![0, 1], SAFETY_SOURCE),
        ];
        let decision = arbitrate(&lease, &proposals);
        assert!(decision.ok);
        assert!(decision.selected_by_space[&ControlSpace::Arm].is_safety_sourced());
    }

    #[test]
    fn non_primary_sources_are_ignored() {
        let lease = lease_with_authority(&[(ControlSpace::Arm, "reach")]);
        let proposals = vec![velocity(ControlSpace::Arm, vec![0], "rogue")];
        let decision = arbitrate(&lease, &proposals);
        assert!(!decision.ok);
        assert_eq!(decision.reason, "no proposals selected");
    }

    #[test]
    fn two_primary_proposals_are_ambiguous() {
        let lease = lease_with_authority(&[(ControlSpace::Arm, "reach")]);
        let proposals = vec![
            velocity(ControlSpace::Arm, vec![0], "reach"),
            velocity(ControlSpace::Arm, vec![1], "reach"),
        ];
        let decision = arbitrate(&lease, &proposals);
        assert!(!decision.ok);
        assert_eq!(decision.reason, "ambiguous primary proposals in arm");
    }

    #[test]
    fn missing_authority_entry_fails() {
        let lease = lease_with_authority(&[(ControlSpace::Arm, "reach")]);
        let proposals = vec![velocity(ControlSpace::Base, vec![6], "nav")];
        let decision = arbitrate(&lease, &proposals);
        assert!(!decision.ok);
        assert_eq!(decision.reason, "no primary authority declared for base");
    }

    #[test]
    fn unproposed_spaces_are_absent_from_output() {
        let lease =
            lease_with_authority(&[(ControlSpace::Arm, "reach"), (ControlSpace::Base, "nav")]);
        let proposals = vec![velocity(ControlSpace::Arm, vec![0], "reach")];
        let decision = arbitrate(&lease, &proposals);
        assert!(decision.ok);
        assert!(!decision.selected_by_space.contains_key(&ControlSpace::Base));
    }
}
