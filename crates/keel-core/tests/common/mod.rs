// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Shared fixtures for keel-core integration tests.
#![allow(dead_code)] // not every test binary uses every fixture

use std::collections::{BTreeMap, BTreeSet};

use keel_core::{
    Aabb, CapabilityLease, CommandKind, ControlSpace, Envelope, MaskedCommand, PerceptionTrust,
    Phase, SpaceDofs, StateSnapshot, Timestamped,
};

/// Seven-DOF lease with generous symmetric bounds and the usual authority
/// partition (arm → reach, base → nav, legs → balance).
pub fn lease7(seq: u64, issued_t: f64, expiry_t: f64) -> CapabilityLease {
    let mut authority = BTreeMap::new();
    authority.insert(ControlSpace::Arm, "reach".to_owned());
    authority.insert(ControlSpace::Base, "nav".to_owned());
    authority.insert(ControlSpace::Legs, "balance".to_owned());
    CapabilityLease {
        seq,
        lease_id: format!("L{seq}"),
        issued_t,
        expiry_t,
        q_min: vec![-1.0; 7],
        q_max: vec![1.0; 7],
        qd_abs_max: vec![1.0; 7],
        tau_abs_max: None,
        primary_authority: Some(authority),
    }
}

/// Seven-DOF envelope with wide state bounds and optional uniform
/// acceleration limits.
pub fn envelope7(acc_abs_max: Option<f64>) -> Envelope {
    Envelope {
        name: "test_env".to_owned(),
        env_scope_prefix: "lab_v1".to_owned(),
        max_snapshot_skew_s: 0.010,
        max_state_staleness_s: 0.020,
        q_min: vec![-5.0; 7],
        q_max: vec![5.0; 7],
        qd_abs_max: vec![2.0; 7],
        q_acc_abs_max: acc_abs_max.map(|a| vec![a; 7]),
        ee_workspace: Aabb {
            min: [-0.6, -0.6, 0.0],
            max: [0.6, 0.6, 1.2],
        },
        exclusion_zones: Vec::new(),
        allow_new_commits_when_degraded: false,
        allow_new_commits_when_untrusted: false,
        allowed_phase_edges: BTreeSet::new(),
        primary_authority: BTreeMap::new(),
    }
}

/// All-zeros snapshot with every field timestamped at `t`.
pub fn snapshot_at(t: f64, trust: PerceptionTrust, phase: Phase, seq: u64) -> StateSnapshot {
    let mut contacts = BTreeMap::new();
    contacts.insert("left_foot".to_owned(), true);
    StateSnapshot {
        t_kernel: t,
        joints_q: Timestamped::new(vec![0.0; 7], t),
        joints_qd: Timestamped::new(vec![0.0; 7], t),
        ee_pose: Timestamped::new(Some([0.0, 0.0, 0.5, 1.0, 0.0, 0.0, 0.0]), t),
        contacts: Timestamped::new(contacts, t),
        perception_trust: Timestamped::new(trust, t),
        phase,
        seq,
        env_fingerprint: "lab_v1|cam_v3".to_owned(),
    }
}

/// Velocity command helper.
pub fn velocity(
    space: ControlSpace,
    mask: &[usize],
    values: &[f64],
    source: &str,
) -> MaskedCommand {
    MaskedCommand::new(
        space,
        CommandKind::JointVelocity,
        mask.to_vec(),
        values.to_vec(),
        source,
    )
    .unwrap()
}

/// The usual disjoint seven-DOF partition.
pub fn partition7() -> SpaceDofs {
    let mut map = BTreeMap::new();
    map.insert(ControlSpace::Arm, vec![0, 1, 2, 3]);
    map.insert(ControlSpace::Legs, vec![4, 5]);
    map.insert(ControlSpace::Base, vec![6]);
    SpaceDofs::new(map).unwrap()
}
