// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Built-in envelope catalog.
//!
//! A conservative baseline for a 7-DOF arm-like system plus the monotone
//! tightening operation. Loading richer catalogs from external stores is
//! the embedder's job; the kernel only ever consumes [`Envelope`] values.

use std::collections::{BTreeMap, BTreeSet};

use crate::envelope::{Aabb, Envelope};
use crate::phase::Phase;
use crate::space::ControlSpace;

/// Name of the baseline envelope returned by [`default_envelopes`].
pub const BASELINE_ENVELOPE: &str = "base_arm_v1";

/// Returns the built-in envelope catalog, keyed by envelope name.
#[must_use]
pub fn default_envelopes() -> BTreeMap<String, Envelope> {
    // Adjust the bound vectors to match the robot DOF.
    let q_min = vec![-2.9, -1.8, -2.9, -3.1, -2.9, -0.1, -2.9];
    let q_max = vec![2.9, 1.8, 2.9, 0.1, 2.9, 3.8, 2.9];
    let qd_abs_max = vec![2.0, 2.0, 2.0, 2.5, 2.5, 3.0, 3.0];

    let edges: BTreeSet<(Phase, Phase)> = [
        (Phase::Idle, Phase::Approach),
        (Phase::Approach, Phase::Align),
        (Phase::Align, Phase::Grasp),
        (Phase::Grasp, Phase::Lift),
        (Phase::Lift, Phase::Retreat),
        (Phase::Retreat, Phase::Idle),
        // Recovery paths
        (Phase::Approach, Phase::Recovery),
        (Phase::Align, Phase::Recovery),
        (Phase::Grasp, Phase::Recovery),
        (Phase::Lift, Phase::Recovery),
        (Phase::Retreat, Phase::Recovery),
        (Phase::Recovery, Phase::Idle),
        // Termination
        (Phase::Idle, Phase::Terminated),
        (Phase::Recovery, Phase::Terminated),
    ]
    .into_iter()
    .collect();

    let mut primary_authority = BTreeMap::new();
    primary_authority.insert(ControlSpace::Arm, "reach".to_owned());
    primary_authority.insert(ControlSpace::Base, "safety".to_owned());

    let base = Envelope {
        name: BASELINE_ENVELOPE.to_owned(),
        env_scope_prefix: "lab_v1".to_owned(),
        max_snapshot_skew_s: 0.010,
        max_state_staleness_s: 0.020,
        q_min,
        q_max,
        qd_abs_max,
        q_acc_abs_max: None,
        ee_workspace: Aabb {
            min: [-0.6, -0.6, 0.0],
            max: [0.6, 0.6, 1.2],
        },
        exclusion_zones: Vec::new(),
        allow_new_commits_when_degraded: false,
        allow_new_commits_when_untrusted: false,
        allowed_phase_edges: edges,
        primary_authority,
    };

    let mut catalog = BTreeMap::new();
    catalog.insert(base.name.clone(), base);
    catalog
}

/// Returns a copy of `envelope` with velocity bounds scaled by `qd_scale`
/// (floored at 0.01). Tightening is monotone: the result never permits
/// more than the input.
#[must_use]
pub fn tighten(envelope: &Envelope, qd_scale: f64) -> Envelope {
    let qd_abs_max = envelope
        .qd_abs_max
        .iter()
        .map(|&x| (x * qd_scale).max(0.01))
        .collect();
    Envelope {
        qd_abs_max,
        ..envelope.clone()
    }
}
