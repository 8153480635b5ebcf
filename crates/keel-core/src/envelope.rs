// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Safety envelopes.
//!
//! An envelope is a precomputed, time-invariant policy bundle for one
//! environment scope: freshness budgets, hard state bounds, the workspace
//! box, forbidden zones, the legal phase graph and the authority partition.
//! Everything in it is monotone-checkable in O(n); there is no simulation
//! behind any of these limits.

use std::collections::{BTreeMap, BTreeSet};

use crate::phase::Phase;
use crate::space::ControlSpace;

/// Axis-aligned box in workspace coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    /// Minimum corner (x, y, z).
    pub min: [f64; 3],
    /// Maximum corner (x, y, z).
    pub max: [f64; 3],
}

impl Aabb {
    /// Whether `p` lies inside the box (bounds inclusive).
    #[must_use]
    pub fn contains(&self, p: [f64; 3]) -> bool {
        (0..3).all(|i| self.min[i] <= p[i] && p[i] <= self.max[i])
    }
}

/// Precomputed safety bounds for one environment scope.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Envelope {
    /// Catalog name of the envelope.
    pub name: String,
    /// The snapshot's environment fingerprint must start with this prefix
    /// for the envelope to apply.
    pub env_scope_prefix: String,
    /// Maximum spread allowed among snapshot field timestamps (seconds).
    pub max_snapshot_skew_s: f64,
    /// Maximum age of the oldest snapshot field relative to kernel time
    /// (seconds).
    pub max_state_staleness_s: f64,
    /// Full-DOF lower position bounds.
    pub q_min: Vec<f64>,
    /// Full-DOF upper position bounds.
    pub q_max: Vec<f64>,
    /// Full-DOF symmetric velocity bounds.
    pub qd_abs_max: Vec<f64>,
    /// Full-DOF symmetric acceleration bounds; absent disables the
    /// dynamics clamp entirely.
    pub q_acc_abs_max: Option<Vec<f64>>,
    /// Legal end-effector workspace.
    pub ee_workspace: Aabb,
    /// Forbidden boxes inside the workspace. Empty means no zones.
    pub exclusion_zones: Vec<Aabb>,
    /// Whether new control-plane commits are allowed while perception is
    /// degraded.
    pub allow_new_commits_when_degraded: bool,
    /// Whether new control-plane commits are allowed while perception is
    /// untrusted. Usually false.
    pub allow_new_commits_when_untrusted: bool,
    /// The set of legal `(from, to)` phase transitions.
    pub allowed_phase_edges: BTreeSet<(Phase, Phase)>,
    /// Per-space primary authority declared by this envelope's policy.
    pub primary_authority: BTreeMap<ControlSpace, String>,
}
