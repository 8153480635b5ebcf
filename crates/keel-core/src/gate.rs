// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Control-plane admission gate.
//!
//! The gate is a deterministic, side-effect-free function over one proposed
//! action: no simulation, no learning, no I/O, no randomness. Checks run in
//! a fixed order and the first failure wins, so a given input always yields
//! the same decision bytes. The gate never mutates the ledger; the caller
//! applies the ledger iff the decision is ok.

use std::collections::BTreeMap;

use crate::action::{Action, ActionKind, GOAL_TYPES};
use crate::envelope::Envelope;
use crate::ledger::Ledger;
use crate::reject::RejectCode;
use crate::snapshot::{PerceptionTrust, StateSnapshot};

/// Tolerance for future-dated snapshot signals (clock transport jitter).
const FUTURE_SLACK_S: f64 = 1e-6;

/// Outcome of gating one action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateDecision {
    /// Whether the action is admitted.
    pub ok: bool,
    /// Human-readable explanation.
    pub reason: String,
    /// Stable machine-readable code; `Ok` on acceptance.
    pub reject_code: RejectCode,
}

impl GateDecision {
    fn accept(reason: &str) -> Self {
        Self {
            ok: true,
            reason: reason.to_owned(),
            reject_code: RejectCode::Ok,
        }
    }

    fn reject(reject_code: RejectCode, reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: reason.into(),
            reject_code,
        }
    }
}

/// Validates one control-plane action against the snapshot, envelope and
/// ledger. Check order (first failure wins):
///
/// 1. emergency stop — always admitted;
/// 2. ledger ordering / replay;
/// 3. envelope scope vs. environment fingerprint;
/// 4. snapshot skew / staleness / future-dating;
/// 5. perception trust policy;
/// 6. state hard bounds (DOF shape, joints, end-effector);
/// 7. action-kind-specific rules.
#[must_use]
pub fn gate(
    state: &StateSnapshot,
    action: &Action,
    envelope: &Envelope,
    ledger: &Ledger,
    enabled_skills: &BTreeMap<String, bool>,
) -> GateDecision {
    // Emergency stop is always allowed; it is still serially logged by the
    // controller path.
    if action.kind == ActionKind::EmergencyStop {
        return GateDecision::accept("E-STOP allowed");
    }

    if !ledger.can_apply(action) {
        return GateDecision::reject(
            RejectCode::OrderViolation,
            "ledger ordering / replay violation",
        );
    }

    if !state.env_fingerprint.starts_with(&envelope.env_scope_prefix) {
        return GateDecision::reject(
            RejectCode::EnvScopeMismatch,
            "envelope not valid for environment fingerprint",
        );
    }

    if let Err(decision) = snapshot_time_ok(state, envelope) {
        return decision;
    }

    let trust = state.perception_trust.value;
    if trust == PerceptionTrust::Degraded && !envelope.allow_new_commits_when_degraded {
        return GateDecision::reject(
            RejectCode::PerceptionDegraded,
            "perception DEGRADED: no new commits allowed",
        );
    }
    if trust == PerceptionTrust::Untrusted && !envelope.allow_new_commits_when_untrusted {
        return GateDecision::reject(
            RejectCode::PerceptionUntrusted,
            "perception UNTRUSTED: no new commits allowed",
        );
    }

    if let Err(decision) = state_bounds_ok(state, envelope) {
        return decision;
    }

    if let Err(decision) = action_ok(state, action, envelope, enabled_skills) {
        return decision;
    }

    GateDecision::accept("accepted")
}

fn snapshot_time_ok(state: &StateSnapshot, env: &Envelope) -> Result<(), GateDecision> {
    let ts = state.field_timestamps();
    let t_min = ts.iter().copied().fold(f64::INFINITY, f64::min);
    let t_max = ts.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if t_max - t_min > env.max_snapshot_skew_s {
        return Err(GateDecision::reject(
            RejectCode::SnapshotSkew,
            format!("snapshot skew too large: {:.6}s", t_max - t_min),
        ));
    }
    if state.t_kernel - t_min > env.max_state_staleness_s {
        return Err(GateDecision::reject(
            RejectCode::SnapshotStale,
            format!("snapshot too stale: {:.6}s", state.t_kernel - t_min),
        ));
    }
    // Future timestamps indicate clock or transport trouble.
    if t_max > state.t_kernel + FUTURE_SLACK_S {
        return Err(GateDecision::reject(
            RejectCode::SnapshotFuture,
            "snapshot contains future-dated signals",
        ));
    }
    Ok(())
}

fn state_bounds_ok(state: &StateSnapshot, env: &Envelope) -> Result<(), GateDecision> {
    let q = &state.joints_q.value;
    let qd = &state.joints_qd.value;

    if q.len() != env.q_min.len() || q.len() != env.q_max.len() || q.len() != env.qd_abs_max.len()
    {
        return Err(GateDecision::reject(
            RejectCode::DofMismatch,
            "DOF mismatch between state and envelope",
        ));
    }

    for (i, &qi) in q.iter().enumerate() {
        if qi < env.q_min[i] || qi > env.q_max[i] {
            return Err(GateDecision::reject(
                RejectCode::JointLimit,
                format!("joint {i} out of range"),
            ));
        }
    }
    for (i, &qdi) in qd.iter().enumerate() {
        if qdi.abs() > env.qd_abs_max[i] {
            return Err(GateDecision::reject(
                RejectCode::JointVelocity,
                format!("joint {i} velocity too high"),
            ));
        }
    }

    if let Some(pose) = state.ee_pose.value {
        let p = [pose[0], pose[1], pose[2]];
        if !env.ee_workspace.contains(p) {
            return Err(GateDecision::reject(
                RejectCode::EeWorkspace,
                "end-effector out of workspace",
            ));
        }
        for (i, zone) in env.exclusion_zones.iter().enumerate() {
            if zone.contains(p) {
                return Err(GateDecision::reject(
                    RejectCode::EeInZone,
                    format!("end-effector inside exclusion zone {i}"),
                ));
            }
        }
    }

    Ok(())
}

fn action_ok(
    state: &StateSnapshot,
    action: &Action,
    env: &Envelope,
    enabled_skills: &BTreeMap<String, bool>,
) -> Result<(), GateDecision> {
    match action.kind {
        ActionKind::EnableSkill => {
            let skill = required_name(action.skill_name.as_deref(), "missing skill_name")?;
            if !enabled_skills.contains_key(skill) {
                return Err(GateDecision::reject(RejectCode::UnknownSkill, "unknown skill"));
            }
            if !state.phase.allows_reconfiguration() {
                return Err(GateDecision::reject(
                    RejectCode::PhaseRule,
                    "skills may only be enabled in IDLE or RECOVERY",
                ));
            }
            Ok(())
        }
        ActionKind::DisableSkill => {
            let skill = required_name(action.skill_name.as_deref(), "missing skill_name")?;
            if !enabled_skills.contains_key(skill) {
                return Err(GateDecision::reject(RejectCode::UnknownSkill, "unknown skill"));
            }
            Ok(())
        }
        ActionKind::SetGoal => {
            let Some(goal) = &action.goal else {
                return Err(GateDecision::reject(RejectCode::BadAction, "missing goal"));
            };
            if !GOAL_TYPES.contains(&goal.goal_type.as_str()) {
                return Err(GateDecision::reject(
                    RejectCode::BadGoal,
                    "unsupported goal type",
                ));
            }
            Ok(())
        }
        ActionKind::SetPhase => {
            let Some(next) = action.next_phase else {
                return Err(GateDecision::reject(
                    RejectCode::BadAction,
                    "missing next_phase",
                ));
            };
            if !env.allowed_phase_edges.contains(&(state.phase, next)) {
                return Err(GateDecision::reject(
                    RejectCode::PhaseEdge,
                    format!("illegal phase transition {}->{}", state.phase, next),
                ));
            }
            Ok(())
        }
        ActionKind::ApplyEnvelope => {
            // The gate validates "may switch" only; the kernel loads the
            // named envelope from its trusted catalog.
            required_name(action.envelope_name.as_deref(), "missing envelope_name")?;
            if !state.phase.allows_reconfiguration() {
                return Err(GateDecision::reject(
                    RejectCode::PhaseRule,
                    "envelopes may only change in IDLE or RECOVERY",
                ));
            }
            Ok(())
        }
        // Handled before any other check; kept in the match so adding an
        // action kind is a compile-time obligation here.
        ActionKind::EmergencyStop => Ok(()),
    }
}

fn required_name<'a>(name: Option<&'a str>, reason: &str) -> Result<&'a str, GateDecision> {
    match name {
        Some(n) if !n.is_empty() => Ok(n),
        _ => Err(GateDecision::reject(RejectCode::BadAction, reason)),
    }
}
