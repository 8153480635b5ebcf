// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Control-plane admission tests: ordering, scope, freshness, trust,
//! bounds and per-action rules.

mod common;

use std::collections::BTreeMap;

use common::snapshot_at;
use keel_core::{
    default_envelopes, gate, Action, Envelope, Goal, Ledger, PerceptionTrust, Phase, RejectCode,
    Timestamped, BASELINE_ENVELOPE,
};

fn baseline() -> Envelope {
    default_envelopes()[BASELINE_ENVELOPE].clone()
}

fn known_skills() -> BTreeMap<String, bool> {
    let mut skills = BTreeMap::new();
    skills.insert("reach".to_owned(), false);
    skills.insert("safety".to_owned(), true);
    skills
}

#[test]
fn enable_known_skill_in_idle_is_admitted() {
    let env = baseline();
    let ledger = Ledger::new();
    let state = snapshot_at(1.0, PerceptionTrust::Valid, Phase::Idle, 0);
    let action = Action::enable_skill(1, "reach").with_action_id("a1");

    let decision = gate(&state, &action, &env, &ledger, &known_skills());
    assert!(decision.ok, "{}", decision.reason);
    assert_eq!(decision.reject_code, RejectCode::Ok);
}

#[test]
fn unknown_skill_is_rejected() {
    let env = baseline();
    let ledger = Ledger::new();
    let state = snapshot_at(1.0, PerceptionTrust::Valid, Phase::Idle, 0);
    let action = Action::enable_skill(1, "teleport").with_action_id("a2");

    let decision = gate(&state, &action, &env, &ledger, &known_skills());
    assert!(!decision.ok);
    assert_eq!(decision.reject_code, RejectCode::UnknownSkill);
}

#[test]
fn replayed_action_id_is_an_order_violation() {
    let env = baseline();
    let mut ledger = Ledger::new();
    let state = snapshot_at(1.0, PerceptionTrust::Valid, Phase::Idle, 0);

    let first = Action::enable_skill(1, "reach").with_action_id("dup");
    let decision = gate(&state, &first, &env, &ledger, &known_skills());
    assert!(decision.ok);
    ledger.apply(&first).unwrap();

    let state2 = snapshot_at(1.0, PerceptionTrust::Valid, Phase::Idle, 1);
    let replay = Action::enable_skill(2, "reach").with_action_id("dup");
    let decision = gate(&state2, &replay, &env, &ledger, &known_skills());
    assert!(!decision.ok);
    assert_eq!(decision.reject_code, RejectCode::OrderViolation);
}

#[test]
fn out_of_order_seq_is_rejected() {
    let env = baseline();
    let ledger = Ledger::new();
    let state = snapshot_at(1.0, PerceptionTrust::Valid, Phase::Idle, 0);
    let action = Action::enable_skill(3, "reach");

    let decision = gate(&state, &action, &env, &ledger, &known_skills());
    assert!(!decision.ok);
    assert_eq!(decision.reject_code, RejectCode::OrderViolation);
}

#[test]
fn emergency_stop_bypasses_every_other_check() {
    let env = baseline();
    let ledger = Ledger::new();
    // Stale snapshot, wrong fingerprint, untrusted perception: none of it
    // matters for an E-STOP.
    let mut state = snapshot_at(1.0, PerceptionTrust::Untrusted, Phase::Grasp, 0);
    state.env_fingerprint = "elsewhere".to_owned();
    state.joints_q = Timestamped::new(vec![0.0; 7], 0.5);

    let decision = gate(&state, &Action::emergency_stop(99), &env, &ledger, &known_skills());
    assert!(decision.ok);
}

#[test]
fn env_scope_mismatch_is_rejected() {
    let env = baseline();
    let ledger = Ledger::new();
    let mut state = snapshot_at(1.0, PerceptionTrust::Valid, Phase::Idle, 0);
    state.env_fingerprint = "factory_v2|cam_v3".to_owned();

    let decision = gate(
        &state,
        &Action::enable_skill(1, "reach"),
        &env,
        &ledger,
        &known_skills(),
    );
    assert!(!decision.ok);
    assert_eq!(decision.reject_code, RejectCode::EnvScopeMismatch);
}

#[test]
fn snapshot_skew_is_rejected() {
    let env = baseline();
    let ledger = Ledger::new();
    let mut state = snapshot_at(1.0, PerceptionTrust::Valid, Phase::Idle, 0);
    // Camera pose 30 ms behind the joint encoders; skew budget is 10 ms.
    state.ee_pose = Timestamped::new(Some([0.0, 0.0, 0.5, 1.0, 0.0, 0.0, 0.0]), 0.970);

    let decision = gate(
        &state,
        &Action::enable_skill(1, "reach").with_action_id("skew1"),
        &env,
        &ledger,
        &known_skills(),
    );
    assert!(!decision.ok);
    assert!(matches!(
        decision.reject_code,
        RejectCode::SnapshotSkew | RejectCode::SnapshotStale
    ));
}

#[test]
fn future_dated_snapshot_is_rejected() {
    let env = baseline();
    let ledger = Ledger::new();
    let mut state = snapshot_at(1.0, PerceptionTrust::Valid, Phase::Idle, 0);
    state.joints_q = Timestamped::new(vec![0.0; 7], 1.005);

    let decision = gate(
        &state,
        &Action::enable_skill(1, "reach"),
        &env,
        &ledger,
        &known_skills(),
    );
    assert!(!decision.ok);
    assert_eq!(decision.reject_code, RejectCode::SnapshotFuture);
}

#[test]
fn untrusted_perception_blocks_commits() {
    let env = baseline();
    let ledger = Ledger::new();
    let state = snapshot_at(1.0, PerceptionTrust::Untrusted, Phase::Idle, 0);

    let decision = gate(
        &state,
        &Action::enable_skill(1, "reach").with_action_id("p1"),
        &env,
        &ledger,
        &known_skills(),
    );
    assert!(!decision.ok);
    assert_eq!(decision.reject_code, RejectCode::PerceptionUntrusted);
}

#[test]
fn degraded_perception_can_be_opted_in() {
    let mut env = baseline();
    let ledger = Ledger::new();
    let state = snapshot_at(1.0, PerceptionTrust::Degraded, Phase::Idle, 0);
    let action = Action::enable_skill(1, "reach");

    let decision = gate(&state, &action, &env, &ledger, &known_skills());
    assert_eq!(decision.reject_code, RejectCode::PerceptionDegraded);

    env.allow_new_commits_when_degraded = true;
    let decision = gate(&state, &action, &env, &ledger, &known_skills());
    assert!(decision.ok, "{}", decision.reason);
}

#[test]
fn joint_limit_violations_are_rejected() {
    let env = baseline();
    let ledger = Ledger::new();
    let mut state = snapshot_at(1.0, PerceptionTrust::Valid, Phase::Idle, 0);
    let mut q = vec![0.0; 7];
    q[1] = 2.5; // beyond q_max[1] = 1.8
    state.joints_q = Timestamped::new(q, 1.0);

    let decision = gate(
        &state,
        &Action::enable_skill(1, "reach"),
        &env,
        &ledger,
        &known_skills(),
    );
    assert!(!decision.ok);
    assert_eq!(decision.reject_code, RejectCode::JointLimit);
}

#[test]
fn workspace_and_exclusion_zones_are_enforced() {
    let mut env = baseline();
    let ledger = Ledger::new();

    let mut state = snapshot_at(1.0, PerceptionTrust::Valid, Phase::Idle, 0);
    state.ee_pose = Timestamped::new(Some([2.0, 0.0, 0.5, 1.0, 0.0, 0.0, 0.0]), 1.0);
    let decision = gate(
        &state,
        &Action::enable_skill(1, "reach"),
        &env,
        &ledger,
        &known_skills(),
    );
    assert_eq!(decision.reject_code, RejectCode::EeWorkspace);

    env.exclusion_zones = vec![keel_core::Aabb {
        min: [-0.1, -0.1, 0.0],
        max: [0.1, 0.1, 0.6],
    }];
    let state = snapshot_at(1.0, PerceptionTrust::Valid, Phase::Idle, 0);
    let decision = gate(
        &state,
        &Action::enable_skill(1, "reach"),
        &env,
        &ledger,
        &known_skills(),
    );
    assert!(!decision.ok);
    assert_eq!(decision.reject_code, RejectCode::EeInZone);
    assert!(decision.reason.contains("exclusion zone 0"));
}

#[test]
fn phase_edges_come_from_the_envelope() {
    let env = baseline();
    let ledger = Ledger::new();
    let state = snapshot_at(1.0, PerceptionTrust::Valid, Phase::Idle, 0);

    let legal = Action::set_phase(1, Phase::Approach);
    assert!(gate(&state, &legal, &env, &ledger, &known_skills()).ok);

    let illegal = Action::set_phase(1, Phase::Grasp);
    let decision = gate(&state, &illegal, &env, &ledger, &known_skills());
    assert!(!decision.ok);
    assert_eq!(decision.reject_code, RejectCode::PhaseEdge);
    assert!(decision.reason.contains("IDLE->GRASP"));
}

#[test]
fn skills_only_enable_in_idle_or_recovery() {
    let env = baseline();
    let ledger = Ledger::new();
    let state = snapshot_at(1.0, PerceptionTrust::Valid, Phase::Grasp, 0);

    let decision = gate(
        &state,
        &Action::enable_skill(1, "reach"),
        &env,
        &ledger,
        &known_skills(),
    );
    assert!(!decision.ok);
    assert_eq!(decision.reject_code, RejectCode::PhaseRule);
}

#[test]
fn goal_types_are_validated() {
    let env = baseline();
    let ledger = Ledger::new();
    let state = snapshot_at(1.0, PerceptionTrust::Valid, Phase::Idle, 0);

    let good = Action::set_goal(1, Goal::new("reach").with_target([0.2, 0.0, 0.5]));
    assert!(gate(&state, &good, &env, &ledger, &known_skills()).ok);

    let bad = Action::set_goal(1, Goal::new("teleport"));
    let decision = gate(&state, &bad, &env, &ledger, &known_skills());
    assert!(!decision.ok);
    assert_eq!(decision.reject_code, RejectCode::BadGoal);

    let mut missing = Action::set_goal(1, Goal::new("reach"));
    missing.goal = None;
    let decision = gate(&state, &missing, &env, &ledger, &known_skills());
    assert_eq!(decision.reject_code, RejectCode::BadAction);
}

#[test]
fn envelope_swap_needs_a_name_and_a_quiet_phase() {
    let env = baseline();
    let ledger = Ledger::new();

    let state = snapshot_at(1.0, PerceptionTrust::Valid, Phase::Idle, 0);
    let good = Action::apply_envelope(1, "base_arm_v1");
    assert!(gate(&state, &good, &env, &ledger, &known_skills()).ok);

    let busy = snapshot_at(1.0, PerceptionTrust::Valid, Phase::Lift, 0);
    let decision = gate(&busy, &good, &env, &ledger, &known_skills());
    assert_eq!(decision.reject_code, RejectCode::PhaseRule);

    let mut unnamed = Action::apply_envelope(1, "x");
    unnamed.envelope_name = None;
    let decision = gate(&state, &unnamed, &env, &ledger, &known_skills());
    assert_eq!(decision.reject_code, RejectCode::BadAction);
}
