//! Seed-scenario suite — the six end-to-end behaviors a complete
//! coordination layer must reproduce: crash recovery, claim conflict,
//! trajectory lifecycle, lesson injection, stuck-claim recovery, and
//! swarm lifecycle.

use coordination::claim;
use coordination::config::Config;
use coordination::learning::{self, Pattern, PatternType};
use coordination::session;
use coordination::store::claims::{self, ClaimStatus, ListFilter};
use coordination::store::{kv, ScratchDir, StoreRoot};
use coordination::swarm::{self, Topology};
use coordination::timeutil;
use coordination::trajectory;
use serde_json::json;
use std::path::Path;
use tempfile::tempdir;

fn store(dir: &std::path::Path) -> StoreRoot {
    StoreRoot::new(dir.join("store"))
}
fn scratch(dir: &std::path::Path) -> ScratchDir {
    ScratchDir::new(dir.join("scratch"))
}

// ── S1: crash recovery ──────────────────────────────────────────────

#[test]
fn s1_restore_check_flags_an_interrupted_session_exactly_once() {
    let dir = tempdir().unwrap();
    let st = store(dir.path());
    let config = Config::default();

    let entry = json!({
        "session_id": "s1",
        "project": "demo",
        "started_at": timeutil::now_rfc3339_minus_secs(600),
        "completed": false,
        "last_activity": timeutil::now_rfc3339(),
        "ended_at": null,
        "state": {"task": "demo task"},
    });
    kv::store(&st.memory_store(), "session:demo:last", entry).unwrap();

    let first = session::restore_check(&st, "demo", &config).unwrap();
    assert!(first["additionalContext"]
        .as_str()
        .unwrap()
        .contains("Interrupted"));

    let second = session::restore_check(&st, "demo", &config).unwrap();
    assert_eq!(second, json!({}));
}

// ── S2: conflict block ──────────────────────────────────────────────

#[test]
fn s2_second_session_file_claim_is_blocked_with_first_claimant_named() {
    let dir = tempdir().unwrap();
    let st = store(dir.path());
    let sc_a = scratch(&dir.path().join("a"));
    let sc_b = scratch(&dir.path().join("b"));

    let first = claim::file_claim(&st, &sc_a, "A", Path::new("/tmp/x.py")).unwrap();
    assert_eq!(first, json!({}));

    let second = claim::file_claim(&st, &sc_b, "B", Path::new("/tmp/x.py")).unwrap();
    assert_eq!(second["decision"], "block");
    assert!(second["reason"].as_str().unwrap().contains("agent:A"));
}

// ── S3: trajectory lifecycle ────────────────────────────────────────

#[test]
fn s3_full_trajectory_lifecycle_computes_success_rate_and_indexes() {
    let dir = tempdir().unwrap();
    let sc = scratch(dir.path());
    let st = store(dir.path());
    let cfg = Config::default();

    trajectory::start(&sc, &st, "demo", "s1", "demo").unwrap();
    trajectory::step(&sc, true, Some(1.0), "edit").unwrap();
    trajectory::step(&sc, false, Some(0.2), "test").unwrap();
    let finished = trajectory::end(&sc, &st, &cfg, false).unwrap().unwrap();

    assert_eq!(finished.success_rate, Some(0.5));
    assert_eq!(finished.status, trajectory::TrajectoryStatus::Completed);

    let status = trajectory::status(&sc, &st, "demo", 10).unwrap();
    assert_eq!(status["recent"].as_array().unwrap().len(), 1);
}

// ── S4: lesson injection ────────────────────────────────────────────

#[test]
fn s4_injection_returns_exactly_two_bullets_in_confidence_order() {
    let dir = tempdir().unwrap();
    let st = store(dir.path());
    let config = Config::default();

    for (text, confidence) in [
        ("use checkpoints", 0.9),
        ("shrink edits", 0.6),
        ("noise", 0.3),
    ] {
        let pattern = Pattern {
            text: text.to_string(),
            pattern_type: PatternType::Workflow,
            confidence,
            metadata: json!({}),
        };
        let mut value = serde_json::to_value(&pattern).unwrap();
        value["project"] = json!("demo");
        kv::store(
            &st.memory_store(),
            &format!("pattern:{text}"),
            value,
        )
        .unwrap();
    }

    let result = learning::inject(&st, "demo", "anything at all", &config).unwrap();
    let ctx = result["additionalContext"].as_str().unwrap();
    let bullets: Vec<&str> = ctx.lines().skip(1).collect();
    assert_eq!(bullets.len(), 2);
    assert_eq!(bullets[0], "- use checkpoints");
    assert!(bullets[1].starts_with("- Consider:"));
}

// ── S5: stuck claims ─────────────────────────────────────────────────

#[test]
fn s5_stuck_detector_moves_sessions_active_claims_to_stealable() {
    let dir = tempdir().unwrap();
    let st = store(dir.path());
    let sc = scratch(dir.path());

    claim::file_claim(&st, &sc, "A", Path::new("/a")).unwrap();
    claim::file_claim(&st, &sc, "A", Path::new("/b")).unwrap();

    let moved = claim::stuck_detector(&st, "A").unwrap();
    assert_eq!(moved, 2);

    let stealable = claims::list_claims(
        &st.claims_store(),
        ListFilter {
            claimant_prefix: None,
            status: Some(ClaimStatus::Stealable),
        },
    )
    .unwrap();
    assert_eq!(stealable.len(), 2);
    assert!(stealable
        .iter()
        .all(|c| c.steal_reason.as_deref() == Some("blocked-timeout")));
}

// ── S6: swarm lifecycle ─────────────────────────────────────────────

#[tokio::test]
async fn s6_swarm_submit_without_orchestrator_is_non_fatal() {
    std::env::set_var("HOOKS_ORCHESTRATOR_BIN", "definitely-not-a-real-binary-xyz");
    let config = Config::default();

    let init = swarm::init(Topology::HierarchicalMesh, &config).await;
    assert_eq!(init["success"], false); // no orchestrator on PATH in this test env

    let submit = swarm::submit("demo task", &config).await;
    assert_eq!(submit["success"], false);
    assert_eq!(submit["reason"], "not_supported");

    let shutdown = swarm::shutdown(true, &config).await;
    assert_eq!(shutdown["success"], false);

    std::env::remove_var("HOOKS_ORCHESTRATOR_BIN");
}
