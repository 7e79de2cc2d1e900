//! Claim module (§4.7): file-claim/file-release (blocking), task-claim/
//! task-release (informational, never blocks), stuck-detector, dashboard.

use crate::error::{HookError, HookResult};
use crate::store::claims::{self, ClaimStatus, ListFilter};
use crate::store::{ScratchDir, StoreRoot};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub fn file_issue_id(path: &Path) -> HookResult<String> {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| HookError::io(path, e))?
            .join(path)
    };
    Ok(format!("file:{}", abs.display()))
}

pub fn task_issue_id(task_id: &str) -> String {
    format!("task:{task_id}")
}

pub fn editor_claimant(session_id: &str) -> String {
    format!("agent:{session_id}:editor")
}

pub fn claimant_prefix(session_id: &str) -> String {
    format!("agent:{session_id}:")
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ScratchClaims {
    #[serde(default)]
    files: BTreeMap<String, String>, // issue_id -> original file_path string
}

fn read_scratch_claims(scratch: &ScratchDir) -> HookResult<ScratchClaims> {
    let path = scratch.active_file_claims();
    match std::fs::read_to_string(&path) {
        Ok(raw) if raw.trim().is_empty() => Ok(ScratchClaims::default()),
        Ok(raw) => Ok(serde_json::from_str(&raw).unwrap_or_default()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ScratchClaims::default()),
        Err(e) => Err(HookError::io(&path, e)),
    }
}

fn write_scratch_claims(scratch: &ScratchDir, doc: &ScratchClaims) -> HookResult<()> {
    let path = scratch.active_file_claims();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| HookError::io(parent, e))?;
    }
    std::fs::write(&path, serde_json::to_string(doc)?).map_err(|e| HookError::io(&path, e))
}

/// **file-claim** (pre-tool-use, write-class tools). On success, records
/// the claim in per-session scratch so release can find it later even if
/// the post-hook event omits `file_path`.
pub fn file_claim(
    store: &StoreRoot,
    scratch: &ScratchDir,
    session_id: &str,
    file_path: &Path,
) -> HookResult<serde_json::Value> {
    let issue_id = file_issue_id(file_path)?;
    let claimant = editor_claimant(session_id);

    let result = claims::claim(&store.claims_store(), &issue_id, &claimant, json!({}))?;
    if result.success {
        let mut scratch_doc = read_scratch_claims(scratch)?;
        scratch_doc
            .files
            .insert(issue_id, file_path.display().to_string());
        write_scratch_claims(scratch, &scratch_doc)?;
        return Ok(json!({}));
    }

    let existing_claimant = result
        .existing
        .map(|c| c.claimant)
        .unwrap_or_else(|| "unknown".to_string());
    Ok(json!({
        "decision": "block",
        "reason": format!("File claimed by {existing_claimant}"),
    }))
}

/// **file-release** (post-tool-use, write-class tools). Failures are
/// logged and swallowed — release is a best-effort cleanup, never a block.
pub fn file_release(
    store: &StoreRoot,
    scratch: &ScratchDir,
    session_id: &str,
    file_path: &Path,
) -> HookResult<()> {
    let issue_id = file_issue_id(file_path)?;
    let claimant = editor_claimant(session_id);

    match claims::release(&store.claims_store(), &issue_id, &claimant) {
        Ok(result) if result.success => {
            let message = format!("file released: {}", file_path.display());
            crate::gateway::invoke_detached_sync(&["hooks", "notify", &message]);
        }
        Ok(result) => {
            tracing::warn!(issue_id, reason = ?result.reason, "file release did not succeed");
        }
        Err(e) => tracing::warn!(error = %e, "file release failed"),
    }

    let mut scratch_doc = read_scratch_claims(scratch)?;
    scratch_doc.files.remove(&issue_id);
    write_scratch_claims(scratch, &scratch_doc)?;
    Ok(())
}

/// **task-claim** (pre, informational). Always returns `{}` to the host
/// regardless of conflict — visibility only, never a block.
pub fn task_claim(store: &StoreRoot, session_id: &str, task_id: &str, role: &str) {
    let issue_id = task_issue_id(task_id);
    let claimant = format!("agent:{session_id}:{role}");
    if let Err(e) = claims::claim(&store.claims_store(), &issue_id, &claimant, json!({})) {
        tracing::warn!(error = %e, "task claim failed, ignoring (informational only)");
    }
}

/// **task-release** (post, at subagent stop): releases every task claim
/// held by this session.
pub fn task_release_all(store: &StoreRoot, session_id: &str) -> HookResult<usize> {
    let prefix = claimant_prefix(session_id);
    let held = claims::list_claims(
        &store.claims_store(),
        ListFilter {
            claimant_prefix: Some(&prefix),
            status: Some(ClaimStatus::Active),
        },
    )?;

    let mut released = 0;
    for c in held.into_iter().filter(|c| c.issue_id.starts_with("task:")) {
        if claims::release(&store.claims_store(), &c.issue_id, &c.claimant)?.success {
            released += 1;
        }
    }
    Ok(released)
}

/// **stuck-detector** (session stop): move every `active` claim held by
/// this session to `stealable` with `reason = blocked-timeout`.
pub fn stuck_detector(store: &StoreRoot, session_id: &str) -> HookResult<usize> {
    let prefix = claimant_prefix(session_id);
    let held = claims::list_claims(
        &store.claims_store(),
        ListFilter {
            claimant_prefix: Some(&prefix),
            status: Some(ClaimStatus::Active),
        },
    )?;

    let mut moved = 0;
    for c in &held {
        claims::mark_stealable(&store.claims_store(), &c.issue_id, "blocked-timeout")?;
        moved += 1;
    }
    Ok(moved)
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub active: Vec<DashboardRow>,
    pub stealable: Vec<DashboardStealRow>,
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct DashboardRow {
    pub id: String,
    pub claimant: String,
    pub age_secs: i64,
    pub progress: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct DashboardStealRow {
    pub id: String,
    pub reason: String,
    pub age_secs: i64,
}

/// **dashboard** (on-demand renderer, no mutation). `--export <path>`
/// copies the live `claims.json` to `path` (§3 supplement).
pub fn dashboard(store: &StoreRoot, export_to: Option<&Path>) -> HookResult<DashboardView> {
    if let Some(dest) = export_to {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| HookError::io(parent, e))?;
        }
        std::fs::copy(store.claims_store(), dest)
            .map_err(|e| HookError::io(dest, e))?;
    }

    let now = crate::timeutil::now();
    let all = claims::list_claims(&store.claims_store(), ListFilter::default())?;

    let mut active = Vec::new();
    let mut stealable = Vec::new();
    for c in all {
        let age = now
            .signed_duration_since(crate::timeutil::parse(
                c.marked_stealable_at.as_deref().unwrap_or(&c.claimed_at),
            ))
            .num_seconds();
        match c.status {
            ClaimStatus::Active => active.push(DashboardRow {
                id: c.issue_id,
                claimant: c.claimant,
                age_secs: age,
                progress: c.progress,
            }),
            ClaimStatus::Stealable => stealable.push(DashboardStealRow {
                id: c.issue_id,
                reason: c.steal_reason.unwrap_or_default(),
                age_secs: age,
            }),
            ClaimStatus::Completed => {}
        }
    }

    let summary = format!(
        "{} active, {} stealable, 0 completed",
        active.len(),
        stealable.len()
    );
    Ok(DashboardView {
        active,
        stealable,
        summary,
    })
}

/// Convenience for tests/binaries that want a PathBuf form of `file_issue_id`.
pub fn normalize_path(path: &Path) -> HookResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .map_err(|e| HookError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store(dir: &std::path::Path) -> StoreRoot {
        StoreRoot::new(dir.join("store"))
    }
    fn scratch(dir: &std::path::Path) -> ScratchDir {
        ScratchDir::new(dir.join("scratch"))
    }

    #[test]
    fn second_session_file_claim_is_blocked() {
        let dir = tempdir().unwrap();
        let st = store(dir.path());
        let sc_a = scratch(&dir.path().join("a"));
        let sc_b = scratch(&dir.path().join("b"));

        let r1 = file_claim(&st, &sc_a, "A", Path::new("/tmp/x.py")).unwrap();
        assert_eq!(r1, json!({}));

        let r2 = file_claim(&st, &sc_b, "B", Path::new("/tmp/x.py")).unwrap();
        assert_eq!(r2["decision"], "block");
        assert!(r2["reason"].as_str().unwrap().contains("agent:A"));
    }

    #[test]
    fn release_then_reclaim_succeeds() {
        let dir = tempdir().unwrap();
        let st = store(dir.path());
        let sc = scratch(dir.path());

        file_claim(&st, &sc, "A", Path::new("/tmp/y.py")).unwrap();
        file_release(&st, &sc, "A", Path::new("/tmp/y.py")).unwrap();

        let r = file_claim(&st, &sc, "B", Path::new("/tmp/y.py")).unwrap();
        assert_eq!(r, json!({}));
    }

    #[test]
    fn stuck_detector_moves_sessions_claims_to_stealable() {
        let dir = tempdir().unwrap();
        let st = store(dir.path());
        let sc = scratch(dir.path());

        file_claim(&st, &sc, "A", Path::new("/a")).unwrap();
        file_claim(&st, &sc, "A", Path::new("/b")).unwrap();

        let moved = stuck_detector(&st, "A").unwrap();
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

    #[test]
    fn task_claim_never_blocks_on_conflict() {
        let dir = tempdir().unwrap();
        let st = store(dir.path());
        task_claim(&st, "A", "t1", "coder");
        // Second claimant attempts the same task id; task-claim has no
        // return value to block with, it's purely informational.
        task_claim(&st, "B", "t1", "coder");
        let all = claims::list_claims(&st.claims_store(), ListFilter::default()).unwrap();
        // Only A's claim is recorded since the store-level claim still
        // conflicts; the hook itself simply never surfaces that as a block.
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].claimant, "agent:A:coder");
    }
}
