//! Claim store (§3.1 "Claim", §4.1 `Claim`/`Release`/`MarkStealable`/
//! `Steal`/`ListClaims`), backed by `claims.json`:
//! `{"claims": {...}, "stealable": {...}, "contests": {}}`.
//!
//! A claim is unique per `issue_id` while `status=active`. Reacquiring the
//! same id with the same claimant is idempotent and does **not** refresh
//! `claimed_at` (open question resolved in DESIGN.md). A release by any
//! claimant other than the owner fails with `not_authorized`.

use crate::error::HookResult;
use crate::store::lockfile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Active,
    Stealable,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub issue_id: String,
    pub claimant: String,
    pub status: ClaimStatus,
    pub claimed_at: String,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub steal_reason: Option<String>,
    #[serde(default)]
    pub marked_stealable_at: Option<String>,
    #[serde(default)]
    pub context: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ClaimsDoc {
    #[serde(default)]
    claims: BTreeMap<String, Claim>,
    #[serde(default)]
    stealable: BTreeMap<String, Claim>,
    #[serde(default)]
    contests: BTreeMap<String, serde_json::Value>,
}

fn parse_doc(raw: &str) -> ClaimsDoc {
    if raw.trim().is_empty() {
        ClaimsDoc::default()
    } else {
        serde_json::from_str(raw).unwrap_or_default()
    }
}

fn load(doc_path: &Path) -> HookResult<ClaimsDoc> {
    Ok(match lockfile::read_shared(doc_path)? {
        None => ClaimsDoc::default(),
        Some(raw) => parse_doc(&raw),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing: Option<Claim>,
}

/// `Claim(id, claimant, context) -> {success, existing?}`. Never raises:
/// a conflict with a different claimant comes back as `success: false`.
pub fn claim(
    doc_path: &Path,
    issue_id: &str,
    claimant: &str,
    context: serde_json::Value,
) -> HookResult<ClaimResult> {
    let mut outcome = ClaimResult {
        success: false,
        existing: None,
    };
    lockfile::with_exclusive_lock(doc_path, |current| {
        let mut doc = parse_doc(&current);
        match doc.claims.get(issue_id) {
            Some(existing) if existing.claimant == claimant => {
                // Idempotent reacquire: no-op, no claimed_at refresh.
                outcome.success = true;
            }
            Some(existing) => {
                outcome.success = false;
                outcome.existing = Some(existing.clone());
            }
            None => {
                let new_claim = Claim {
                    issue_id: issue_id.to_string(),
                    claimant: claimant.to_string(),
                    status: ClaimStatus::Active,
                    claimed_at: crate::timeutil::now_rfc3339(),
                    progress: None,
                    steal_reason: None,
                    marked_stealable_at: None,
                    context,
                };
                doc.claims.insert(issue_id.to_string(), new_claim);
                outcome.success = true;
            }
        }
        Ok(serde_json::to_string_pretty(&doc)?)
    })?;
    Ok(outcome)
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<Claim>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

/// `Release(id, claimant) -> {success, previous?}`.
pub fn release(doc_path: &Path, issue_id: &str, claimant: &str) -> HookResult<ReleaseResult> {
    let mut outcome = ReleaseResult {
        success: false,
        previous: None,
        reason: None,
    };
    lockfile::with_exclusive_lock(doc_path, |current| {
        let mut doc = parse_doc(&current);
        match doc.claims.get(issue_id) {
            None => {
                outcome.reason = Some("not_found");
            }
            Some(existing) if existing.claimant != claimant => {
                outcome.reason = Some("not_authorized");
            }
            Some(_) => {
                let removed = doc.claims.remove(issue_id).unwrap();
                outcome.success = true;
                outcome.previous = Some(removed);
            }
        }
        Ok(serde_json::to_string_pretty(&doc)?)
    })?;
    Ok(outcome)
}

/// `MarkStealable(id, reason) -> ok`. No-op if the claim doesn't exist or
/// is already marked.
pub fn mark_stealable(doc_path: &Path, issue_id: &str, reason: &str) -> HookResult<()> {
    lockfile::with_exclusive_lock(doc_path, |current| {
        let mut doc = parse_doc(&current);
        if let Some(mut existing) = doc.claims.remove(issue_id) {
            existing.status = ClaimStatus::Stealable;
            existing.steal_reason = Some(reason.to_string());
            existing.marked_stealable_at = Some(crate::timeutil::now_rfc3339());
            doc.stealable.insert(issue_id.to_string(), existing);
        }
        Ok(serde_json::to_string_pretty(&doc)?)
    })
}

/// `Steal(id, new_claimant) -> {success, previous}`. Moves a stealable
/// claim back into `claims` under the new claimant.
pub fn steal(doc_path: &Path, issue_id: &str, new_claimant: &str) -> HookResult<ClaimResult> {
    let mut outcome = ClaimResult {
        success: false,
        existing: None,
    };
    lockfile::with_exclusive_lock(doc_path, |current| {
        let mut doc = parse_doc(&current);
        if let Some(previous) = doc.stealable.remove(issue_id) {
            outcome.existing = Some(previous.clone());
            outcome.success = true;
            doc.claims.insert(
                issue_id.to_string(),
                Claim {
                    issue_id: issue_id.to_string(),
                    claimant: new_claimant.to_string(),
                    status: ClaimStatus::Active,
                    claimed_at: crate::timeutil::now_rfc3339(),
                    progress: None,
                    steal_reason: None,
                    marked_stealable_at: None,
                    context: previous.context,
                },
            );
        }
        Ok(serde_json::to_string_pretty(&doc)?)
    })?;
    Ok(outcome)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListFilter<'a> {
    pub claimant_prefix: Option<&'a str>,
    pub status: Option<ClaimStatus>,
}

/// `ListClaims(filter) -> [...]`, read-only, scanning both `claims` and
/// `stealable` (completed claims are not retained — released/removed).
pub fn list_claims(doc_path: &Path, filter: ListFilter<'_>) -> HookResult<Vec<Claim>> {
    let doc = load(doc_path)?;
    let all = doc.claims.into_values().chain(doc.stealable.into_values());
    Ok(all
        .filter(|c| match filter.status {
            Some(s) => std::mem::discriminant(&c.status) == std::mem::discriminant(&s),
            None => true,
        })
        .filter(|c| match filter.claimant_prefix {
            Some(p) => c.claimant.starts_with(p),
            None => true,
        })
        .collect())
}

/// Update the `progress` field of an active claim owned by `claimant`.
pub fn update_progress(
    doc_path: &Path,
    issue_id: &str,
    claimant: &str,
    progress: u8,
) -> HookResult<bool> {
    let mut updated = false;
    lockfile::with_exclusive_lock(doc_path, |current| {
        let mut doc = parse_doc(&current);
        if let Some(existing) = doc.claims.get_mut(issue_id) {
            if existing.claimant == claimant {
                existing.progress = Some(progress.min(100));
                updated = true;
            }
        }
        Ok(serde_json::to_string_pretty(&doc)?)
    })?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_claim_by_different_claimant_conflicts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("claims.json");

        let r1 = claim(&path, "file:/a", "agent:A:editor", serde_json::json!({})).unwrap();
        assert!(r1.success);

        let r2 = claim(&path, "file:/a", "agent:B:editor", serde_json::json!({})).unwrap();
        assert!(!r2.success);
        assert_eq!(r2.existing.unwrap().claimant, "agent:A:editor");
    }

    #[test]
    fn reacquire_by_same_claimant_is_idempotent_without_timestamp_refresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("claims.json");

        claim(&path, "file:/a", "agent:A:editor", serde_json::json!({})).unwrap();
        let before = load(&path).unwrap().claims["file:/a"].claimed_at.clone();

        std::thread::sleep(std::time::Duration::from_millis(5));
        let r2 = claim(&path, "file:/a", "agent:A:editor", serde_json::json!({})).unwrap();
        assert!(r2.success);

        let after = load(&path).unwrap().claims["file:/a"].claimed_at.clone();
        assert_eq!(before, after);
    }

    #[test]
    fn claim_then_release_is_equivalent_to_empty_op() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("claims.json");

        claim(&path, "file:/a", "agent:A:editor", serde_json::json!({})).unwrap();
        let r = release(&path, "file:/a", "agent:A:editor").unwrap();
        assert!(r.success);

        let doc = load(&path).unwrap();
        assert!(doc.claims.is_empty());
    }

    #[test]
    fn release_by_non_owner_is_not_authorized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("claims.json");

        claim(&path, "file:/a", "agent:A:editor", serde_json::json!({})).unwrap();
        let r = release(&path, "file:/a", "agent:B:editor").unwrap();
        assert!(!r.success);
        assert_eq!(r.reason, Some("not_authorized"));
    }

    #[test]
    fn release_of_missing_claim_reports_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("claims.json");
        let r = release(&path, "file:/ghost", "agent:A:editor").unwrap();
        assert!(!r.success);
        assert_eq!(r.reason, Some("not_found"));
    }

    #[test]
    fn mark_stealable_then_steal_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("claims.json");

        claim(&path, "file:/a", "agent:A:editor", serde_json::json!({})).unwrap();
        mark_stealable(&path, "file:/a", "blocked-timeout").unwrap();

        let doc = load(&path).unwrap();
        assert!(doc.claims.get("file:/a").is_none());
        assert_eq!(
            doc.stealable["file:/a"].steal_reason.as_deref(),
            Some("blocked-timeout")
        );

        let stolen = steal(&path, "file:/a", "agent:B:editor").unwrap();
        assert!(stolen.success);

        let active = list_claims(
            &path,
            ListFilter {
                claimant_prefix: Some("agent:B"),
                status: Some(ClaimStatus::Active),
            },
        )
        .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].issue_id, "file:/a");
    }
}
