//! Session module (§4.4): `checkpoint` and `restore-check`.

use crate::config::Config;
use crate::error::HookResult;
use crate::store::{kv, StoreRoot};
use crate::timeutil;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEntry {
    pub session_id: String,
    pub project: String,
    pub started_at: String,
    #[serde(default)]
    pub completed: bool,
    pub last_activity: String,
    #[serde(default)]
    pub ended_at: Option<String>,
    #[serde(default)]
    pub state: serde_json::Value,
}

fn session_key(project: &str, session_id: &str) -> String {
    format!("session:{project}:{session_id}")
}

fn last_alias_key(project: &str) -> String {
    format!("session:{project}:last")
}

/// Ensure a session entry exists, creating it with `completed=false` on
/// first invocation for this session (§3.3 "created at first hook
/// invocation").
pub fn ensure_started(
    store: &StoreRoot,
    project: &str,
    session_id: &str,
) -> HookResult<SessionEntry> {
    let key = session_key(project, session_id);
    if let Some(existing) = kv::retrieve(&store.memory_store(), &key)? {
        if let Ok(entry) = serde_json::from_value::<SessionEntry>(existing) {
            return Ok(entry);
        }
    }
    let now = timeutil::now_rfc3339();
    let entry = SessionEntry {
        session_id: session_id.to_string(),
        project: project.to_string(),
        started_at: now.clone(),
        completed: false,
        last_activity: now,
        ended_at: None,
        state: json!({}),
    };
    kv::store(&store.memory_store(), &key, serde_json::to_value(&entry)?)?;
    kv::store(
        &store.memory_store(),
        &last_alias_key(project),
        serde_json::to_value(&entry)?,
    )?;
    Ok(entry)
}

/// **checkpoint**: writes the final session state at session end, marking
/// it completed. Also flushes any unclosed trajectory as `failed` (done by
/// the caller via [`crate::trajectory::end`] before calling this, since
/// that needs the session id too). Always logically a no-op response
/// (`{}`) to the host, per §4.4.
pub fn checkpoint(
    store: &StoreRoot,
    project: &str,
    session_id: &str,
    state: serde_json::Value,
) -> HookResult<()> {
    let key = session_key(project, session_id);
    let now = timeutil::now_rfc3339();

    let started_at = kv::retrieve(&store.memory_store(), &key)?
        .and_then(|v| serde_json::from_value::<SessionEntry>(v).ok())
        .map(|e| e.started_at)
        .unwrap_or_else(|| now.clone());

    let entry = SessionEntry {
        session_id: session_id.to_string(),
        project: project.to_string(),
        started_at,
        completed: true,
        last_activity: now.clone(),
        ended_at: Some(now),
        state,
    };

    kv::store(&store.memory_store(), &key, serde_json::to_value(&entry)?)?;
    kv::store(
        &store.memory_store(),
        &last_alias_key(project),
        serde_json::to_value(&entry)?,
    )?;
    Ok(())
}

/// **restore-check**: detects an interrupted previous session and emits
/// the host `additionalContext` payload exactly once (alias reset).
pub fn restore_check(
    store: &StoreRoot,
    project: &str,
    config: &Config,
) -> HookResult<serde_json::Value> {
    let alias = last_alias_key(project);
    let last = kv::retrieve(&store.memory_store(), &alias)?;

    let Some(raw) = last else {
        return Ok(json!({}));
    };
    let Ok(entry) = serde_json::from_value::<SessionEntry>(raw) else {
        return Ok(json!({}));
    };

    if entry.completed {
        return Ok(json!({}));
    }

    let age = timeutil::now().signed_duration_since(timeutil::parse(&entry.started_at));
    let grace = chrono::Duration::from_std(config.grace_window).unwrap_or_default();
    if age < grace {
        return Ok(json!({}));
    }

    // Interrupted. Reset the alias (mark completed) so a second consecutive
    // prompt in the same turn doesn't re-inject (§3.2, testable property 4).
    let mut reset = entry.clone();
    reset.completed = true;
    kv::store(&store.memory_store(), &alias, serde_json::to_value(&reset)?)?;

    let task = task_description(&entry.state);
    let message = format!("[Interrupted session detected: {task}] (recovery suggestion: resume or explicitly discard prior state)");
    Ok(json!({ "additionalContext": message }))
}

fn task_description(state: &serde_json::Value) -> String {
    state
        .get("task")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown task")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn root(dir: &std::path::Path) -> StoreRoot {
        StoreRoot::new(dir.to_path_buf())
    }

    #[test]
    fn restore_check_flags_interrupted_session_once() {
        let dir = tempdir().unwrap();
        let store = root(dir.path());
        let config = Config::default();

        let old_started = timeutil::now_rfc3339_minus_secs(600);
        let entry = SessionEntry {
            session_id: "s1".into(),
            project: "demo".into(),
            started_at: old_started,
            completed: false,
            last_activity: timeutil::now_rfc3339(),
            ended_at: None,
            state: json!({"task": "refactor parser"}),
        };
        kv::store(
            &store.memory_store(),
            "session:demo:last",
            serde_json::to_value(&entry).unwrap(),
        )
        .unwrap();

        let first = restore_check(&store, "demo", &config).unwrap();
        assert!(first["additionalContext"]
            .as_str()
            .unwrap()
            .contains("Interrupted"));

        let second = restore_check(&store, "demo", &config).unwrap();
        assert_eq!(second, json!({}));
    }

    #[test]
    fn restore_check_on_completed_session_is_noop() {
        let dir = tempdir().unwrap();
        let store = root(dir.path());
        let config = Config::default();

        checkpoint(&store, "demo", "s1", json!({})).unwrap();
        let result = restore_check(&store, "demo", &config).unwrap();
        assert_eq!(result, json!({}));
    }

    #[test]
    fn restore_check_on_young_session_is_noop() {
        let dir = tempdir().unwrap();
        let store = root(dir.path());
        let config = Config::default();

        ensure_started(&store, "demo", "s1").unwrap();
        let result = restore_check(&store, "demo", &config).unwrap();
        assert_eq!(result, json!({}));
    }
}
