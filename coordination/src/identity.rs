//! Project name and session id resolution.
//!
//! Both functions are idempotent for the lifetime of one session: the
//! environment override always wins, and the derived fallback is cached to
//! a scratch file so a second call in a later process still agrees with the
//! first (`CLAUDE_SESSION_ID` is rarely set by the host in practice, so the
//! derived value is the common path).

use crate::error::{HookError, HookResult};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const PROJECT_ENV: &str = "CLAUDE_PROJECT_NAME";
pub const SESSION_ENV: &str = "CLAUDE_SESSION_ID";

/// Resolve the project name: env override, then `basename(git_root)`, then
/// `basename(cwd)`.
pub fn project_name() -> String {
    if let Ok(v) = std::env::var(PROJECT_ENV) {
        if !v.is_empty() {
            return v;
        }
    }
    if let Some(root) = git_root(&std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))) {
        if let Some(name) = root.file_name() {
            return name.to_string_lossy().into_owned();
        }
    }
    std::env::current_dir()
        .ok()
        .and_then(|d| d.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "default".to_string())
}

fn git_root(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        if dir.join(".git").exists() {
            return Some(dir);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Resolve the session id: env override, then a value derived from this
/// process's pid and start time, cached to `scratch_dir/session_state.json`
/// so subsequent hook invocations within the same host session agree.
pub fn session_id(scratch_dir: &Path) -> HookResult<String> {
    if let Ok(v) = std::env::var(SESSION_ENV) {
        if !v.is_empty() {
            return Ok(v);
        }
    }

    let cache_path = scratch_dir.join("session_state.json");
    if let Ok(raw) = std::fs::read_to_string(&cache_path) {
        if let Ok(v) = serde_json::from_str::<serde_json::Value>(&raw) {
            if let Some(id) = v.get("session_id").and_then(|s| s.as_str()) {
                return Ok(id.to_string());
            }
        }
    }

    let pid = std::process::id();
    let started = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let derived = format!("pid{pid}-{started}");

    std::fs::create_dir_all(scratch_dir).map_err(|e| HookError::io(scratch_dir, e))?;
    let payload = serde_json::json!({ "session_id": derived });
    std::fs::write(&cache_path, serde_json::to_string(&payload)?)
        .map_err(|e| HookError::io(&cache_path, e))?;

    Ok(derived)
}
