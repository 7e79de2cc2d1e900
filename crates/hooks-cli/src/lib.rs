//! Shared plumbing for the hook binaries in `src/bin/`. Each binary stays a
//! thin argument-parsing shell: it reads the host's event JSON, resolves
//! project/session identity and the on-disk store locations, calls into
//! `coordination`, and writes the response — this module is just the glue
//! so that boilerplate isn't copy-pasted eleven times.

use coordination::config::Config;
use coordination::learning::SessionStats;
use coordination::store::{ScratchDir, StoreRoot};
use coordination::{identity, HookResult};
use serde_json::Value;
use std::collections::HashMap;

/// Everything a hook binary needs to call into the coordination core,
/// resolved once per invocation.
pub struct HookContext {
    pub store: StoreRoot,
    pub scratch: ScratchDir,
    pub project: String,
    pub session_id: String,
    pub config: Config,
}

impl HookContext {
    pub fn resolve() -> HookResult<Self> {
        let scratch = ScratchDir::from_env();
        let session_id = identity::session_id(scratch.dir())?;
        Ok(Self {
            store: StoreRoot::from_env(),
            project: identity::project_name(),
            session_id,
            scratch,
            config: Config::from_env(),
        })
    }
}

/// `tool_input.file_path`, the field every write-class tool event carries.
pub fn file_path(event: &Value) -> Option<std::path::PathBuf> {
    event
        .get("tool_input")
        .and_then(|v| v.get("file_path"))
        .and_then(|v| v.as_str())
        .map(std::path::PathBuf::from)
}

pub fn tool_name(event: &Value) -> Option<&str> {
    event.get("tool_name").and_then(|v| v.as_str())
}

/// `success` for a trajectory step: `tool_response.is_error != true` unless
/// the host supplied an explicit override (§4.5 "success defaults to
/// tool_response.is_error ≠ true").
pub fn step_success(event: &Value) -> bool {
    event
        .get("tool_response")
        .and_then(|v| v.get("is_error"))
        .and_then(|v| v.as_bool())
        .map(|is_error| !is_error)
        .unwrap_or(true)
}

/// Optional per-step quality score the host may attach to a tool response;
/// `trajectory::step` defaults this to 1.0 when absent.
pub fn step_quality(event: &Value) -> Option<f64> {
    event
        .get("tool_response")
        .and_then(|v| v.get("quality"))
        .and_then(|v| v.as_f64())
}

/// Best-effort task description for a new trajectory: an explicit `task`
/// field, then the triggering tool's description, then the raw prompt.
pub fn task_description(event: &Value) -> String {
    event
        .get("task")
        .and_then(|v| v.as_str())
        .or_else(|| {
            event
                .get("tool_input")
                .and_then(|v| v.get("description"))
                .and_then(|v| v.as_str())
        })
        .or_else(|| event.get("prompt").and_then(|v| v.as_str()))
        .unwrap_or("unspecified task")
        .to_string()
}

pub fn prompt_text(event: &Value) -> String {
    event
        .get("prompt")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

/// `agent_id` / role suffix used by the task-claim namespace (`agent:{id}:{role}`).
pub fn role(event: &Value) -> String {
    event
        .get("agent_id")
        .and_then(|v| v.as_str())
        .unwrap_or("agent")
        .to_string()
}

/// Name used for the `task_id` a task-claim event refers to.
pub fn task_id(event: &Value) -> Option<String> {
    event
        .get("task_id")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Build the learning module's [`SessionStats`] from whatever the host
/// supplied inline on the `Stop` event (`tool_usage`), falling back to the
/// per-session analysis scratch file (§4.6 "supplied by the host in the
/// event, or looked up in a session-analysis scratch file").
pub fn session_stats(event: &Value, scratch: &ScratchDir) -> SessionStats {
    let source = event
        .get("tool_usage")
        .cloned()
        .or_else(|| {
            std::fs::read_to_string(scratch.session_analysis())
                .ok()
                .and_then(|raw| serde_json::from_str(&raw).ok())
        })
        .unwrap_or_else(|| Value::Object(Default::default()));

    let file_edit_counts: HashMap<String, u32> = source
        .get("file_edit_counts")
        .and_then(|v| v.as_object())
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| v.as_u64().map(|n| (k.clone(), n as u32)))
                .collect()
        })
        .unwrap_or_default();

    let total_tool_calls = source
        .get("total_tool_calls")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;
    let error_count = source
        .get("error_count")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;
    let quality_series = source
        .get("quality_series")
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|v| v.as_f64()).collect())
        .unwrap_or_default();

    SessionStats {
        file_edit_counts,
        total_tool_calls,
        error_count,
        quality_series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_path_reads_tool_input() {
        let event = json!({"tool_input": {"file_path": "/tmp/a.rs"}});
        assert_eq!(file_path(&event), Some(std::path::PathBuf::from("/tmp/a.rs")));
        assert_eq!(file_path(&json!({})), None);
    }

    #[test]
    fn step_success_defaults_true_without_is_error() {
        assert!(step_success(&json!({})));
        assert!(!step_success(
            &json!({"tool_response": {"is_error": true}})
        ));
        assert!(step_success(
            &json!({"tool_response": {"is_error": false}})
        ));
    }

    #[test]
    fn task_description_falls_back_through_task_then_tool_input_then_prompt() {
        assert_eq!(
            task_description(&json!({"task": "refactor"})),
            "refactor"
        );
        assert_eq!(
            task_description(&json!({"tool_input": {"description": "run tests"}})),
            "run tests"
        );
        assert_eq!(task_description(&json!({"prompt": "fix bug"})), "fix bug");
        assert_eq!(task_description(&json!({})), "unspecified task");
    }

    #[test]
    fn session_stats_reads_inline_tool_usage_over_scratch_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(dir.path().to_path_buf());
        let event = json!({
            "tool_usage": {
                "file_edit_counts": {"src/main.rs": 4},
                "total_tool_calls": 10,
                "error_count": 2,
                "quality_series": [1.0, 0.5],
            }
        });
        let stats = session_stats(&event, &scratch);
        assert_eq!(stats.file_edit_counts["src/main.rs"], 4);
        assert_eq!(stats.total_tool_calls, 10);
        assert_eq!(stats.error_count, 2);
        assert_eq!(stats.quality_series, vec![1.0, 0.5]);
    }

    #[test]
    fn session_stats_falls_back_to_scratch_file_when_event_has_no_tool_usage() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(dir.path().to_path_buf());
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(
            scratch.session_analysis(),
            json!({"total_tool_calls": 3, "error_count": 1}).to_string(),
        )
        .unwrap();

        let stats = session_stats(&json!({}), &scratch);
        assert_eq!(stats.total_tool_calls, 3);
        assert_eq!(stats.error_count, 1);
    }
}
