//! `SubagentStop` hook: releases every task claim held by this session
//! (§4.7 "task-release" — symmetric to task-claim, never blocks).

use coordination::{claim, hookio};
use hooks_cli::HookContext;
use serde_json::json;

fn main() {
    hookio::init_tracing();
    hookio::run_hook("task-release", || {
        let _event = hookio::read_event().unwrap_or_else(|_| json!({}));
        let ctx = HookContext::resolve()?;

        let released = claim::task_release_all(&ctx.store, &ctx.session_id)?;
        Ok(json!({ "hookSpecificOutput": { "tasks_released": released } }))
    });
}
