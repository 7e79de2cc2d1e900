//! `PreToolUse` hook for task-level work: informational visibility only,
//! never blocks (§4.7 "task-claim").

use coordination::{claim, hookio};
use hooks_cli::HookContext;
use serde_json::json;

fn main() {
    hookio::init_tracing();
    hookio::run_hook("task-claim", || {
        let event = hookio::read_event()?;
        let ctx = HookContext::resolve()?;

        if let Some(task_id) = hooks_cli::task_id(&event) {
            let role = hooks_cli::role(&event);
            claim::task_claim(&ctx.store, &ctx.session_id, &task_id, &role);
        }

        Ok(json!({}))
    });
}
