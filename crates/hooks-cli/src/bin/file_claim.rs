//! `PreToolUse` hook for write-class tools (Write/Edit/MultiEdit): the one
//! place in the system that can legitimately block a tool call (§4.7
//! "file-claim").

use coordination::{claim, hookio};
use hooks_cli::HookContext;
use serde_json::json;

fn main() {
    hookio::init_tracing();
    hookio::run_hook("file-claim", || {
        let event = hookio::read_event()?;
        let ctx = HookContext::resolve()?;

        let Some(path) = hooks_cli::file_path(&event) else {
            // No file_path on a write-class tool event is malformed input,
            // not a conflict; fail open rather than block an unrelated tool.
            return Ok(json!({}));
        };

        claim::file_claim(&ctx.store, &ctx.scratch, &ctx.session_id, &path)
    });
}
