//! `PostToolUse` hook for write-class tools: releases the claim taken by
//! the matching `file-claim` and fires a best-effort notification (§4.7
//! "file-release"). Always a no-op response; failures are logged and
//! swallowed, never surfaced.

use coordination::{claim, hookio};
use hooks_cli::HookContext;
use serde_json::json;

fn main() {
    hookio::init_tracing();
    hookio::run_hook("file-release", || {
        let event = hookio::read_event()?;
        let ctx = HookContext::resolve()?;

        if let Some(path) = hooks_cli::file_path(&event) {
            claim::file_release(&ctx.store, &ctx.scratch, &ctx.session_id, &path)?;
        }

        Ok(json!({}))
    });
}
