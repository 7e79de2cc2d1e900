//! `Stop` hook: mines patterns from this session's tool usage (§4.6
//! "extract") and stores any that fire. Never blocks the turn — a failure
//! here degrades to `{}` like every other hook.

use coordination::{hookio, learning};
use hooks_cli::HookContext;
use serde_json::json;

fn main() {
    hookio::init_tracing();
    hookio::run_hook("learning-extract", || {
        let event = hookio::read_event()?;
        let ctx = HookContext::resolve()?;

        let stats = hooks_cli::session_stats(&event, &ctx.scratch);
        let patterns = learning::extract(&ctx.store, &ctx.project, &stats, &ctx.config)?;

        Ok(json!({ "hookSpecificOutput": { "patterns_found": patterns.len() } }))
    });
}
