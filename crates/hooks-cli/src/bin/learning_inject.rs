//! `UserPromptSubmit` hook: retrieves confidence-ranked lessons relevant to
//! this project and injects them as `additionalContext` (§4.6 "inject").
//!
//! An orchestrator-backed `pattern-search` path is bounded by a 2s
//! timeout; this implementation always takes the file-store fallback (a
//! linear scan with a confidence floor), which is local and fast enough
//! that the timeout never matters in practice — the budget is still
//! enforced at the `Config::LEARNING_INJECT_TIMEOUT` level by the
//! caller if ever routed through the gateway.

use coordination::{hookio, learning};
use hooks_cli::HookContext;

fn main() {
    hookio::init_tracing();
    hookio::run_hook("learning-inject", || {
        let event = hookio::read_event()?;
        let ctx = HookContext::resolve()?;
        let prompt = hooks_cli::prompt_text(&event);

        learning::inject(&ctx.store, &ctx.project, &prompt, &ctx.config)
    });
}
