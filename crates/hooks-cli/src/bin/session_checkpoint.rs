//! `Stop` hook: writes final session state (§4.4 "checkpoint"), flushing
//! any still-open trajectory as `failed` first.

use coordination::{hookio, metrics, session, trajectory};
use hooks_cli::HookContext;
use serde_json::json;
use std::cell::RefCell;

fn main() {
    hookio::init_tracing();
    let flushed = RefCell::new(None);

    hookio::run_hook("session-checkpoint", || {
        let event = hookio::read_event()?;
        let ctx = HookContext::resolve()?;

        let closed = trajectory::end(&ctx.scratch, &ctx.store, &ctx.config, true)?;

        let state = event.get("state").cloned().unwrap_or_else(|| json!({}));
        session::checkpoint(&ctx.store, &ctx.project, &ctx.session_id, state)?;

        *flushed.borrow_mut() = closed.map(|t| (ctx.scratch, t));
        Ok(json!({}))
    });

    if let Some((scratch, t)) = flushed.into_inner() {
        metrics::emit(
            &[metrics::trajectory_record(
                &t.project,
                t.success_rate.unwrap_or(0.0),
                t.steps.len(),
            )],
            &scratch,
        );
    }
}
