//! `Stop` hook: moves every `active` claim held by this session to
//! `stealable` (§4.7 "stuck-detector"), so a later session can `Steal` it.

use coordination::{claim, hookio, metrics};
use hooks_cli::HookContext;
use serde_json::json;
use std::cell::RefCell;

fn main() {
    hookio::init_tracing();
    let ctx_cell: RefCell<Option<HookContext>> = RefCell::new(None);

    hookio::run_hook("stuck-detector", || {
        let _event = hookio::read_event().unwrap_or_else(|_| json!({}));
        let ctx = HookContext::resolve()?;

        let moved = claim::stuck_detector(&ctx.store, &ctx.session_id)?;
        let response = json!({ "hookSpecificOutput": { "claims_marked_stealable": moved } });
        *ctx_cell.borrow_mut() = Some(ctx);
        Ok(response)
    });

    if let Some(ctx) = ctx_cell.into_inner() {
        if let Ok(view) = claim::dashboard(&ctx.store, None) {
            metrics::emit(
                &[metrics::claim_record(
                    &ctx.project,
                    view.active.len(),
                    view.stealable.len(),
                )],
                &ctx.scratch,
            );
        }
    }
}
