//! `UserPromptSubmit` hook: detects a crashed/interrupted prior session and
//! injects a recovery note (§4.4 "restore-check"). Also makes sure a
//! session entry exists for this session id, per §3.3 "created at first
//! hook invocation".

use coordination::{hookio, session};
use hooks_cli::HookContext;

fn main() {
    hookio::init_tracing();
    hookio::run_hook("session-restore-check", || {
        let _event = hookio::read_event()?;
        let ctx = HookContext::resolve()?;

        let response = session::restore_check(&ctx.store, &ctx.project, &ctx.config)?;
        session::ensure_started(&ctx.store, &ctx.project, &ctx.session_id)?;

        Ok(response)
    });
}
