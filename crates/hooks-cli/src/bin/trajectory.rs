//! Trajectory module (§4.5): `start`/`step`/`end`/`status` share one
//! executable differentiated by a subcommand, so the three lifecycle
//! events never drift out of sync on scratch-file format or key naming.
//!
//! `start` binds to the pre-task hook, `step` to each subtask's
//! post-tool-use event, and `end` is callable from both `Stop` and
//! `SubagentStop` (DESIGN.md open-question resolution: the host's
//! settings.json decides which boundary finalizes a trajectory, rather
//! than this binary guessing).

use clap::{Parser, Subcommand};
use coordination::{hookio, metrics, trajectory};
use hooks_cli::HookContext;
use serde_json::json;
use std::cell::RefCell;

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    event: Event,
}

#[derive(Subcommand)]
enum Event {
    Start,
    Step,
    End {
        #[arg(long)]
        force_failed: bool,
    },
    Status {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() {
    hookio::init_tracing();
    let args = Args::parse();

    match args.event {
        Event::Start => hookio::run_hook("trajectory-start", || {
            let event = hookio::read_event()?;
            let ctx = HookContext::resolve()?;
            let task = hooks_cli::task_description(&event);
            trajectory::start(&ctx.scratch, &ctx.store, &ctx.project, &ctx.session_id, &task)?;
            Ok(json!({}))
        }),
        Event::Step => hookio::run_hook("trajectory-step", || {
            let event = hookio::read_event()?;
            let ctx = HookContext::resolve()?;
            let action = hooks_cli::tool_name(&event).unwrap_or("unknown").to_string();
            let success = hooks_cli::step_success(&event);
            let quality = hooks_cli::step_quality(&event);
            trajectory::step(&ctx.scratch, success, quality, &action)?;
            Ok(json!({}))
        }),
        Event::End { force_failed } => {
            // Stashed so the best-effort metrics emission below can run
            // after the hook's stdout response is already written.
            let finished = RefCell::new(None);
            hookio::run_hook("trajectory-end", || {
                let _event = hookio::read_event().unwrap_or(json!({}));
                let ctx = HookContext::resolve()?;
                let result = trajectory::end(&ctx.scratch, &ctx.store, &ctx.config, force_failed)?;
                *finished.borrow_mut() = result.map(|t| (ctx.scratch, t));
                Ok(json!({}))
            });
            if let Some((scratch, t)) = finished.into_inner() {
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
        Event::Status { limit } => hookio::run_hook("trajectory-status", || {
            let ctx = HookContext::resolve()?;
            trajectory::status(&ctx.scratch, &ctx.store, &ctx.project, limit)
        }),
    }
}
