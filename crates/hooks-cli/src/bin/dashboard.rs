//! On-demand claim dashboard (§4.7 "dashboard"). Unlike the other
//! binaries in this crate this is not a host lifecycle hook — it is run
//! directly by a user or script, prints human-readable text by default,
//! and never mutates the claim store except via the explicit `--export`
//! convenience copy (§3 supplement).

use clap::Parser;
use coordination::claim::{self, DashboardView};
use coordination::store::StoreRoot;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::interval;

#[derive(Parser)]
struct Args {
    /// Print machine-readable JSON instead of the text summary.
    #[arg(long)]
    json: bool,
    /// Re-render on a fixed interval until interrupted.
    #[arg(long)]
    watch: bool,
    /// Interval in seconds between `--watch` refreshes.
    #[arg(long, default_value_t = 2)]
    interval: u64,
    /// Copy the live claims.json to this path before rendering.
    #[arg(long)]
    export: Option<PathBuf>,
}

fn render_text(view: &DashboardView) {
    println!("ACTIVE");
    for row in &view.active {
        println!(
            "  {} claimed_by={} age={}s progress={}",
            row.id,
            row.claimant,
            row.age_secs,
            row.progress.map(|p| p.to_string()).unwrap_or_else(|| "-".into())
        );
    }
    println!("STEALABLE");
    for row in &view.stealable {
        println!("  {} reason={} age={}s", row.id, row.reason, row.age_secs);
    }
    println!("{}", view.summary);
}

fn render_once(store: &StoreRoot, args: &Args) {
    let view = match claim::dashboard(store, args.export.as_deref()) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("dashboard: failed to read claim store: {e}");
            return;
        }
    };
    if args.json {
        match serde_json::to_string_pretty(&view) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("dashboard: failed to serialize view: {e}"),
        }
    } else {
        render_text(&view);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    let store = StoreRoot::from_env();

    if !args.watch {
        render_once(&store, &args);
        return;
    }

    let mut ticker = interval(Duration::from_secs(args.interval.max(1)));
    loop {
        ticker.tick().await;
        print!("\x1B[2J\x1B[1;1H"); // clear terminal between frames
        render_once(&store, &args);
    }
}
