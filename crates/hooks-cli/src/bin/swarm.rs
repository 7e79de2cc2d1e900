//! Swarm lifecycle controller (§4.8) and the `/swarm` skill command
//! (§6.5). `submit` is reachable only from the `task` subcommand here,
//! never from a synchronous hook — the open question in DESIGN.md is
//! resolved by keeping it off the hook path entirely.

use clap::{Parser, Subcommand};
use coordination::config::Config;
use coordination::store::ScratchDir;
use coordination::swarm::{self, Topology};
use coordination::{identity, metrics};

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Init {
        #[arg(long, value_enum, default_value = "hierarchical-mesh")]
        topology: TopologyArg,
    },
    Spawn {
        count: u32,
    },
    Task {
        description: String,
    },
    Status {
        #[arg(long)]
        verbose: bool,
    },
    Consensus {
        topic: String,
        options: Vec<String>,
    },
    Broadcast {
        message: String,
    },
    Shutdown {
        #[arg(long, default_value_t = true)]
        graceful: bool,
    },
}

#[derive(Clone, clap::ValueEnum)]
enum TopologyArg {
    HierarchicalMesh,
    Mesh,
    Star,
    Ring,
}

impl From<TopologyArg> for Topology {
    fn from(t: TopologyArg) -> Self {
        match t {
            TopologyArg::HierarchicalMesh => Topology::HierarchicalMesh,
            TopologyArg::Mesh => Topology::Mesh,
            TopologyArg::Star => Topology::Star,
            TopologyArg::Ring => Topology::Ring,
        }
    }
}

fn confirmation_line(label: &str, result: &serde_json::Value) -> String {
    if result["success"].as_bool().unwrap_or(false) {
        format!("{label}: ok")
    } else {
        let reason = result
            .get("reason")
            .and_then(|r| r.as_str())
            .unwrap_or("unknown failure");
        format!("{label}: failed ({reason})")
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    coordination::hookio::init_tracing();
    let args = Args::parse();
    let config = Config::from_env();

    let (label, table, result) = match args.command {
        Command::Init { topology } => (
            "swarm init",
            "claude_mcp_system",
            swarm::init(topology.into(), &config).await,
        ),
        Command::Spawn { count } => (
            "swarm spawn",
            "claude_mcp_agents",
            swarm::spawn(count, &config).await,
        ),
        Command::Task { description } => (
            "swarm task",
            "claude_mcp_tasks",
            swarm::submit(&description, &config).await,
        ),
        Command::Status { verbose } => (
            "swarm status",
            "claude_mcp_system",
            swarm::status(verbose, &config).await,
        ),
        Command::Consensus { topic, options } => (
            "swarm consensus",
            "claude_mcp_system",
            swarm::consensus(&topic, &options, &config).await,
        ),
        Command::Broadcast { message } => (
            "swarm broadcast",
            "claude_mcp_system",
            swarm::broadcast(&message, &config).await,
        ),
        Command::Shutdown { graceful } => (
            "swarm shutdown",
            "claude_mcp_system",
            swarm::shutdown(graceful, &config).await,
        ),
    };

    println!("{}", confirmation_line(label, &result));

    let scratch = ScratchDir::from_env();
    let project = identity::project_name();
    let success = result["success"].as_bool().unwrap_or(false);
    metrics::emit(
        &[metrics::swarm_record(
            table,
            &project,
            vec![("success".to_string(), serde_json::json!(success))],
        )],
        &scratch,
    );
}
