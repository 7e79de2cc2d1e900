//! Swarm module (§4.8): lifecycle controller over the orchestrator
//! gateway. `submit` stays off the synchronous hook path entirely per the
//! open-question resolution in DESIGN.md — it is only reachable from the
//! `/swarm task` skill subcommand.

use crate::config::Config;
use crate::gateway::{self, GatewayResult};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Topology {
    HierarchicalMesh,
    Mesh,
    Star,
    Ring,
}

impl Topology {
    fn as_flag(&self) -> &'static str {
        match self {
            Topology::HierarchicalMesh => "hierarchical-mesh",
            Topology::Mesh => "mesh",
            Topology::Star => "star",
            Topology::Ring => "ring",
        }
    }
}

fn summarize(result: GatewayResult) -> serde_json::Value {
    match (result.success, result.parsed) {
        (true, Some(parsed)) => json!({ "success": true, "result": parsed }),
        (true, None) => json!({ "success": true, "stdout": result.stdout }),
        (false, _) => json!({
            "success": false,
            "reason": result.failure.unwrap_or("external"),
            "stderr": result.stderr,
        }),
    }
}

pub async fn init(topology: Topology, config: &Config) -> serde_json::Value {
    let result = gateway::invoke(
        &["hive-mind", "init", "--topology", topology.as_flag()],
        None,
        None,
        config,
    )
    .await;
    summarize(result)
}

pub async fn spawn(count: u32, config: &Config) -> serde_json::Value {
    let count_str = count.to_string();
    let result = gateway::invoke(
        &["hive-mind", "spawn", "--count", &count_str],
        None,
        None,
        config,
    )
    .await;
    summarize(result)
}

/// `submit` may legitimately return `not_supported` when the gateway's
/// companion server is not running; the caller must treat that as a known
/// limitation, not an error (§4.8, testable scenario S6).
pub async fn submit(description: &str, config: &Config) -> serde_json::Value {
    let payload = json!({ "description": description });
    let result = gateway::invoke(&["hive-mind", "submit"], Some(&payload), None, config).await;

    if result.failure == Some("not_installed") {
        return json!({ "success": false, "reason": "not_supported" });
    }
    if !result.success && result.stderr.to_lowercase().contains("not running") {
        return json!({ "success": false, "reason": "not_supported" });
    }
    summarize(result)
}

pub async fn status(verbose: bool, config: &Config) -> serde_json::Value {
    let mut args = vec!["hive-mind", "status"];
    if verbose {
        args.push("--verbose");
    }
    let result = gateway::invoke(&args, None, None, config).await;
    summarize(result)
}

pub async fn consensus(topic: &str, options: &[String], config: &Config) -> serde_json::Value {
    let payload = json!({ "topic": topic, "options": options });
    let result = gateway::invoke(&["hive-mind", "consensus"], Some(&payload), None, config).await;
    summarize(result)
}

pub async fn broadcast(message: &str, config: &Config) -> serde_json::Value {
    let payload = json!({ "message": message });
    let result = gateway::invoke(&["hive-mind", "broadcast"], Some(&payload), None, config).await;
    summarize(result)
}

/// `shutdown` is always attempted regardless of gateway health (§4.8).
pub async fn shutdown(graceful: bool, config: &Config) -> serde_json::Value {
    let mut args = vec!["hive-mind", "shutdown"];
    if graceful {
        args.push("--graceful");
    }
    let result = gateway::invoke(&args, None, None, config).await;
    summarize(result)
}
