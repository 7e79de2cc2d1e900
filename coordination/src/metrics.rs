//! Best-effort TSDB emitter (§6.4): translates store contents to
//! line-protocol records. Never on the blocking path — callers invoke
//! this after the hook's stdout JSON has already been written.

use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

pub struct LineRecord {
    pub table: &'static str,
    pub tags: Vec<(String, String)>,
    pub fields: Vec<(String, Value)>,
}

fn escape(s: &str) -> String {
    s.replace(' ', "\\ ").replace(',', "\\,").replace('=', "\\=")
}

fn field_literal(v: &Value) -> String {
    match v {
        Value::Number(n) if n.is_i64() || n.is_u64() => format!("{n}i"),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => format!("\"{}\"", s.replace('"', "\\\"")),
        other => format!("\"{other}\""),
    }
}

impl LineRecord {
    pub fn to_line(&self, ts_ns: u128) -> String {
        let tags: String = self
            .tags
            .iter()
            .map(|(k, v)| format!(",{}={}", escape(k), escape(v)))
            .collect();
        let fields: String = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", escape(k), field_literal(v)))
            .collect::<Vec<_>>()
            .join(",");
        format!("{}{} {} {}", self.table, tags, fields, ts_ns)
    }
}

fn now_ns() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}

pub fn trajectory_record(project: &str, success_rate: f64, steps: usize) -> LineRecord {
    LineRecord {
        table: "claude_trajectories",
        tags: vec![("project".into(), project.into())],
        fields: vec![
            ("success_rate".into(), serde_json::json!(success_rate)),
            ("steps".into(), serde_json::json!(steps as u64)),
        ],
    }
}

pub fn claim_record(project: &str, active: usize, stealable: usize) -> LineRecord {
    LineRecord {
        table: "claude_strategy_metrics",
        tags: vec![("project".into(), project.into())],
        fields: vec![
            ("active_claims".into(), serde_json::json!(active as u64)),
            (
                "stealable_claims".into(),
                serde_json::json!(stealable as u64),
            ),
        ],
    }
}

pub fn swarm_record(table: &'static str, project: &str, fields: Vec<(String, Value)>) -> LineRecord {
    LineRecord {
        table,
        tags: vec![("project".into(), project.into())],
        fields,
    }
}

/// Emit records to the local append-only file, or POST them if
/// `METRICS_HTTP_ENDPOINT` is set. Always best-effort: failures are
/// logged and swallowed, never propagated. Synchronous (using
/// `reqwest::blocking` for the optional HTTP path) so it can be called
/// from the synchronous hook binaries that never start a Tokio runtime,
/// per §5's "never on the blocking path" — this call itself is the very
/// last thing a hook does, after its stdout response is already written.
pub fn emit(records: &[LineRecord], scratch: &crate::store::ScratchDir) {
    let lines: Vec<String> = records.iter().map(|r| r.to_line(now_ns())).collect();
    if lines.is_empty() {
        return;
    }

    if let Ok(endpoint) = std::env::var("METRICS_HTTP_ENDPOINT") {
        let body = lines.join("\n");
        let client = match reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(2))
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(error = %e, "metrics http client build failed");
                return;
            }
        };
        if let Err(e) = client.post(endpoint).body(body).send() {
            tracing::debug!(error = %e, "metrics http emission failed");
        }
        return;
    }

    let path = scratch.metrics_log();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    use std::io::Write;
    match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
        Ok(mut file) => {
            for line in lines {
                let _ = writeln!(file, "{line}");
            }
        }
        Err(e) => tracing::debug!(error = %e, "metrics file emission failed"),
    }
}
