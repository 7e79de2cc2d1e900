//! Stdin/stdout JSON contract shared by every hook binary.
//!
//! A hook reads one JSON object from stdin, does its work, and writes
//! exactly one JSON object to stdout before exiting 0 — regardless of
//! whether the work succeeded. Failures are logged to stderr via
//! `tracing` and degrade to an empty `{}` response ("fail open"); a hook
//! must never cause the host to treat the agent's turn as broken.

use serde_json::Value;
use std::io::Read;
use std::time::Instant;

/// Read the event payload the host piped to stdin, capped to 1 MiB so a
/// misbehaving host can't make a hook hang reading an unbounded stream.
pub fn read_event() -> crate::error::HookResult<Value> {
    let mut raw = String::new();
    std::io::stdin()
        .take(1_048_576)
        .read_to_string(&mut raw)
        .map_err(|e| crate::error::HookError::io("<stdin>", e))?;
    serde_json::from_str(&raw).map_err(crate::error::HookError::from)
}

/// Write the single response object the host expects on stdout.
pub fn write_response(value: &Value) {
    use std::io::Write;
    match serde_json::to_string(value) {
        Ok(s) => {
            if writeln!(std::io::stdout(), "{s}").is_err() {
                // Nothing left to do: stdout is gone, the host will see no
                // output and treat this hook as a no-op, which is safe.
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize hook response");
            let _ = writeln!(std::io::stdout(), "{{}}");
        }
    }
}

/// Run `body`, logging and swallowing any error so the process always
/// exits 0 with a valid (possibly empty) JSON response. This is the one
/// place the "fail open" invariant is implemented.
pub fn run_hook<F>(hook_name: &'static str, body: F)
where
    F: FnOnce() -> crate::error::HookResult<Value>,
{
    let _timer = HookTimer::start(hook_name);
    match body() {
        Ok(value) => write_response(&value),
        Err(e) => {
            tracing::warn!(hook = hook_name, kind = e.kind(), error = %e, "hook degraded to no-op");
            write_response(&serde_json::json!({}));
        }
    }
}

/// Logs how long a hook took on drop, at `warn` if it's approaching the
/// host's hard ceiling.
pub struct HookTimer {
    hook_name: &'static str,
    start: Instant,
}

const HOOK_SLOW_THRESHOLD_MS: u128 = 3_000;

impl HookTimer {
    pub fn start(hook_name: &'static str) -> Self {
        Self {
            hook_name,
            start: Instant::now(),
        }
    }
}

impl Drop for HookTimer {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed().as_millis();
        if elapsed > HOOK_SLOW_THRESHOLD_MS {
            tracing::warn!(hook = self.hook_name, elapsed_ms = elapsed, "hook ran slow");
        } else {
            tracing::debug!(hook = self.hook_name, elapsed_ms = elapsed, "hook completed");
        }
    }
}

/// Initialize the stderr-only tracing subscriber every hook binary shares.
/// stdout is reserved for the response object.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_response_serializes_value() {
        // Smoke test only: write_response prints to the real stdout, so we
        // just confirm it doesn't panic on a representative payload.
        write_response(&serde_json::json!({"decision": "allow"}));
    }
}
