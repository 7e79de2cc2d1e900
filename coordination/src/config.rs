//! Tunable constants for the coordination core, with environment overrides.
//!
//! Follows the `SlurmConfig::from_env` pattern used elsewhere in this
//! workspace: parse-or-default, warn on an unparsable override, never panic.

use std::time::Duration;

/// Window after which a session with no checkpoint activity is considered
/// interrupted rather than merely idle.
pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Maximum number of trajectory index entries retained per project (FIFO).
pub const TRAJECTORY_INDEX_CAP: usize = 100;

/// Rework/error/quality-drop detector thresholds.
pub const HIGH_REWORK_EDIT_THRESHOLD: u32 = 3;
pub const HIGH_ERROR_RATE_THRESHOLD: f64 = 0.25;
pub const QUALITY_DROP_DELTA: f64 = 0.15;

/// Confidence bands used when deciding whether to inject a mined lesson.
pub const CONFIDENCE_HIGH: f64 = 0.8;
pub const CONFIDENCE_MEDIUM: f64 = 0.5;

/// At most this many lessons are ever injected into a single prompt.
pub const MAX_INJECTED_LESSONS: usize = 3;

/// Wall-clock budget for the learning-inject hook's own work, independent of
/// the host's overall per-hook ceiling.
pub const LEARNING_INJECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default timeout for a single orchestrator gateway subprocess call.
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(8);

/// Hard ceiling every hook binary must stay under, matching the host's
/// own enforcement; used as a backstop in case the host is lenient.
pub const HOOK_HARD_CEILING: Duration = Duration::from_secs(30);

fn env_duration_secs(var: &str, default: Duration) -> Duration {
    match std::env::var(var) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(e) => {
                tracing::warn!(var, raw, error = %e, "unparseable duration override, using default");
                default
            }
        },
        Err(_) => default,
    }
}

fn env_f64(var: &str, default: f64) -> f64 {
    match std::env::var(var) {
        Ok(raw) => match raw.parse::<f64>() {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(var, raw, error = %e, "unparseable float override, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Runtime configuration resolved once per hook invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub grace_window: Duration,
    pub trajectory_index_cap: usize,
    pub high_rework_edit_threshold: u32,
    pub high_error_rate_threshold: f64,
    pub quality_drop_delta: f64,
    pub confidence_high: f64,
    pub confidence_medium: f64,
    pub max_injected_lessons: usize,
    pub gateway_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grace_window: DEFAULT_GRACE_WINDOW,
            trajectory_index_cap: TRAJECTORY_INDEX_CAP,
            high_rework_edit_threshold: HIGH_REWORK_EDIT_THRESHOLD,
            high_error_rate_threshold: HIGH_ERROR_RATE_THRESHOLD,
            quality_drop_delta: QUALITY_DROP_DELTA,
            confidence_high: CONFIDENCE_HIGH,
            confidence_medium: CONFIDENCE_MEDIUM,
            max_injected_lessons: MAX_INJECTED_LESSONS,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }
}

impl Config {
    /// Resolve configuration from environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            grace_window: env_duration_secs("HOOKS_GRACE_WINDOW_SECS", defaults.grace_window),
            high_error_rate_threshold: env_f64(
                "HOOKS_HIGH_ERROR_RATE",
                defaults.high_error_rate_threshold,
            ),
            quality_drop_delta: env_f64("HOOKS_QUALITY_DROP_DELTA", defaults.quality_drop_delta),
            gateway_timeout: env_duration_secs(
                "HOOKS_GATEWAY_TIMEOUT_SECS",
                defaults.gateway_timeout,
            ),
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.max_injected_lessons, 3);
        assert_eq!(cfg.trajectory_index_cap, 100);
    }
}
