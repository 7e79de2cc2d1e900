//! Well-known on-disk locations (§6.2), resolved relative to a base
//! directory so tests can sandbox the whole store under a `tempdir`.

use std::path::PathBuf;

/// Root of the persistent store: `~/.<orchestrator>/` in production, an
/// arbitrary directory in tests.
#[derive(Debug, Clone)]
pub struct StoreRoot {
    base: PathBuf,
}

impl StoreRoot {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    /// `~/.claude-hooks` unless overridden by `HOOKS_STORE_DIR`.
    pub fn from_env() -> Self {
        if let Ok(dir) = std::env::var("HOOKS_STORE_DIR") {
            return Self::new(PathBuf::from(dir));
        }
        let home = dirs_home();
        Self::new(home.join(".claude-hooks"))
    }

    pub fn memory_store(&self) -> PathBuf {
        self.base.join("memory").join("store.json")
    }

    pub fn claims_store(&self) -> PathBuf {
        self.base.join("claims").join("claims.json")
    }

    pub fn checkpoints_dir(&self) -> PathBuf {
        self.base.join("checkpoints")
    }
}

/// Scratch (per-session, not shared across sessions) directory, `<tmp>/claude-metrics`.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    base: PathBuf,
}

impl ScratchDir {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn from_env() -> Self {
        if let Ok(dir) = std::env::var("HOOKS_SCRATCH_DIR") {
            return Self::new(PathBuf::from(dir));
        }
        Self::new(std::env::temp_dir().join("claude-metrics"))
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.base
    }

    pub fn active_trajectory(&self) -> PathBuf {
        self.base.join("active_trajectory.json")
    }

    pub fn active_file_claims(&self) -> PathBuf {
        self.base.join("active_file_claims.json")
    }

    pub fn session_state(&self) -> PathBuf {
        self.base.join("session_state.json")
    }

    pub fn session_analysis(&self) -> PathBuf {
        self.base.join("session_analysis.json")
    }

    pub fn metrics_log(&self) -> PathBuf {
        self.base.join("metrics.lp")
    }

    pub fn log_file(&self, name: &str) -> PathBuf {
        self.base.join(format!("{name}.log"))
    }
}

fn dirs_home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}
