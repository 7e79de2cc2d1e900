//! Shared error taxonomy for the hook coordination core.
//!
//! Every public operation in this crate returns [`HookResult`]. The five
//! variants match the error kinds a hook binary is allowed to surface
//! (see the ABI contract in `hookio`): only `Conflict` and a safety-check
//! `External` ever reach the agent as a `decision`; everything else is
//! logged and swallowed so the host always gets a valid JSON response.

use std::path::PathBuf;
use thiserror::Error;

pub type HookResult<T> = Result<T, HookError>;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("external failure: {0}")]
    External(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl HookError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HookError::Io {
            path: path.into(),
            source,
        }
    }

    /// Machine-readable kind, as named in the store/gateway error taxonomy.
    pub fn kind(&self) -> &'static str {
        match self {
            HookError::InvalidInput(_) => "invalid_input",
            HookError::Io { .. } => "io",
            HookError::Conflict(_) => "conflict",
            HookError::External(_) => "external",
            HookError::Timeout(_) => "timeout",
        }
    }
}

impl From<serde_json::Error> for HookError {
    fn from(e: serde_json::Error) -> Self {
        HookError::InvalidInput(e.to_string())
    }
}
