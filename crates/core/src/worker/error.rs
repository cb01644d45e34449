//! Error types for task workers.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while invoking an external task worker.
///
/// Every variant leaves the task pending; the next run retries it.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The task has no worker configured.
    #[error("no worker configured for task '{task}'")]
    NotConfigured { task: String },

    /// The worker program could not be started.
    #[error("failed to spawn {program}: {reason}")]
    SpawnFailed { program: PathBuf, reason: String },

    /// The worker program is not resolvable.
    #[error("worker program not found: {program}")]
    ProgramNotFound { program: PathBuf },

    /// The worker exited unsuccessfully.
    #[error("worker exited with {}: {stderr}", code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    Failed { code: Option<i32>, stderr: String },

    /// The worker succeeded but did not report an output path.
    #[error("worker reported no output path")]
    NoOutput,

    /// The worker did not finish in time and was killed.
    #[error("worker timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn failed(code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::Failed {
            code,
            stderr: stderr.into(),
        }
    }
}
