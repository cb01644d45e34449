//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How long to wait for the download worker's output to materialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Upper bound on the finalization wait (seconds).
    #[serde(default = "default_finalize_timeout")]
    pub finalize_timeout_secs: u64,

    /// Fixed sleep between existence checks (milliseconds).
    #[serde(default = "default_finalize_poll_interval")]
    pub finalize_poll_interval_ms: u64,

    /// Suffixes that mark an in-progress download next to the final file.
    /// Also used by cleanup to find abandoned partials.
    #[serde(default = "default_partial_suffixes")]
    pub partial_suffixes: Vec<String>,
}

fn default_finalize_timeout() -> u64 {
    90
}

fn default_finalize_poll_interval() -> u64 {
    3000 // 3 seconds
}

fn default_partial_suffixes() -> Vec<String> {
    vec![".part".to_string(), ".ytdl".to_string(), ".tmp".to_string()]
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            finalize_timeout_secs: default_finalize_timeout(),
            finalize_poll_interval_ms: default_finalize_poll_interval(),
            partial_suffixes: default_partial_suffixes(),
        }
    }
}

impl DownloadConfig {
    pub fn finalize_timeout(&self) -> Duration {
        Duration::from_secs(self.finalize_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.finalize_poll_interval_ms)
    }
}
