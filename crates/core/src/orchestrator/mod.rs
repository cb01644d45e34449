//! Pipeline orchestrator.
//!
//! Runs one URL through the task registry:
//! - **Download**: the only task invoked with the URL; its report is captured
//!   into a document on first success
//! - **Finalization**: bounded poll until the recorded artifact exists
//! - **Remaining tasks**: sequential in registry order, each given the
//!   artifact path; one task failing never blocks its siblings
//!
//! Runs for the same URL are serialized by a lock file.

mod config;
mod finalize;
mod lock;
mod runner;
mod types;

pub use config::DownloadConfig;
pub use finalize::{partial_siblings, wait_for_finalization, Finalization};
pub use lock::RunLock;
pub use runner::PipelineOrchestrator;
pub use types::{
    DownloadOutcome, OrchestratorError, PipelineReport, RunRequest, TaskOutcome, TaskReport,
};
