//! Types for the pipeline orchestrator.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::capture::CaptureError;
use crate::document::{Document, DocumentError};
use crate::index::IndexError;

/// Errors that abort a pipeline run.
///
/// Task-local failures never show up here; they are reported per task.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("no url given")]
    EmptyUrl,

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    #[error("metadata capture failed: {0}")]
    Capture(#[from] CaptureError),

    /// The download task is still not completed after the download attempt.
    #[error("download incomplete for {url}: {reason}")]
    DownloadIncomplete { url: String, reason: String },

    /// Partial files were still present when the finalization wait ran out.
    /// Retrying the run resumes the wait.
    #[error("download for {url} still finalizing: {} not present yet", path.display())]
    DownloadPending {
        url: String,
        path: PathBuf,
        partials: Vec<PathBuf>,
    },

    /// Neither the recorded download nor any partial of it exists.
    #[error("download for {url} never materialized at {}", path.display())]
    DownloadMissing { url: String, path: PathBuf },

    #[error("another run holds the lock for {url} ({})", lock_path.display())]
    RunInProgress { url: String, lock_path: PathBuf },

    #[error("failed to manage run lock {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OrchestratorError {
    /// Whether a later invocation may succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DownloadIncomplete { .. }
                | Self::DownloadPending { .. }
                | Self::RunInProgress { .. }
                | Self::Lock { .. }
        )
    }
}

/// One pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub url: String,
    /// Evaluate and log eligibility without invoking workers or writing state.
    pub dry_run: bool,
}

impl RunRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// What happened to the download task during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadOutcome {
    /// Completed before this run; the worker was not invoked.
    AlreadyCompleted { output_path: String },
    /// Completed by this run.
    Downloaded { output_path: String },
    /// Dry run: the worker would have been invoked.
    WouldRun,
}

/// What happened to one non-download task during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Unconfigured,
    Skipped,
    AlreadyCompleted { output_path: String },
    Completed { output_path: String },
    /// Left pending; a later run retries it.
    Failed { error: String },
    /// Dry run: pending, the worker would have been invoked.
    WouldRun,
}

impl TaskOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            TaskOutcome::Unconfigured => "unconfigured",
            TaskOutcome::Skipped => "skipped",
            TaskOutcome::AlreadyCompleted { .. } => "already completed",
            TaskOutcome::Completed { .. } => "completed",
            TaskOutcome::Failed { .. } => "failed",
            TaskOutcome::WouldRun => "would run",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    pub task: String,
    pub outcome: TaskOutcome,
}

/// Summary of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub url: String,
    pub dry_run: bool,
    /// `None` only for dry runs of URLs never captured.
    pub document_path: Option<PathBuf>,
    pub document: Option<Document>,
    pub download: DownloadOutcome,
    /// Non-download tasks in registry order.
    pub tasks: Vec<TaskReport>,
}

impl PipelineReport {
    pub fn outcome(&self, task: &str) -> Option<&TaskOutcome> {
        self.tasks
            .iter()
            .find(|t| t.task == task)
            .map(|t| &t.outcome)
    }

    pub fn failed_tasks(&self) -> impl Iterator<Item = &TaskReport> {
        self.tasks
            .iter()
            .filter(|t| matches!(t.outcome, TaskOutcome::Failed { .. }))
    }
}
