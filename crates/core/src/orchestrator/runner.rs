//! Pipeline orchestrator implementation.
//!
//! Drives one URL through the task registry:
//! - Download: invoked with the URL unless already completed, then captured
//! - Finalization: bounded poll for the recorded artifact
//! - Remaining tasks: sequential, in registry order, each with the artifact path

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::capture::MetadataCapture;
use crate::config::Config;
use crate::document::{Document, DocumentStore, LocatedDocument};
use crate::journal::{JournalEvent, JournalHandle};
use crate::task::{TaskDescriptor, TaskMap, TaskRegistry, TaskState, UpdateOutcome};
use crate::worker::TaskRequest;

use super::config::DownloadConfig;
use super::finalize::{self, Finalization};
use super::lock::RunLock;
use super::types::{
    DownloadOutcome, OrchestratorError, PipelineReport, RunRequest, TaskOutcome, TaskReport,
};

/// Resolves what to run next for a URL and dispatches task workers.
pub struct PipelineOrchestrator {
    store: DocumentStore,
    registry: TaskRegistry,
    capture: MetadataCapture,
    download: DownloadConfig,
    locks_dir: PathBuf,
    journal: JournalHandle,
}

impl PipelineOrchestrator {
    pub fn new(config: &Config, registry: TaskRegistry, journal: JournalHandle) -> Self {
        let store = DocumentStore::new(&config.storage.metadata_dir);
        let capture = MetadataCapture::new(
            store.clone(),
            config.storage.raw_capture,
            journal.clone(),
        );
        Self {
            store,
            registry,
            capture,
            download: config.download.clone(),
            locks_dir: config.locks_dir(),
            journal,
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Run the pipeline for one URL.
    ///
    /// Aborts only when the download cannot be resolved; failures of later
    /// tasks are recorded in the report and leave those tasks pending.
    pub async fn run(&self, request: &RunRequest) -> Result<PipelineReport, OrchestratorError> {
        let url = request.url.trim();
        if url.is_empty() {
            return Err(OrchestratorError::EmptyUrl);
        }
        let dry_run = request.dry_run;

        let _lock = if dry_run {
            None
        } else {
            Some(RunLock::acquire(&self.locks_dir, url)?)
        };
        // Dry runs leave no trace, journal included.
        let journal = if dry_run {
            JournalHandle::disabled()
        } else {
            self.journal.clone()
        };

        info!(url = %url, dry_run = dry_run, "Starting pipeline run");
        journal
            .emit(JournalEvent::RunStarted {
                url: url.to_string(),
                dry_run,
            })
            .await;

        let download_task = self.registry.download();
        let existing = self.store.lookup(url)?;
        let recorded = existing
            .as_ref()
            .and_then(|located| located.document.download_path(&download_task.name))
            .map(str::to_string);

        let (located, output_path, downloaded) = match (existing, recorded) {
            (Some(located), Some(output_path)) => {
                info!(
                    "Task {} already completed for {}: {}",
                    download_task.name, url, output_path
                );
                (located, output_path, false)
            }
            (existing, _) if dry_run => {
                info!("[dry run] Would invoke {} for {}", download_task.name, url);
                return Ok(self.dry_run_without_download(url, existing));
            }
            (existing, _) => {
                let (located, output_path) = self
                    .run_download(url, download_task, existing, &journal)
                    .await?;
                (located, output_path, true)
            }
        };

        let artifact = PathBuf::from(&output_path);
        let download = if downloaded {
            DownloadOutcome::Downloaded { output_path }
        } else {
            // The recorded artifact may have been moved or is still being
            // finalized by an earlier worker.
            self.await_artifact(url, &artifact, dry_run, &journal).await?;
            DownloadOutcome::AlreadyCompleted { output_path }
        };

        let LocatedDocument { path, mut document } = located;
        let mut tasks = Vec::new();
        for task in self.registry.remaining() {
            let outcome = match document.task(&task.name) {
                TaskState::Pending if !dry_run => {
                    let (updated, outcome) = self
                        .run_task(url, task, &path, &artifact, &journal)
                        .await?;
                    if let Some(updated) = updated {
                        document = updated;
                    }
                    outcome
                }
                state => self.settled_outcome(url, task, state, dry_run, &journal).await,
            };
            tasks.push(TaskReport {
                task: task.name.clone(),
                outcome,
            });
        }

        let failed = tasks
            .iter()
            .filter(|t| matches!(t.outcome, TaskOutcome::Failed { .. }))
            .count();
        info!(
            url = %url,
            path = %path.display(),
            failed = failed,
            "Pipeline run finished"
        );

        Ok(PipelineReport {
            url: url.to_string(),
            dry_run,
            document_path: Some(path),
            document: Some(document),
            download,
            tasks,
        })
    }

    /// Invoke the download worker, capture its report, wait for the artifact
    /// and only then complete the download task. Re-resolves the document
    /// afterwards.
    async fn run_download(
        &self,
        url: &str,
        download_task: &TaskDescriptor,
        existing: Option<LocatedDocument>,
        journal: &JournalHandle,
    ) -> Result<(LocatedDocument, String), OrchestratorError> {
        info!("Invoking {} for {}", download_task.name, url);
        journal
            .emit(JournalEvent::DownloadRequested {
                url: url.to_string(),
                task: download_task.name.clone(),
            })
            .await;

        let request = TaskRequest::for_url(&download_task.name, url);
        let failure = match download_task.invoke(&request).await {
            Ok(output) => {
                let captured = self.capture.capture(url, &output, &self.registry).await?;
                self.await_artifact(url, &output.output_path, false, journal)
                    .await?;

                let output_path = output.output_path.to_string_lossy().into_owned();
                let (_, outcome) =
                    self.store
                        .update_task(&captured.path, &download_task.name, &output_path)?;
                if outcome.is_applied() {
                    info!(
                        "Task {} completed for {}: {}",
                        download_task.name, url, output_path
                    );
                    journal
                        .emit(JournalEvent::TaskCompleted {
                            url: url.to_string(),
                            task: download_task.name.clone(),
                            output_path,
                        })
                        .await;
                    None
                } else {
                    Some(format!("download result not recorded: {}", outcome))
                }
            }
            Err(e) => {
                error!("Task {} failed for {}: {}", download_task.name, url, e);
                let attempts = existing.as_ref().and_then(|located| {
                    self.note_failure(&located.path, &download_task.name, &e.to_string())
                });
                journal
                    .emit(JournalEvent::TaskFailed {
                        url: url.to_string(),
                        task: download_task.name.clone(),
                        error: e.to_string(),
                        attempts,
                    })
                    .await;
                Some(e.to_string())
            }
        };

        let located = self.store.lookup(url)?;
        let output_path = located
            .as_ref()
            .and_then(|l| l.document.download_path(&download_task.name))
            .map(str::to_string);

        match (located, output_path) {
            (Some(located), Some(output_path)) => Ok((located, output_path)),
            (located, _) => {
                let reason = match (failure, located) {
                    (Some(error), _) => error,
                    (None, None) => "no document after download".to_string(),
                    (None, Some(located)) => format!(
                        "{} is {}",
                        download_task.name,
                        located.document.task(&download_task.name)
                    ),
                };
                error!("Download incomplete for {}: {}", url, reason);
                Err(OrchestratorError::DownloadIncomplete {
                    url: url.to_string(),
                    reason,
                })
            }
        }
    }

    /// Make sure the recorded artifact exists before later tasks consume it.
    /// Dry runs check once without waiting.
    async fn await_artifact(
        &self,
        url: &str,
        artifact: &Path,
        dry_run: bool,
        journal: &JournalHandle,
    ) -> Result<(), OrchestratorError> {
        let state = if dry_run {
            finalize::check(artifact, &self.download.partial_suffixes)
        } else {
            finalize::wait_for_finalization(artifact, &self.download).await
        };

        match state {
            Finalization::Ready => Ok(()),
            Finalization::Pending { partials } => {
                warn!(
                    "Download for {} still finalizing after {}s: {} partial file(s) next to {}",
                    url,
                    self.download.finalize_timeout_secs,
                    partials.len(),
                    artifact.display()
                );
                journal
                    .emit(JournalEvent::DownloadPending {
                        url: url.to_string(),
                        expected_path: artifact.display().to_string(),
                        partials: partials.iter().map(|p| p.display().to_string()).collect(),
                    })
                    .await;
                Err(OrchestratorError::DownloadPending {
                    url: url.to_string(),
                    path: artifact.to_path_buf(),
                    partials,
                })
            }
            Finalization::Missing => {
                error!(
                    "Download for {} never materialized at {}",
                    url,
                    artifact.display()
                );
                Err(OrchestratorError::DownloadMissing {
                    url: url.to_string(),
                    path: artifact.to_path_buf(),
                })
            }
        }
    }

    /// Invoke a pending task's worker and record the result.
    ///
    /// Returns the updated document when one was written.
    async fn run_task(
        &self,
        url: &str,
        task: &TaskDescriptor,
        document_path: &Path,
        artifact: &Path,
        journal: &JournalHandle,
    ) -> Result<(Option<Document>, TaskOutcome), OrchestratorError> {
        info!("Invoking {} for {}", task.name, url);
        let request = TaskRequest::for_path(&task.name, url, artifact);

        let error = match task.invoke(&request).await {
            Ok(output) => {
                let output_path = output.output_path.to_string_lossy().into_owned();
                let (document, outcome) =
                    self.store
                        .update_task(document_path, &task.name, &output_path)?;
                match outcome {
                    UpdateOutcome::Applied => {
                        info!("Task {} completed for {}: {}", task.name, url, output_path);
                        journal
                            .emit(JournalEvent::TaskCompleted {
                                url: url.to_string(),
                                task: task.name.clone(),
                                output_path: output_path.clone(),
                            })
                            .await;
                        return Ok((Some(document), TaskOutcome::Completed { output_path }));
                    }
                    UpdateOutcome::AlreadyCompleted(existing) => {
                        return Ok((
                            Some(document),
                            TaskOutcome::AlreadyCompleted {
                                output_path: existing,
                            },
                        ));
                    }
                    other => format!("worker output not recorded: {}", other),
                }
            }
            Err(e) => e.to_string(),
        };

        error!("Task {} failed for {}: {}", task.name, url, error);
        let attempts = self.note_failure(document_path, &task.name, &error);
        journal
            .emit(JournalEvent::TaskFailed {
                url: url.to_string(),
                task: task.name.clone(),
                error: error.clone(),
                attempts,
            })
            .await;
        Ok((None, TaskOutcome::Failed { error }))
    }

    /// Outcome of a task that will not be invoked in this run.
    async fn settled_outcome(
        &self,
        url: &str,
        task: &TaskDescriptor,
        state: TaskState,
        dry_run: bool,
        journal: &JournalHandle,
    ) -> TaskOutcome {
        match state {
            TaskState::Unconfigured | TaskState::Skipped => {
                info!("Task {} is {} for {}, skipping", task.name, state, url);
                journal
                    .emit(JournalEvent::TaskSkipped {
                        url: url.to_string(),
                        task: task.name.clone(),
                        reason: state.to_string(),
                    })
                    .await;
                if state == TaskState::Skipped {
                    TaskOutcome::Skipped
                } else {
                    TaskOutcome::Unconfigured
                }
            }
            TaskState::Completed(output_path) => {
                info!(
                    "Task {} already completed for {}: {}",
                    task.name, url, output_path
                );
                TaskOutcome::AlreadyCompleted { output_path }
            }
            TaskState::Pending => {
                if dry_run {
                    info!("[dry run] Would invoke {} for {}", task.name, url);
                }
                TaskOutcome::WouldRun
            }
        }
    }

    /// Dry run for a URL whose download has not completed: every other task
    /// is evaluated against the current document, or the registry defaults
    /// when none exists yet.
    fn dry_run_without_download(
        &self,
        url: &str,
        existing: Option<LocatedDocument>,
    ) -> PipelineReport {
        let (document_path, document) = match existing {
            Some(located) => (Some(located.path), Some(located.document)),
            None => (None, None),
        };
        let states: TaskMap = match &document {
            Some(document) => document.tasks.clone(),
            None => self.registry.defaults(),
        };

        let tasks = self
            .registry
            .remaining()
            .map(|task| {
                let outcome = match states.get(&task.name) {
                    TaskState::Unconfigured => TaskOutcome::Unconfigured,
                    TaskState::Skipped => TaskOutcome::Skipped,
                    TaskState::Completed(output_path) => {
                        TaskOutcome::AlreadyCompleted { output_path }
                    }
                    TaskState::Pending => TaskOutcome::WouldRun,
                };
                info!("[dry run] Task {} for {}: {}", task.name, url, outcome.label());
                TaskReport {
                    task: task.name.clone(),
                    outcome,
                }
            })
            .collect();

        PipelineReport {
            url: url.to_string(),
            dry_run: true,
            document_path,
            document,
            download: DownloadOutcome::WouldRun,
            tasks,
        }
    }

    /// Count a failed attempt; bookkeeping failures are only logged.
    fn note_failure(&self, document_path: &Path, task: &str, error: &str) -> Option<u32> {
        match self.store.record_failure(document_path, task, error) {
            Ok(document) => document.task_failures.get(task).map(|f| f.attempts),
            Err(e) => {
                warn!(
                    "Failed to record failure of {} in {}: {}",
                    task,
                    document_path.display(),
                    e
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("metadata_dir", &self.store.dir())
            .field("tasks", &self.registry.len())
            .finish()
    }
}
