//! Mock task worker for testing.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::worker::{TaskInput, TaskRequest, TaskWorker, WorkerError, WorkerOutput};

/// What the mock leaves on disk when it succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materialize {
    /// Report the path without touching the filesystem.
    Nothing,
    /// Write the output file before returning.
    Final,
    /// Write `<output>.part` now, swap it for the final file after the delay.
    Delayed(Duration),
    /// Write `<output>.part` and never finish.
    PartialOnly,
}

/// A recorded invocation for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request: TaskRequest,
    pub success: bool,
}

/// Mock implementation of the TaskWorker trait.
///
/// Provides controllable behavior for testing:
/// - Track invocations for assertions
/// - Fixed or derived output paths (`<stem>_<task>.<ext>` next to a path input)
/// - Optional raw metadata, as a download worker reports it
/// - Simulate one-off or permanent failures
/// - Materialize the output file, now, later, or only as a partial
///
/// Clones share state, so a clone handed to a registry can still be
/// inspected by the test.
///
/// # Example
///
/// ```rust,ignore
/// use teton_core::testing::{Materialize, MockWorker};
///
/// let download = MockWorker::new("download");
/// download.set_output("/out/1.mp4").await;
/// download.set_materialize(Materialize::Final).await;
///
/// let registry = registry.with_worker("download", download.shared());
/// // ... run the orchestrator ...
///
/// assert_eq!(download.invocation_count().await, 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockWorker {
    name: String,
    /// Recorded invocations.
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
    /// Fixed output path; derived from the input when unset.
    output: Arc<RwLock<Option<PathBuf>>>,
    /// Raw metadata attached to every successful report.
    metadata: Arc<RwLock<Option<Value>>>,
    /// If set, the next invocation will fail with this error.
    next_error: Arc<RwLock<Option<WorkerError>>>,
    /// If set, every invocation fails with this message.
    always_fail: Arc<RwLock<Option<String>>>,
    materialize: Arc<RwLock<Materialize>>,
}

impl MockWorker {
    /// Create a new mock worker that succeeds without touching the disk.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requests: Arc::new(RwLock::new(Vec::new())),
            output: Arc::new(RwLock::new(None)),
            metadata: Arc::new(RwLock::new(None)),
            next_error: Arc::new(RwLock::new(None)),
            always_fail: Arc::new(RwLock::new(None)),
            materialize: Arc::new(RwLock::new(Materialize::Nothing)),
        }
    }

    /// Shared handle for a task registry.
    pub fn shared(&self) -> Arc<dyn TaskWorker> {
        Arc::new(self.clone())
    }

    /// Get all recorded invocations.
    pub async fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    /// Get the number of invocations.
    pub async fn invocation_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Clear recorded invocations.
    pub async fn clear_recorded_requests(&self) {
        self.requests.write().await.clear();
    }

    /// Report this path on success.
    pub async fn set_output(&self, path: impl Into<PathBuf>) {
        *self.output.write().await = Some(path.into());
    }

    /// Attach raw extractor metadata to every successful report.
    pub async fn set_metadata(&self, metadata: Value) {
        *self.metadata.write().await = Some(metadata);
    }

    /// Configure the next invocation to fail with the given error.
    pub async fn set_next_error(&self, error: WorkerError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make every invocation fail with `message`, or succeed again with `None`.
    pub async fn set_always_fail(&self, message: Option<&str>) {
        *self.always_fail.write().await = message.map(str::to_string);
    }

    pub async fn set_materialize(&self, materialize: Materialize) {
        *self.materialize.write().await = materialize;
    }

    async fn take_error(&self) -> Option<WorkerError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Some(error);
        }
        self.always_fail
            .read()
            .await
            .as_ref()
            .map(|message| WorkerError::failed(Some(1), message.clone()))
    }

    async fn output_for(&self, request: &TaskRequest) -> Option<PathBuf> {
        if let Some(path) = self.output.read().await.clone() {
            return Some(path);
        }
        match &request.input {
            TaskInput::Path(path) => Some(derived_output(path, &request.task)),
            TaskInput::Url(_) => None,
        }
    }

    async fn record(&self, request: &TaskRequest, success: bool) {
        self.requests.write().await.push(RecordedRequest {
            request: request.clone(),
            success,
        });
    }
}

/// `<dir>/<stem>_<task>.<ext>`
fn derived_output(input: &Path, task: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match input.extension() {
        Some(ext) => format!("{}_{}.{}", stem, task, ext.to_string_lossy()),
        None => format!("{}_{}", stem, task),
    };
    input.with_file_name(name)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

async fn write_file(path: &Path) -> Result<(), WorkerError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, b"mock").await?;
    Ok(())
}

#[async_trait]
impl TaskWorker for MockWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, request: &TaskRequest) -> Result<WorkerOutput, WorkerError> {
        if let Some(err) = self.take_error().await {
            self.record(request, false).await;
            return Err(err);
        }

        let Some(output) = self.output_for(request).await else {
            self.record(request, false).await;
            return Err(WorkerError::NoOutput);
        };

        let materialize = self.materialize.read().await.clone();
        match materialize {
            Materialize::Nothing => {}
            Materialize::Final => write_file(&output).await?,
            Materialize::PartialOnly => write_file(&partial_path(&output)).await?,
            Materialize::Delayed(delay) => {
                let partial = partial_path(&output);
                write_file(&partial).await?;
                let output = output.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if write_file(&output).await.is_ok() {
                        let _ = tokio::fs::remove_file(&partial).await;
                    }
                });
            }
        }

        self.record(request, true).await;
        let mut report = WorkerOutput::new(output);
        if let Some(metadata) = self.metadata.read().await.clone() {
            report = report.with_metadata(metadata);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_derived_output_and_recording() {
        let worker = MockWorker::new("watermark");
        let request = TaskRequest::for_path("watermark", "https://x/1", "/out/1.mp4");

        let output = worker.run(&request).await.unwrap();
        assert_eq!(output.output_path, PathBuf::from("/out/1_watermark.mp4"));

        let recorded = worker.recorded_requests().await;
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0].success);
        assert_eq!(recorded[0].request, request);
    }

    #[tokio::test]
    async fn test_url_input_needs_fixed_output() {
        let worker = MockWorker::new("download");
        let request = TaskRequest::for_url("download", "https://x/1");
        assert!(matches!(
            worker.run(&request).await,
            Err(WorkerError::NoOutput)
        ));

        worker.set_output("/out/1.mp4").await;
        worker.set_metadata(serde_json::json!({"id": "1"})).await;
        let output = worker.run(&request).await.unwrap();
        assert_eq!(output.output_path, PathBuf::from("/out/1.mp4"));
        assert_eq!(output.metadata.unwrap()["id"], "1");
    }

    #[tokio::test]
    async fn test_failures() {
        let worker = MockWorker::new("watermark");
        let request = TaskRequest::for_path("watermark", "https://x/1", "/out/1.mp4");

        worker.set_next_error(WorkerError::NoOutput).await;
        assert!(worker.run(&request).await.is_err());
        assert!(worker.run(&request).await.is_ok());

        worker.set_always_fail(Some("boom")).await;
        assert!(worker.run(&request).await.is_err());
        assert!(worker.run(&request).await.is_err());
        assert_eq!(worker.invocation_count().await, 4);

        // Clones share state.
        let clone = worker.clone();
        clone.set_always_fail(None).await;
        assert!(worker.run(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_materialize_modes() {
        let dir = TempDir::new().unwrap();
        let worker = MockWorker::new("download");
        let output = dir.path().join("out/1.mp4");
        worker.set_output(&output).await;
        let request = TaskRequest::for_url("download", "https://x/1");

        worker.set_materialize(Materialize::PartialOnly).await;
        worker.run(&request).await.unwrap();
        assert!(dir.path().join("out/1.mp4.part").exists());
        assert!(!output.exists());

        worker
            .set_materialize(Materialize::Delayed(Duration::from_millis(50)))
            .await;
        worker.run(&request).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(output.exists());
        assert!(!dir.path().join("out/1.mp4.part").exists());
    }
}
