//! Trait definitions for task workers.

use async_trait::async_trait;

use super::error::WorkerError;
use super::types::{TaskRequest, WorkerOutput};

/// An external collaborator performing one task's real work.
#[async_trait]
pub trait TaskWorker: Send + Sync {
    /// Returns the name of this worker implementation.
    fn name(&self) -> &str;

    /// Runs the task to completion and reports the produced artifact.
    async fn run(&self, request: &TaskRequest) -> Result<WorkerOutput, WorkerError>;

    /// Checks the worker is able to run at all.
    async fn validate(&self) -> Result<(), WorkerError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::TaskInput;

    struct EchoWorker;

    #[async_trait]
    impl TaskWorker for EchoWorker {
        fn name(&self) -> &str {
            "echo"
        }

        async fn run(&self, request: &TaskRequest) -> Result<WorkerOutput, WorkerError> {
            match &request.input {
                TaskInput::Path(path) => Ok(WorkerOutput::new(path.with_extension("out"))),
                TaskInput::Url(_) => Err(WorkerError::NoOutput),
            }
        }
    }

    #[tokio::test]
    async fn test_worker_object_safety() {
        let worker: Box<dyn TaskWorker> = Box::new(EchoWorker);
        assert!(worker.validate().await.is_ok());

        let request = TaskRequest::for_path("watermark", "https://x/1", "/out/1.mp4");
        let output = worker.run(&request).await.unwrap();
        assert_eq!(output.output_path.to_str(), Some("/out/1.out"));

        let request = TaskRequest::for_url("download", "https://x/1");
        assert!(worker.run(&request).await.is_err());
    }
}
