//! Request and result types exchanged with task workers.

use std::ffi::OsString;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

/// The single positional input handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskInput {
    Url(String),
    Path(PathBuf),
}

impl TaskInput {
    pub fn to_arg(&self) -> OsString {
        match self {
            TaskInput::Url(url) => OsString::from(url),
            TaskInput::Path(path) => path.clone().into_os_string(),
        }
    }
}

/// Immutable request for one task invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    pub task: String,
    /// Source URL of the artifact, for logging and bookkeeping.
    pub url: String,
    pub input: TaskInput,
}

impl TaskRequest {
    pub fn for_url(task: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            task: task.into(),
            input: TaskInput::Url(url.clone()),
            url,
        }
    }

    pub fn for_path(
        task: impl Into<String>,
        url: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            task: task.into(),
            url: url.into(),
            input: TaskInput::Path(path.into()),
        }
    }
}

/// What a successful worker reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerOutput {
    pub output_path: PathBuf,
    /// Raw extractor metadata. Only download workers report it.
    pub metadata: Option<Value>,
}

impl WorkerOutput {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Parse a worker's stdout.
    ///
    /// The last non-empty line is either a JSON object
    /// `{"output_path": ..., "metadata": ...}` or the output path itself.
    pub fn from_stdout(stdout: &str) -> Option<Self> {
        let line = stdout.lines().map(str::trim).rfind(|l| !l.is_empty())?;

        if line.starts_with('{') {
            #[derive(Deserialize)]
            struct Report {
                output_path: Option<String>,
                #[serde(default)]
                metadata: Option<Value>,
            }

            let report = serde_json::from_str::<Report>(line).ok()?;
            let path = report.output_path.filter(|p| !p.trim().is_empty())?;
            return Some(Self {
                output_path: PathBuf::from(path),
                metadata: report.metadata.filter(|m| m.is_object()),
            });
        }

        Some(Self::new(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_path_report() {
        let output = WorkerOutput::from_stdout("[info] merging\n/out/1.mp4\n\n").unwrap();
        assert_eq!(output.output_path, PathBuf::from("/out/1.mp4"));
        assert!(output.metadata.is_none());
    }

    #[test]
    fn test_json_report() {
        let stdout = r#"progress 100%
{"output_path": "/out/1.mp4", "metadata": {"id": "abc", "title": "A clip"}}"#;
        let output = WorkerOutput::from_stdout(stdout).unwrap();
        assert_eq!(output.output_path, PathBuf::from("/out/1.mp4"));
        assert_eq!(output.metadata, Some(json!({"id": "abc", "title": "A clip"})));
    }

    #[test]
    fn test_json_report_without_path() {
        assert!(WorkerOutput::from_stdout(r#"{"metadata": {}}"#).is_none());
    }

    #[test]
    fn test_malformed_json_report() {
        assert!(WorkerOutput::from_stdout("{not json").is_none());
    }

    #[test]
    fn test_empty_stdout() {
        assert!(WorkerOutput::from_stdout("").is_none());
        assert!(WorkerOutput::from_stdout("\n  \n").is_none());
    }

    #[test]
    fn test_request_inputs() {
        let request = TaskRequest::for_url("download", "https://x/1");
        assert_eq!(request.input.to_arg(), OsString::from("https://x/1"));

        let request = TaskRequest::for_path("watermark", "https://x/1", "/out/1.mp4");
        assert_eq!(request.input, TaskInput::Path(PathBuf::from("/out/1.mp4")));
    }
}
