use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::orchestrator::DownloadConfig;
use crate::task::InputKind;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub journal: JournalConfig,
    /// Task registry, in pipeline order.
    #[serde(default = "default_tasks")]
    pub tasks: Vec<TaskConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            download: DownloadConfig::default(),
            journal: JournalConfig::default(),
            tasks: default_tasks(),
        }
    }
}

impl Config {
    /// Directory holding per-URL run lock files.
    pub fn locks_dir(&self) -> PathBuf {
        self.storage.metadata_dir.join("locks")
    }

    /// Resolved journal file path.
    pub fn journal_path(&self) -> PathBuf {
        self.journal
            .path
            .clone()
            .unwrap_or_else(|| self.storage.metadata_dir.join("journal.jsonl"))
    }
}

/// Where documents, the index and downloaded artifacts live.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Documents, `index.jsonl`, `raw/` and `locks/`.
    #[serde(default = "default_metadata_dir")]
    pub metadata_dir: PathBuf,
    /// Root the download worker writes into. Scanned by cleanup.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Whether the unfiltered extractor metadata is kept under `raw/`.
    #[serde(default)]
    pub raw_capture: RawCaptureMode,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            metadata_dir: default_metadata_dir(),
            output_dir: default_output_dir(),
            raw_capture: RawCaptureMode::default(),
        }
    }
}

fn default_metadata_dir() -> PathBuf {
    PathBuf::from("./metadata")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RawCaptureMode {
    /// Pretty-printed JSON under `<metadata_dir>/raw/<identifier>.json`.
    #[default]
    Json,
    Off,
}

/// Event journal configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JournalConfig {
    #[serde(default = "default_journal_enabled")]
    pub enabled: bool,
    /// Defaults to `<metadata_dir>/journal.jsonl`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Channel capacity between emitters and the writer task.
    #[serde(default = "default_journal_buffer")]
    pub buffer_size: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: default_journal_enabled(),
            path: None,
            buffer_size: default_journal_buffer(),
        }
    }
}

fn default_journal_enabled() -> bool {
    true
}

fn default_journal_buffer() -> usize {
    256
}

/// One entry of the task registry.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TaskConfig {
    pub name: String,
    #[serde(default = "default_input")]
    pub input: InputKind,
    /// Seeded into new documents as `true` (pending) or `false` (skipped).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Program implementing the task. Tasks without one cannot run.
    #[serde(default)]
    pub command: Option<String>,
    /// Arguments placed before the task input.
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default = "default_task_timeout")]
    pub timeout_secs: u64,
}

impl TaskConfig {
    /// A task with no worker command and default settings.
    pub fn new(name: impl Into<String>, input: InputKind) -> Self {
        Self {
            name: name.into(),
            input,
            enabled: default_enabled(),
            command: None,
            args: Vec::new(),
            working_dir: None,
            timeout_secs: default_task_timeout(),
        }
    }

    /// Sets the worker command and its leading arguments.
    pub fn with_command(mut self, command: impl Into<String>, args: Vec<String>) -> Self {
        self.command = Some(command.into());
        self.args = args;
        self
    }

    /// Sets whether the task is seeded as pending.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

fn default_input() -> InputKind {
    InputKind::Path
}

fn default_enabled() -> bool {
    true
}

fn default_task_timeout() -> u64 {
    3600 // 1 hour
}

fn default_tasks() -> Vec<TaskConfig> {
    vec![
        TaskConfig::new("download", InputKind::Url),
        TaskConfig::new("watermark", InputKind::Path),
        TaskConfig::new("make_clips", InputKind::Path),
        TaskConfig::new("extract_audio", InputKind::Path),
        TaskConfig::new("generate_captions", InputKind::Path),
        TaskConfig::new("post_process", InputKind::Path),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.storage.output_dir, PathBuf::from("./output"));
        assert_eq!(config.storage.raw_capture, RawCaptureMode::Json);
        assert!(config.journal.enabled);
        assert_eq!(config.download.finalize_timeout_secs, 90);
        let names: Vec<_> = config.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "download",
                "watermark",
                "make_clips",
                "extract_audio",
                "generate_captions",
                "post_process"
            ]
        );
        assert_eq!(config.tasks[0].input, InputKind::Url);
    }

    #[test]
    fn test_deserialize_task_defaults() {
        let toml = r#"
[[tasks]]
name = "download"
input = "url"

[[tasks]]
name = "watermark"
command = "python3"
args = ["bin/call_watermark.py"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let watermark = &config.tasks[1];
        assert_eq!(watermark.input, InputKind::Path);
        assert!(watermark.enabled);
        assert_eq!(watermark.timeout_secs, 3600);
        assert_eq!(watermark.args, vec!["bin/call_watermark.py".to_string()]);
    }

    #[test]
    fn test_raw_capture_off() {
        let toml = r#"
[storage]
raw_capture = "off"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.storage.raw_capture, RawCaptureMode::Off);
    }

    #[test]
    fn test_derived_paths() {
        let toml = r#"
[storage]
metadata_dir = "/srv/meta"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.locks_dir(), PathBuf::from("/srv/meta/locks"));
        assert_eq!(
            config.journal_path(),
            PathBuf::from("/srv/meta/journal.jsonl")
        );
    }

    #[test]
    fn test_explicit_journal_path() {
        let toml = r#"
[journal]
path = "/var/log/teton.jsonl"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.journal_path(), PathBuf::from("/var/log/teton.jsonl"));
    }
}
