//! Testing utilities and mock implementations.
//!
//! This module provides a mock task worker and fixtures for driving the
//! orchestrator and cleanup end-to-end without real worker programs.
//!
//! # Example
//!
//! ```rust,ignore
//! use teton_core::testing::{fixtures, MockWorker};
//!
//! let config = fixtures::config(temp_dir.path());
//! let download = MockWorker::new("download");
//! let registry = fixtures::registry(&["download", "watermark"])
//!     .with_worker("download", download.shared());
//!
//! // Use with PipelineOrchestrator::new(&config, registry, journal)...
//! ```

mod mock_worker;

pub use mock_worker::{Materialize, MockWorker, RecordedRequest};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use serde_json::{json, Value};

    use crate::config::{Config, JournalConfig, StorageConfig};
    use crate::orchestrator::DownloadConfig;
    use crate::task::{InputKind, TaskDescriptor, TaskRegistry};

    /// Registry of enabled tasks without workers. The first task takes the URL.
    pub fn registry(names: &[&str]) -> TaskRegistry {
        let tasks = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let input = if i == 0 {
                    InputKind::Url
                } else {
                    InputKind::Path
                };
                TaskDescriptor::new(*name, input, true)
            })
            .collect();
        TaskRegistry::new(tasks).expect("fixture registry is valid")
    }

    /// Configuration rooted at `root` (`metadata/`, `output/`) with a
    /// one second finalization wait and no journal.
    pub fn config(root: &Path) -> Config {
        Config {
            storage: StorageConfig {
                metadata_dir: root.join("metadata"),
                output_dir: root.join("output"),
                ..Default::default()
            },
            download: DownloadConfig {
                finalize_timeout_secs: 1,
                finalize_poll_interval_ms: 50,
                ..Default::default()
            },
            journal: JournalConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Raw extractor metadata as a download worker would report it.
    pub fn raw_metadata(id: &str, title: &str) -> Value {
        json!({
            "id": id,
            "title": title,
            "upload_date": "20240131",
            "uploader": "mock_uploader",
            "duration": 12.5,
            "width": 1080,
            "height": 1920,
            "ext": "mp4",
            "formats": [{"format_id": "hd"}],
            "http_headers": {"User-Agent": "mock"}
        })
    }

    /// Write `value` as a JSON file at `dir/name`, creating `dir`.
    pub fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
        std::fs::create_dir_all(dir).expect("create fixture dir");
        let path = dir.join(name);
        let contents = serde_json::to_string_pretty(value).expect("serialize fixture");
        std::fs::write(&path, contents).expect("write fixture");
        path
    }

    /// Write an empty file, creating parent directories.
    pub fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture dir");
        }
        std::fs::write(path, b"").expect("write fixture");
    }
}
