//! Document store: one JSON file per artifact inside the metadata directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fs_util::write_atomic;
use crate::index::{IndexError, IndexRecord, UrlIndex};
use crate::task::{TaskMap, TaskRegistry, UpdateOutcome};

use super::{ArtifactFields, Document};

/// Errors from the document store.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Expected absence; callers fall back to create or skip.
    #[error("document not found: {0}")]
    NotFound(PathBuf),

    /// Content does not parse as a document. The file is left untouched.
    #[error("corrupt document {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// The file already holds a document for another URL.
    #[error("document {path} belongs to {existing}, not {requested}")]
    UrlMismatch {
        path: PathBuf,
        existing: String,
        requested: String,
    },

    #[error("document I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("index update failed: {0}")]
    Index(#[from] IndexError),
}

/// A document together with the file it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedDocument {
    pub path: PathBuf,
    pub document: Document,
}

/// A file found by scanning the metadata directory for a URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedDocument {
    pub path: PathBuf,
    /// `None` when the file names the URL but does not fit the schema.
    pub document: Option<Document>,
}

/// Reads and writes documents; keeps the URL index in step with writes.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
    index: UrlIndex,
}

impl DocumentStore {
    /// Store rooted at `metadata_dir`, with its index at `index.jsonl`.
    pub fn new(metadata_dir: impl Into<PathBuf>) -> Self {
        let dir = metadata_dir.into();
        let index = UrlIndex::new(dir.join("index.jsonl"));
        Self { dir, index }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index(&self) -> &UrlIndex {
        &self.index
    }

    /// Where unfiltered extractor captures are kept.
    pub fn raw_dir(&self) -> PathBuf {
        self.dir.join("raw")
    }

    /// Path of a document file named by an index record. Only the final
    /// component is used.
    pub fn path_for(&self, document_filename: &str) -> PathBuf {
        match Path::new(document_filename).file_name() {
            Some(name) => self.dir.join(name),
            None => self.dir.join(document_filename),
        }
    }

    pub fn read(&self, path: &Path) -> Result<Document, DocumentError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(DocumentError::NotFound(path.to_path_buf()))
            }
            Err(e) => {
                return Err(DocumentError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        serde_json::from_str(&contents).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Corrupt document left untouched");
            DocumentError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })
    }

    /// Atomically replace the document file. Does not touch the index.
    pub fn write(&self, path: &Path, document: &Document) -> Result<(), DocumentError> {
        let mut bytes = serde_json::to_vec_pretty(document)?;
        bytes.push(b'\n');
        write_atomic(path, &bytes).map_err(|e| DocumentError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Resolve a URL through the index.
    pub fn lookup(&self, url: &str) -> Result<Option<LocatedDocument>, IndexError> {
        self.index.lookup(url, self)
    }

    /// Build the document at `path` from allow-listed `fields` and the
    /// registry defaults, then upsert the index.
    ///
    /// Every task entry of a prior version of the same document is kept, so
    /// completed tasks stay completed. A prior version for another URL is
    /// refused; an unreadable prior version is replaced.
    pub fn create_or_overwrite(
        &self,
        path: &Path,
        url: &str,
        fields: ArtifactFields,
        registry: &TaskRegistry,
    ) -> Result<Document, DocumentError> {
        let prior = match self.read(path) {
            Ok(document) => Some(document),
            Err(DocumentError::NotFound(_)) => None,
            Err(DocumentError::Corrupt { reason, .. }) => {
                warn!(
                    path = %path.display(),
                    reason = %reason,
                    "Overwriting unreadable document"
                );
                None
            }
            Err(e) => return Err(e),
        };

        let mut document = match prior {
            Some(prior) if prior.url != url => {
                return Err(DocumentError::UrlMismatch {
                    path: path.to_path_buf(),
                    existing: prior.url,
                    requested: url.to_string(),
                })
            }
            Some(prior) => {
                let mut document = Document::new(url, fields, prior.tasks);
                document.task_failures = prior.task_failures;
                document
            }
            None => Document::new(url, fields, TaskMap::new()),
        };
        for task in registry.iter() {
            document.tasks.seed(&task.name, task.enabled);
        }

        self.write(path, &document)?;
        self.index.upsert(self.index_record(path, &document))?;
        info!(url = %url, path = %path.display(), "Document written");
        Ok(document)
    }

    /// Transition `task` to `Completed(output_path)` in the document at `path`.
    ///
    /// Anything but a pending task is a logged no-op; the returned outcome
    /// says which. Applied transitions are persisted and upserted.
    pub fn update_task(
        &self,
        path: &Path,
        task: &str,
        output_path: &str,
    ) -> Result<(Document, UpdateOutcome), DocumentError> {
        let mut document = self.read(path)?;
        let outcome = document.complete_task(task, output_path);

        if !outcome.is_applied() {
            info!(
                url = %document.url,
                task = %task,
                path = %path.display(),
                outcome = %outcome,
                "Task update ignored"
            );
            return Ok((document, outcome));
        }

        self.write(path, &document)?;
        self.index.upsert(self.index_record(path, &document))?;
        debug!(url = %document.url, task = %task, output = %output_path, "Task completed");
        Ok((document, outcome))
    }

    /// Count a failed attempt of a pending task.
    pub fn record_failure(
        &self,
        path: &Path,
        task: &str,
        error: &str,
    ) -> Result<Document, DocumentError> {
        let mut document = self.read(path)?;
        if document.record_failure(task, error, Utc::now()) {
            self.write(path, &document)?;
        }
        Ok(document)
    }

    /// Index record pointing at the document stored at `path`.
    pub fn index_record(&self, path: &Path, document: &Document) -> IndexRecord {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        IndexRecord::new(&document.url, filename)
            .with_ids(document.fields.id.clone(), document.fields.shortcode.clone())
    }

    /// Every `*.json` file directly in the metadata directory whose `url`
    /// field equals `url`, independent of the index.
    pub fn scan_for_url(&self, url: &str) -> Result<Vec<ScannedDocument>, DocumentError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(DocumentError::Io {
                    path: self.dir.clone(),
                    source: e,
                })
            }
        };

        let mut found = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(contents) = fs::read_to_string(&path) else {
                continue;
            };
            let Ok(value) = serde_json::from_str::<Value>(&contents) else {
                continue;
            };
            if value.get("url").and_then(Value::as_str) != Some(url) {
                continue;
            }
            let document = serde_json::from_value(value).ok();
            found.push(ScannedDocument { path, document });
        }
        found.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(found)
    }
}
