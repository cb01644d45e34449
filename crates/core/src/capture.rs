//! First metadata capture of an artifact.
//!
//! Turns a successful download report into a document: masks the raw
//! extractor metadata, picks a document file name, optionally keeps the raw
//! capture and records the index pointer. The download task itself is
//! completed by the orchestrator once the artifact has materialized.

use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::RawCaptureMode;
use crate::document::{ArtifactFields, Document, DocumentError, DocumentStore};
use crate::fs_util::{sanitize_component, unique_path, url_slug, write_atomic};
use crate::index::{IndexError, IndexRecord};
use crate::journal::{JournalEvent, JournalHandle};
use crate::task::TaskRegistry;
use crate::worker::WorkerOutput;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Result of recording a download report.
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub path: PathBuf,
    pub document: Document,
    /// True when a new document file was created.
    pub created: bool,
    pub raw_capture_path: Option<PathBuf>,
}

/// Records download reports into the document store.
#[derive(Debug, Clone)]
pub struct MetadataCapture {
    store: DocumentStore,
    raw_mode: RawCaptureMode,
    journal: JournalHandle,
}

impl MetadataCapture {
    pub fn new(store: DocumentStore, raw_mode: RawCaptureMode, journal: JournalHandle) -> Self {
        Self {
            store,
            raw_mode,
            journal,
        }
    }

    /// Record `output` as the download result for `url`.
    ///
    /// An already indexed document is overwritten in place. Otherwise a new
    /// file is named, the record is appended raw, and the document created.
    pub async fn capture(
        &self,
        url: &str,
        output: &WorkerOutput,
        registry: &TaskRegistry,
    ) -> Result<CaptureOutcome, CaptureError> {
        let output_path = output.output_path.to_string_lossy().into_owned();
        let existing = self.store.lookup(url)?;

        let mut fields = match (&output.metadata, &existing) {
            (Some(raw), _) => ArtifactFields::from_raw(raw),
            // A bare path report keeps what was captured before.
            (None, Some(located)) => located.document.fields.clone(),
            (None, None) => ArtifactFields::default(),
        };
        if fields.file_path.is_none() {
            fields.file_path = Some(output_path);
        }

        let (path, created, raw_capture_path) = match existing {
            Some(located) => (located.path, false, None),
            None => {
                let path = self.new_document_path(url, &fields);
                let raw_capture_path = match &output.metadata {
                    Some(raw) => self.write_raw_capture(&path, raw),
                    None => None,
                };
                let filename = file_name(&path);
                self.store.index().append_raw(
                    IndexRecord::new(url, filename)
                        .with_ids(fields.id.clone(), fields.shortcode.clone()),
                )?;
                (path, true, raw_capture_path)
            }
        };

        let document = self.store.create_or_overwrite(&path, url, fields, registry)?;

        info!(
            url = %url,
            path = %path.display(),
            created = created,
            "Captured download metadata"
        );
        if created {
            self.journal
                .emit(JournalEvent::DocumentCaptured {
                    url: url.to_string(),
                    document_path: path.display().to_string(),
                    raw_capture_path: raw_capture_path.as_ref().map(|p| p.display().to_string()),
                })
                .await;
        }

        Ok(CaptureOutcome {
            path,
            document,
            created,
            raw_capture_path,
        })
    }

    /// `<id | shortcode | url slug | unix time>.json`, made unique.
    fn new_document_path(&self, url: &str, fields: &ArtifactFields) -> PathBuf {
        let stem = fields
            .id
            .as_deref()
            .and_then(sanitize_component)
            .or_else(|| fields.shortcode.as_deref().and_then(sanitize_component))
            .or_else(|| url_slug(url).as_deref().and_then(sanitize_component))
            .unwrap_or_else(|| Utc::now().timestamp().to_string());
        unique_path(self.store.dir(), &stem, "json")
    }

    /// Keep the unfiltered metadata next to the document. Failures are logged.
    fn write_raw_capture(
        &self,
        document_path: &Path,
        raw: &serde_json::Value,
    ) -> Option<PathBuf> {
        if self.raw_mode == RawCaptureMode::Off {
            return None;
        }
        let stem = document_path.file_stem()?.to_string_lossy().into_owned();
        let path = self.store.raw_dir().join(format!("{}.json", stem));

        let result = serde_json::to_vec_pretty(raw)
            .map_err(|e| e.to_string())
            .and_then(|bytes| write_atomic(&path, &bytes).map_err(|e| e.to_string()));
        match result {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to write raw capture");
                None
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
