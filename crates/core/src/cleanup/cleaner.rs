//! Executes a cleanup plan.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::document::DocumentStore;
use crate::journal::{JournalEvent, JournalHandle};

use super::planner::CleanupPlanner;
use super::types::{CleanupError, CleanupFailure, CleanupReport, CleanupRequest};

/// Removes everything associated with a URL.
///
/// Every category is best-effort: a missing file is not an error and a
/// failed deletion never stops the others.
#[derive(Debug, Clone)]
pub struct Cleaner {
    store: DocumentStore,
    planner: CleanupPlanner,
    journal: JournalHandle,
}

impl Cleaner {
    pub fn new(config: &Config, journal: JournalHandle) -> Self {
        let store = DocumentStore::new(&config.storage.metadata_dir);
        let planner = CleanupPlanner::new(
            store.clone(),
            &config.storage.output_dir,
            config.download.partial_suffixes.clone(),
        );
        Self {
            store,
            planner,
            journal,
        }
    }

    pub async fn cleanup(&self, request: &CleanupRequest) -> Result<CleanupReport, CleanupError> {
        let url = request.url.trim();
        if url.is_empty() {
            return Err(CleanupError::EmptyUrl);
        }

        let plan = self.planner.plan(url, request.skip_partials)?;

        if request.dry_run {
            for record in &plan.index_entries {
                info!("[dry run] Would remove index entry {}", record.document_filename);
            }
            for path in plan.files() {
                info!("[dry run] Would remove {}", path.display());
            }
            return Ok(CleanupReport::from_plan(plan));
        }

        let mut report = CleanupReport {
            url: url.to_string(),
            dry_run: false,
            ..Default::default()
        };

        match self.store.index().remove_url(url) {
            Ok(removed) => report.index_entries = removed,
            Err(e) => {
                warn!("Failed to remove index entries for {}: {}", url, e);
                report.errors.push(CleanupFailure {
                    path: self.store.index().path().to_path_buf(),
                    error: e.to_string(),
                });
            }
        }

        report.documents = remove_all(&plan.documents, &mut report.errors).await;
        report.raw_captures = remove_all(&plan.raw_captures, &mut report.errors).await;
        report.partials = remove_all(&plan.partials, &mut report.errors).await;
        report.sidecars = remove_all(&plan.sidecars, &mut report.errors).await;

        info!(
            url = %url,
            removed = report.total(),
            errors = report.errors.len(),
            "Cleanup finished"
        );
        self.journal
            .emit(JournalEvent::CleanupFinished {
                url: url.to_string(),
                dry_run: false,
                index_entries: report.index_entries.len(),
                documents: report.documents.len(),
                raw_captures: report.raw_captures.len(),
                partials: report.partials.len(),
                sidecars: report.sidecars.len(),
                errors: report.errors.len(),
            })
            .await;

        Ok(report)
    }
}

/// Remove each path, returning the ones actually removed.
async fn remove_all(paths: &[PathBuf], errors: &mut Vec<CleanupFailure>) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    for path in paths {
        match remove(path).await {
            Ok(true) => removed.push(path.clone()),
            Ok(false) => debug!("Already gone: {}", path.display()),
            Err(e) => {
                warn!("Failed to remove {}: {}", path.display(), e);
                errors.push(CleanupFailure {
                    path: path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    removed
}

async fn remove(path: &Path) -> io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            info!("Removed {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
