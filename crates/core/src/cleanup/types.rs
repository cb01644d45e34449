//! Types for cleanup.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::document::DocumentError;
use crate::index::{IndexError, IndexRecord};

/// Failures that prevent computing the cleanup plan.
///
/// Per-file deletion failures are collected into the report instead.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("no url given")]
    EmptyUrl,

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    #[error("failed to scan {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One cleanup invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupRequest {
    pub url: String,
    /// Compute and report candidates without touching the filesystem.
    pub dry_run: bool,
    /// Leave partial downloads under the output root alone.
    pub skip_partials: bool,
}

impl CleanupRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            dry_run: false,
            skip_partials: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn skip_partials(mut self, skip: bool) -> Self {
        self.skip_partials = skip;
        self
    }
}

/// Everything associated with a URL, by category. A path appears in at most
/// one category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupPlan {
    pub url: String,
    pub index_entries: Vec<IndexRecord>,
    pub documents: Vec<PathBuf>,
    pub raw_captures: Vec<PathBuf>,
    pub partials: Vec<PathBuf>,
    pub sidecars: Vec<PathBuf>,
    /// Tokens the raw capture and partial matches were made with.
    pub tokens: Vec<String>,
}

impl CleanupPlan {
    /// Every file path in the plan, in deletion order.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.documents
            .iter()
            .chain(&self.raw_captures)
            .chain(&self.partials)
            .chain(&self.sidecars)
            .map(PathBuf::as_path)
    }

    pub fn is_empty(&self) -> bool {
        self.index_entries.is_empty() && self.files().next().is_none()
    }
}

/// A file that could not be removed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanupFailure {
    pub path: PathBuf,
    pub error: String,
}

/// What a cleanup removed, or would remove for a dry run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupReport {
    pub url: String,
    pub dry_run: bool,
    pub index_entries: Vec<IndexRecord>,
    pub documents: Vec<PathBuf>,
    pub raw_captures: Vec<PathBuf>,
    pub partials: Vec<PathBuf>,
    pub sidecars: Vec<PathBuf>,
    pub errors: Vec<CleanupFailure>,
}

impl CleanupReport {
    /// Report of a dry run: the plan itself.
    pub fn from_plan(plan: CleanupPlan) -> Self {
        Self {
            url: plan.url,
            dry_run: true,
            index_entries: plan.index_entries,
            documents: plan.documents,
            raw_captures: plan.raw_captures,
            partials: plan.partials,
            sidecars: plan.sidecars,
            errors: Vec::new(),
        }
    }

    /// Every removed file path.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.documents
            .iter()
            .chain(&self.raw_captures)
            .chain(&self.partials)
            .chain(&self.sidecars)
            .map(PathBuf::as_path)
    }

    /// `(label, count)` per category, in display order.
    pub fn counts(&self) -> [(&'static str, usize); 5] {
        [
            ("index entries", self.index_entries.len()),
            ("documents", self.documents.len()),
            ("raw captures", self.raw_captures.len()),
            ("partial downloads", self.partials.len()),
            ("sidecars", self.sidecars.len()),
        ]
    }

    pub fn total(&self) -> usize {
        self.counts().iter().map(|(_, n)| n).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_files_and_counts() {
        let plan = CleanupPlan {
            url: "https://x/1".to_string(),
            index_entries: vec![IndexRecord::new("https://x/1", "1.json")],
            documents: vec![PathBuf::from("/m/1.json")],
            raw_captures: vec![PathBuf::from("/m/raw/1.json")],
            partials: vec![],
            sidecars: vec![PathBuf::from("/o/1.info.json")],
            tokens: vec!["abc".to_string()],
        };
        assert!(!plan.is_empty());
        assert_eq!(plan.files().count(), 3);

        let report = CleanupReport::from_plan(plan);
        assert!(report.dry_run);
        assert_eq!(report.total(), 4);
        assert_eq!(report.counts()[3], ("partial downloads", 0));
    }

    #[test]
    fn test_empty_plan() {
        assert!(CleanupPlan::default().is_empty());
    }
}
