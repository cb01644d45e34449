//! Computes every file associated with a URL without touching anything.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::document::{Document, DocumentError, DocumentStore};
use crate::fs_util::url_slug;

use super::tokens::TokenSet;
use super::types::{CleanupError, CleanupPlan};

/// Finds the index entries, documents, raw captures, partial downloads and
/// sidecars belonging to a URL.
#[derive(Debug, Clone)]
pub struct CleanupPlanner {
    store: DocumentStore,
    output_dir: PathBuf,
    partial_suffixes: Vec<String>,
}

impl CleanupPlanner {
    pub fn new(
        store: DocumentStore,
        output_dir: impl Into<PathBuf>,
        partial_suffixes: Vec<String>,
    ) -> Self {
        Self {
            store,
            output_dir: output_dir.into(),
            partial_suffixes: partial_suffixes.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    pub fn plan(&self, url: &str, skip_partials: bool) -> Result<CleanupPlan, CleanupError> {
        let index_entries = self.store.index().records_for(url)?;

        let mut claimed = HashSet::new();
        let mut documents = Vec::new();
        let mut matched: Vec<Document> = Vec::new();
        let mut claim_document = |path: PathBuf, document: Option<Document>| {
            if claimed.insert(path.clone()) {
                documents.push(path);
                matched.extend(document);
            }
        };

        // Documents named by the index, then anything the index lost track of.
        for record in &index_entries {
            let path = self.store.path_for(&record.document_filename);
            match self.store.read(&path) {
                Ok(document) if document.url == url => claim_document(path, Some(document)),
                Ok(document) => debug!(
                    "Index record for {} points at {} which belongs to {}",
                    url,
                    path.display(),
                    document.url
                ),
                Err(DocumentError::NotFound(_)) => {}
                Err(DocumentError::Corrupt { .. }) => claim_document(path, None),
                Err(e) => return Err(e.into()),
            }
        }
        for scanned in self.store.scan_for_url(url)? {
            claim_document(scanned.path, scanned.document);
        }

        let mut tokens = TokenSet::new();
        tokens.extend(url_slug(url));
        for record in &index_entries {
            tokens.extend(record.id.iter().chain(&record.shortcode));
        }
        for document in &matched {
            tokens.extend(document.fields.identifying_values());
        }

        let raw_captures = self.raw_captures(&tokens, &mut claimed)?;

        let partials = if skip_partials {
            Vec::new()
        } else {
            let mut partial_tokens = tokens.clone();
            partial_tokens.extend(
                documents
                    .iter()
                    .filter_map(|p| p.file_stem())
                    .map(|s| s.to_string_lossy().into_owned()),
            );
            self.partials(&partial_tokens, &mut claimed)
        };

        let sidecars = self.sidecars(url, &mut claimed);

        let plan = CleanupPlan {
            url: url.to_string(),
            index_entries,
            documents,
            raw_captures,
            partials,
            sidecars,
            tokens: tokens.into_vec(),
        };
        info!(
            url = %url,
            index_entries = plan.index_entries.len(),
            documents = plan.documents.len(),
            raw_captures = plan.raw_captures.len(),
            partials = plan.partials.len(),
            sidecars = plan.sidecars.len(),
            "Cleanup plan computed"
        );
        Ok(plan)
    }

    /// Files directly in `raw/` whose name contains a token (case-sensitive).
    fn raw_captures(
        &self,
        tokens: &TokenSet,
        claimed: &mut HashSet<PathBuf>,
    ) -> Result<Vec<PathBuf>, CleanupError> {
        let raw_dir = self.store.raw_dir();
        let entries = match fs::read_dir(&raw_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CleanupError::Io {
                    path: raw_dir,
                    source: e,
                })
            }
        };

        let mut found: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| tokens.matches(&file_name(path)))
            .collect();
        found.sort();
        found.retain(|path| claimed.insert(path.clone()));
        Ok(found)
    }

    /// Files under the output root ending in a partial suffix whose name
    /// contains a token (case-insensitive).
    fn partials(&self, tokens: &TokenSet, claimed: &mut HashSet<PathBuf>) -> Vec<PathBuf> {
        if tokens.is_empty() {
            return Vec::new();
        }
        let mut found: Vec<PathBuf> = self
            .walk_output()
            .filter(|path| {
                let name = file_name(path).to_lowercase();
                self.partial_suffixes
                    .iter()
                    .any(|suffix| name.ends_with(suffix.as_str()))
                    && tokens.matches_ignore_case(&name)
            })
            .collect();
        found.sort();
        found.retain(|path| claimed.insert(path.clone()));
        found
    }

    /// `*.json` files under the output root whose top-level `url` is `url`.
    fn sidecars(&self, url: &str, claimed: &mut HashSet<PathBuf>) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = self
            .walk_output()
            .filter(|path| {
                path.extension()
                    .map(|e| e.eq_ignore_ascii_case("json"))
                    .unwrap_or(false)
            })
            .filter(|path| sidecar_url(path).as_deref() == Some(url))
            .collect();
        found.sort();
        found.retain(|path| claimed.insert(path.clone()));
        found
    }

    fn walk_output(&self) -> impl Iterator<Item = PathBuf> + '_ {
        WalkDir::new(&self.output_dir)
            .min_depth(1)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    // A missing output root is not worth a warning.
                    if e.io_error().map(|io| io.kind()) != Some(io::ErrorKind::NotFound) {
                        warn!(
                            "Skipping unreadable entry under {}: {}",
                            self.output_dir.display(),
                            e
                        );
                    }
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn sidecar_url(path: &Path) -> Option<String> {
    let contents = fs::read_to_string(path).ok()?;
    let value: Value = serde_json::from_str(&contents).ok()?;
    value.get("url")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use serde_json::json;
    use tempfile::TempDir;

    const URL: &str = "https://www.instagram.com/reel/C0ffee42/";

    fn planner(dir: &TempDir) -> CleanupPlanner {
        let store = DocumentStore::new(dir.path().join("metadata"));
        CleanupPlanner::new(
            store,
            dir.path().join("output"),
            vec![".part".to_string(), ".ytdl".to_string()],
        )
    }

    #[test]
    fn test_plan_for_unknown_url_is_empty() {
        let dir = TempDir::new().unwrap();
        let plan = planner(&dir).plan("https://x/nothing", false).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.tokens, vec!["nothing"]);
    }

    #[test]
    fn test_plan_collects_every_category() {
        let dir = TempDir::new().unwrap();
        let planner = planner(&dir);
        let meta = dir.path().join("metadata");
        let out = dir.path().join("output");

        fixtures::write_json(
            &meta,
            "xyz123.json",
            &json!({"url": URL, "id": "xyz123", "tasks": {"download": true}}),
        );
        planner
            .store
            .index()
            .append_raw(crate::index::IndexRecord::new(URL, "xyz123.json"))
            .unwrap();
        fixtures::touch(&meta.join("raw/xyz123.json"));
        fixtures::touch(&meta.join("raw/other.json"));
        fixtures::touch(&out.join("nested/XYZ123.mp4.part"));
        fixtures::touch(&out.join("C0ffee42.f1.mp4.ytdl"));
        fixtures::touch(&out.join("xyz123.mp4"));
        fixtures::write_json(&out.join("nested"), "info.json", &json!({"url": URL}));
        fixtures::write_json(&out, "unrelated.json", &json!({"url": "https://x/2"}));

        let plan = planner.plan(URL, false).unwrap();

        assert_eq!(plan.index_entries.len(), 1);
        assert_eq!(plan.documents, vec![meta.join("xyz123.json")]);
        assert_eq!(plan.raw_captures, vec![meta.join("raw/xyz123.json")]);
        assert_eq!(
            plan.partials,
            vec![
                out.join("C0ffee42.f1.mp4.ytdl"),
                out.join("nested/XYZ123.mp4.part"),
            ]
        );
        assert_eq!(plan.sidecars, vec![out.join("nested/info.json")]);

        let plan = planner.plan(URL, true).unwrap();
        assert!(plan.partials.is_empty());
    }

    #[test]
    fn test_unreadable_indexed_document_is_included() {
        let dir = TempDir::new().unwrap();
        let planner = planner(&dir);
        let meta = dir.path().join("metadata");
        fs::create_dir_all(&meta).unwrap();
        fs::write(meta.join("broken.json"), "{ not json").unwrap();
        planner
            .store
            .index()
            .append_raw(crate::index::IndexRecord::new(URL, "broken.json"))
            .unwrap();

        let plan = planner.plan(URL, false).unwrap();
        assert_eq!(plan.documents, vec![meta.join("broken.json")]);
    }

    #[test]
    fn test_document_for_other_url_is_kept() {
        let dir = TempDir::new().unwrap();
        let planner = planner(&dir);
        let meta = dir.path().join("metadata");
        fixtures::write_json(&meta, "shared.json", &json!({"url": "https://x/2", "tasks": {}}));
        planner
            .store
            .index()
            .append_raw(crate::index::IndexRecord::new(URL, "shared.json"))
            .unwrap();

        let plan = planner.plan(URL, false).unwrap();
        assert_eq!(plan.index_entries.len(), 1);
        assert!(plan.documents.is_empty());
    }
}
