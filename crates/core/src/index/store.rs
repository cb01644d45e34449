//! Line-delimited URL index.

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::document::{DocumentError, DocumentStore, LocatedDocument};
use crate::fs_util::write_atomic;

use super::record::{IndexLine, IndexRecord};

/// Errors from the URL index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize index record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The record resolved to a document that could not be read.
    #[error(transparent)]
    Document(Box<DocumentError>),
}

impl From<DocumentError> for IndexError {
    fn from(err: DocumentError) -> Self {
        IndexError::Document(Box::new(err))
    }
}

/// URL -> document pointers, one JSON record per line.
///
/// `append_raw` appends without deduplication; `upsert` compacts all records
/// of a URL down to one. Readers take the last matching record.
#[derive(Debug, Clone)]
pub struct UrlIndex {
    path: PathBuf,
}

impl UrlIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> IndexError {
        IndexError::Io {
            path: self.path.clone(),
            source,
        }
    }

    pub(crate) fn read_lines(&self) -> Result<Vec<IndexLine>, IndexError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_err(e)),
        };
        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(IndexLine::parse)
            .collect())
    }

    /// All readable records in file order. Malformed lines are skipped.
    pub fn records(&self) -> Result<Vec<IndexRecord>, IndexError> {
        let mut records = Vec::new();
        for line in self.read_lines()? {
            match line {
                IndexLine::Record(record) => records.push(record),
                IndexLine::Malformed(raw) => {
                    warn!(index = %self.path.display(), line = %raw, "Skipping malformed index line")
                }
            }
        }
        Ok(records)
    }

    /// Every record for `url`, in file order.
    pub fn records_for(&self, url: &str) -> Result<Vec<IndexRecord>, IndexError> {
        Ok(self
            .records()?
            .into_iter()
            .filter(|r| r.url == url)
            .collect())
    }

    /// The most recent record for `url`.
    pub fn last_for(&self, url: &str) -> Result<Option<IndexRecord>, IndexError> {
        Ok(self.records()?.into_iter().rev().find(|r| r.url == url))
    }

    /// Replace every record for the URL with `record`, rewriting the file
    /// atomically. Malformed lines are dropped by the compaction.
    pub fn upsert(&self, record: IndexRecord) -> Result<(), IndexError> {
        let mut records: Vec<IndexRecord> = self
            .records()?
            .into_iter()
            .filter(|r| r.url != record.url)
            .collect();
        debug!(url = %record.url, file = %record.document_filename, "Upserting index record");
        records.push(record);
        self.write_lines(records.into_iter().map(IndexLine::Record))
    }

    /// Append a record without deduplication.
    pub fn append_raw(&self, record: IndexRecord) -> Result<(), IndexError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let line = serde_json::to_string(&record)?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;

        // Never glue a record onto a line left without its terminator.
        let needs_newline = ends_without_newline(&mut file).map_err(|e| self.io_err(e))?;
        let mut buf = String::with_capacity(line.len() + 2);
        if needs_newline {
            buf.push('\n');
        }
        buf.push_str(&line);
        buf.push('\n');

        file.write_all(buf.as_bytes())
            .and_then(|_| file.sync_data())
            .map_err(|e| self.io_err(e))?;
        debug!(url = %record.url, file = %record.document_filename, "Appended index record");
        Ok(())
    }

    /// Remove every record for `url`, keeping other lines verbatim.
    /// Returns the removed records.
    pub fn remove_url(&self, url: &str) -> Result<Vec<IndexRecord>, IndexError> {
        let lines = self.read_lines()?;
        let (removed, kept): (Vec<_>, Vec<_>) = lines
            .into_iter()
            .partition(|line| matches!(line, IndexLine::Record(r) if r.url == url));

        if removed.is_empty() {
            return Ok(Vec::new());
        }
        self.write_lines(kept.into_iter())?;

        Ok(removed
            .into_iter()
            .filter_map(|line| match line {
                IndexLine::Record(record) => Some(record),
                IndexLine::Malformed(_) => None,
            })
            .collect())
    }

    /// Resolve `url` to its document through the last matching record.
    ///
    /// A record whose document file is gone, or which points at a document
    /// for another URL, resolves to `None`. A corrupt document is an error.
    pub fn lookup(
        &self,
        url: &str,
        store: &DocumentStore,
    ) -> Result<Option<LocatedDocument>, IndexError> {
        let Some(record) = self.last_for(url)? else {
            return Ok(None);
        };
        let path = store.path_for(&record.document_filename);

        match store.read(&path) {
            Ok(document) if document.url == url => Ok(Some(LocatedDocument { path, document })),
            Ok(document) => {
                warn!(
                    url = %url,
                    path = %path.display(),
                    document_url = %document.url,
                    "Index record points at a document for another url"
                );
                Ok(None)
            }
            Err(DocumentError::NotFound(_)) => {
                info!(url = %url, path = %path.display(), "Indexed document is missing");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write_lines(&self, lines: impl Iterator<Item = IndexLine>) -> Result<(), IndexError> {
        let mut contents = String::new();
        for line in lines {
            match line {
                IndexLine::Record(record) => contents.push_str(&serde_json::to_string(&record)?),
                IndexLine::Malformed(raw) => contents.push_str(&raw),
            }
            contents.push('\n');
        }
        write_atomic(&self.path, contents.as_bytes()).map_err(|e| self.io_err(e))
    }
}

fn ends_without_newline(file: &mut fs::File) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
