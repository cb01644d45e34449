use std::path::PathBuf;

use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use super::{JournalEnvelope, JournalHandle};

/// Background task appending journal events to a JSONL file
pub struct JournalWriter {
    rx: mpsc::Receiver<JournalEnvelope>,
    path: PathBuf,
}

impl JournalWriter {
    /// Create a new journal writer
    pub fn new(rx: mpsc::Receiver<JournalEnvelope>, path: impl Into<PathBuf>) -> Self {
        Self {
            rx,
            path: path.into(),
        }
    }

    /// Run the writer, consuming events until every handle is dropped
    ///
    /// The file and its directory are created on the first event, so a run
    /// that emits nothing leaves the filesystem untouched. This should be
    /// spawned as a background task.
    pub async fn run(mut self) {
        tracing::debug!(path = %self.path.display(), "Journal writer started");

        let mut file = None;
        let mut open_failed = false;

        while let Some(envelope) = self.rx.recv().await {
            if file.is_none() && !open_failed {
                file = self.open().await;
                open_failed = file.is_none();
            }
            let Some(file) = file.as_mut() else {
                continue;
            };
            let mut line = match serde_json::to_string(&envelope) {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!("Failed to serialize journal event: {}", e);
                    continue;
                }
            };
            line.push('\n');
            if let Err(e) = file.write_all(line.as_bytes()).await {
                tracing::error!("Failed to write journal event: {}", e);
            }
        }

        if let Some(mut file) = file {
            if let Err(e) = file.flush().await {
                tracing::error!("Failed to flush journal: {}", e);
            }
        }
        tracing::debug!("Journal writer shutting down");
    }

    async fn open(&self) -> Option<File> {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                tracing::error!("Failed to create journal directory: {}", e);
            }
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
        {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    "Failed to open journal, events will be dropped: {}",
                    e
                );
                None
            }
        }
    }
}

/// Create a journal
///
/// Returns:
/// - `JournalHandle` - for emitting events (clone this to share across components)
/// - `JournalWriter` - spawn this as a background task with `tokio::spawn(writer.run())`
pub fn create_journal(
    path: impl Into<PathBuf>,
    buffer_size: usize,
) -> (JournalHandle, JournalWriter) {
    let (tx, rx) = mpsc::channel(buffer_size.max(1));
    (JournalHandle::new(tx), JournalWriter::new(rx, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::JournalEvent;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_writer_appends_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/journal.jsonl");
        let (handle, writer) = create_journal(&path, 8);
        let task = tokio::spawn(writer.run());

        handle
            .emit(JournalEvent::RunStarted {
                url: "https://x/1".to_string(),
                dry_run: true,
            })
            .await;
        handle
            .emit(JournalEvent::TaskSkipped {
                url: "https://x/1".to_string(),
                task: "watermark".to_string(),
                reason: "skipped".to_string(),
            })
            .await;
        drop(handle);
        task.await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<JournalEnvelope> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].event.event_type(), "run_started");
        assert_eq!(lines[1].event.event_type(), "task_skipped");
    }

    #[tokio::test]
    async fn test_idle_writer_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata/journal.jsonl");
        let (handle, writer) = create_journal(&path, 8);
        let task = tokio::spawn(writer.run());

        drop(handle);
        task.await.unwrap();

        assert!(!dir.path().join("metadata").exists());
    }

    #[tokio::test]
    async fn test_writer_appends_across_runs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.jsonl");

        for _ in 0..2 {
            let (handle, writer) = create_journal(&path, 8);
            let task = tokio::spawn(writer.run());
            handle
                .emit(JournalEvent::RunStarted {
                    url: "https://x/1".to_string(),
                    dry_run: false,
                })
                .await;
            drop(handle);
            task.await.unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
