//! Per-URL run lock.
//!
//! The lock file is held with an OS advisory lock for the lifetime of the
//! guard. The OS drops it with the process, so a crashed run never blocks
//! the next one. The file itself stays on disk; only the advisory lock
//! decides who holds the URL.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::types::OrchestratorError;

/// Exclusive claim on one URL. Released when dropped.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    file: File,
}

impl RunLock {
    /// `<locks_dir>/<first 16 hex chars of sha256(url)>.lock`
    pub fn lock_path(locks_dir: &Path, url: &str) -> PathBuf {
        let hash = format!("{:x}", Sha256::digest(url.as_bytes()));
        locks_dir.join(format!("{}.lock", &hash[..16]))
    }

    /// Take the lock for `url` without waiting.
    pub fn acquire(locks_dir: &Path, url: &str) -> Result<Self, OrchestratorError> {
        let path = Self::lock_path(locks_dir, url);
        let lock_error = |source: io::Error| OrchestratorError::Lock {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(locks_dir).map_err(lock_error)?;
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(lock_error)?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.kind() == fs2::lock_contended_error().kind() {
                return Err(OrchestratorError::RunInProgress {
                    url: url.to_string(),
                    lock_path: path,
                });
            }
            return Err(lock_error(e));
        }

        // Holder details, for whoever finds the file while a run is active.
        let contents = serde_json::json!({
            "url": url,
            "pid": std::process::id(),
            "acquired_at": Utc::now().to_rfc3339(),
        });
        if let Err(e) = file.set_len(0).and_then(|_| writeln!(file, "{}", contents)) {
            warn!("Failed to record holder in {}: {}", path.display(), e);
        }

        debug!("Acquired run lock {}", path.display());
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to release run lock {}: {}", self.path.display(), e);
        }
    }
}
