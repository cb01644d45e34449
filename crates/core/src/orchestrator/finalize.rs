//! Waiting for a download worker's output to materialize.

use std::fs;
use std::path::{Path, PathBuf};

use tokio::time::{sleep, Instant};
use tracing::debug;

use super::config::DownloadConfig;

/// State of the recorded download artifact on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finalization {
    Ready,
    /// Final file absent but partial siblings present.
    Pending { partials: Vec<PathBuf> },
    /// Neither the final file nor any partial exists.
    Missing,
}

/// Files next to `path` that look like an in-progress download of it:
/// same stem prefix, ending in one of `suffixes` (case-insensitive).
pub fn partial_siblings(path: &Path, suffixes: &[String]) -> Vec<PathBuf> {
    let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
        return Vec::new();
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let suffixes: Vec<String> = suffixes.iter().map(|s| s.to_lowercase()).collect();

    let mut partials: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|candidate| candidate.as_path() != path)
        .filter(|candidate| {
            let Some(name) = candidate.file_name().map(|n| n.to_string_lossy()) else {
                return false;
            };
            let lower = name.to_lowercase();
            name.starts_with(&stem) && suffixes.iter().any(|s| lower.ends_with(s.as_str()))
        })
        .collect();
    partials.sort();
    partials
}

/// One existence check, no waiting.
pub fn check(path: &Path, suffixes: &[String]) -> Finalization {
    if path.exists() {
        return Finalization::Ready;
    }
    let partials = partial_siblings(path, suffixes);
    if partials.is_empty() {
        Finalization::Missing
    } else {
        Finalization::Pending { partials }
    }
}

/// Poll for `path` at a fixed interval until it exists or the timeout
/// elapses. The final check decides between `Pending` and `Missing`.
pub async fn wait_for_finalization(path: &Path, config: &DownloadConfig) -> Finalization {
    let deadline = Instant::now() + config.finalize_timeout();
    loop {
        let state = check(path, &config.partial_suffixes);
        if state == Finalization::Ready || Instant::now() >= deadline {
            return state;
        }
        debug!("Waiting for {} to finalize", path.display());
        let remaining = deadline.saturating_duration_since(Instant::now());
        sleep(config.poll_interval().min(remaining)).await;
    }
}
