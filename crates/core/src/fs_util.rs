//! Filesystem helpers shared by the stores.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use regex_lite::Regex;
use url::Url;

/// Replace `path` with `contents` all-or-nothing.
///
/// Writes a sibling temp file, syncs it and renames it over the target, so a
/// reader sees either the old or the new contents.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "teton".to_string());
    let tmp = parent.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// First free `<stem>.<ext>`, `<stem>_1.<ext>`, `<stem>_2.<ext>`... in `dir`.
pub fn unique_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let candidate = dir.join(format!("{}.{}", stem, ext));
    if !candidate.exists() {
        return candidate;
    }
    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{}_{}.{}", stem, n, ext));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Make a string safe as a single file name component.
///
/// Runs of anything outside `[A-Za-z0-9._-]` become `_`. Returns `None` when
/// nothing usable is left.
pub fn sanitize_component(value: &str) -> Option<String> {
    let cleaned = match Regex::new(r"[^A-Za-z0-9._-]+").ok() {
        Some(re) => re.replace_all(value.trim(), "_").into_owned(),
        None => value.trim().to_string(),
    };
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Last non-empty path segment of a URL, ignoring query and fragment.
pub fn url_slug(url: &str) -> Option<String> {
    match Url::parse(url.trim()) {
        Ok(parsed) => parsed
            .path_segments()?
            .rev()
            .find(|segment| !segment.is_empty())
            .map(str::to_string),
        // Not absolute, e.g. `reel/C0ffee42/`: treat the whole input as a path.
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or(url)
            .split('/')
            .rfind(|segment| !segment.trim().is_empty())
            .map(|segment| segment.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/doc.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        // No temp files left behind.
        let entries: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_unique_path() {
        let dir = TempDir::new().unwrap();
        let first = unique_path(dir.path(), "abc", "json");
        assert_eq!(first, dir.path().join("abc.json"));

        fs::write(&first, "{}").unwrap();
        let second = unique_path(dir.path(), "abc", "json");
        assert_eq!(second, dir.path().join("abc_1.json"));

        fs::write(&second, "{}").unwrap();
        assert_eq!(
            unique_path(dir.path(), "abc", "json"),
            dir.path().join("abc_2.json")
        );
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("My Clip: part 1"), Some("My_Clip_part_1".to_string()));
        assert_eq!(sanitize_component("../etc"), Some("etc".to_string()));
        assert_eq!(sanitize_component("  "), None);
        assert_eq!(sanitize_component("C0ffee-42"), Some("C0ffee-42".to_string()));
    }

    #[test]
    fn test_url_slug() {
        assert_eq!(
            url_slug("https://www.instagram.com/reel/C0ffee42/?igsh=xyz"),
            Some("C0ffee42".to_string())
        );
        assert_eq!(url_slug("https://x/1"), Some("1".to_string()));
        assert_eq!(url_slug("https://example.com/"), None);
        assert_eq!(url_slug("https://example.com/watch#t=10"), Some("watch".to_string()));
        assert_eq!(url_slug("mailto:someone@example.com"), None);
    }

    #[test]
    fn test_url_slug_without_scheme() {
        assert_eq!(url_slug("reel/C0ffee42/?igsh=xyz"), Some("C0ffee42".to_string()));
        assert_eq!(url_slug(""), None);
    }
}
