//! Freshness-stamped local file cache for downloaded indexes and workbooks.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Deterministic cache path for a URL: last path segment under the
    /// family subdirectory, sanitized when the URL has no usable segment.
    fn path_for(&self, subdir: &str, url: &str) -> PathBuf {
        let name = url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .map(sanitize_filename)
            .unwrap_or_else(|| sanitize_filename(url));
        self.root.join(subdir).join(name)
    }

    /// Cached bytes if present and younger than `max_age_hours`.
    pub async fn get(&self, subdir: &str, url: &str, max_age_hours: f64) -> Option<Vec<u8>> {
        let path = self.path_for(subdir, url);
        if !is_fresh(&path, max_age_hours) {
            return None;
        }
        tokio::fs::read(&path).await.ok()
    }

    pub async fn put(&self, subdir: &str, url: &str, content: &[u8]) -> Result<()> {
        let path = self.path_for(subdir, url);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        Ok(())
    }
}

fn is_fresh(path: &Path, max_age_hours: f64) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    let Ok(modified) = metadata.modified() else {
        return false;
    };
    match SystemTime::now().duration_since(modified) {
        Ok(age) => age.as_secs_f64() < max_age_hours * 3600.0,
        // Modified in the future (clock skew); treat as fresh.
        Err(_) => true,
    }
}

fn sanitize_filename(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
            c
        } else {
            '_'
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_bytes_through_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());

        let url = "https://example.test/vol/20260202_whole_day.xlsx";
        assert!(cache.get("volume", url, 1.0).await.is_none());

        cache.put("volume", url, b"workbook").await.unwrap();
        assert_eq!(
            cache.get("volume", url, 1.0).await.as_deref(),
            Some(b"workbook".as_ref())
        );
    }

    #[tokio::test]
    async fn stale_entries_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());

        let url = "https://example.test/index.json";
        cache.put("index", url, b"{}").await.unwrap();
        assert!(cache.get("index", url, 0.0).await.is_none());
    }

    #[test]
    fn urls_without_a_segment_still_map_to_a_file() {
        let cache = FileCache::new("/tmp/teguchi-test");
        let a = cache.path_for("index", "https://example.test/a/");
        let b = cache.path_for("index", "https://example.test/b/");
        assert_ne!(a, b);
    }
}
