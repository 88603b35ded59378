//! Local content-addressed blob cache.
//!
//! A flat directory whose entries are named by hex content digest. The cache
//! is populated by the add/commit workflow ahead of time; the pre-push gate
//! only reads from it. An entry missing at push time is unrecoverable within
//! a run — the original bytes were never cached.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::content_id::ContentId;

/// Handle to a flat cache directory keyed by content identity.
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    /// Open a cache directory (must already exist; config creates it).
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// The cache directory path.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a blob with this identity would occupy.
    pub fn entry_path(&self, id: &ContentId) -> PathBuf {
        self.dir.join(id.to_hex())
    }

    /// Whether a blob with this identity is cached.
    pub fn contains(&self, id: &ContentId) -> bool {
        self.entry_path(id).is_file()
    }

    /// Copy a file into the cache, returning its content identity.
    /// Already-cached content is left untouched (entries are immutable).
    pub fn store(&self, source: &Path) -> Result<ContentId> {
        let id = ContentId::from_file(source)
            .with_context(|| format!("Failed to hash {}", source.display()))?;
        let dest = self.entry_path(&id);
        if !dest.exists() {
            fs::copy(source, &dest)
                .with_context(|| format!("Failed to cache {}", source.display()))?;
        }
        Ok(id)
    }

    /// Count and total size of cached entries.
    pub fn stats(&self) -> Result<(u64, u64)> {
        let mut count = 0u64;
        let mut bytes = 0u64;
        if !self.dir.exists() {
            return Ok((0, 0));
        }
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if meta.is_file() {
                count += 1;
                bytes += meta.len();
            }
        }
        Ok((count, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_store_contains() {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::new(tmp.path().to_path_buf());

        let src = tmp.path().join("data.bin");
        fs::write(&src, b"large payload").unwrap();

        let id = cache.store(&src).unwrap();
        assert!(cache.contains(&id));
        assert_eq!(id, ContentId::from_data(b"large payload"));
        assert_eq!(
            fs::read(cache.entry_path(&id)).unwrap(),
            b"large payload"
        );
    }

    #[test]
    fn test_contains_false_for_unknown() {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::new(tmp.path().to_path_buf());
        assert!(!cache.contains(&ContentId::from_data(b"never cached")));
    }

    #[test]
    fn test_store_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::new(tmp.path().to_path_buf());
        let src = tmp.path().join("data.bin");
        fs::write(&src, b"payload").unwrap();

        let id1 = cache.store(&src).unwrap();
        let id2 = cache.store(&src).unwrap();
        assert_eq!(id1, id2);

        // One cache entry plus the source file itself
        let (count, bytes) = cache.stats().unwrap();
        assert_eq!(count, 2);
        assert_eq!(bytes, 14);
    }

    #[test]
    fn test_stats_empty_dir() {
        let tmp = TempDir::new().unwrap();
        let cache = LocalCache::new(tmp.path().join("missing"));
        assert_eq!(cache.stats().unwrap(), (0, 0));
    }
}
