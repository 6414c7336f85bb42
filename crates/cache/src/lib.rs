#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! On-disk download cache for xfer
//!
//! The cache is a flat directory. There is no index: an entry exists iff a
//! file with the derived name is present. Names are either the basename of
//! the source URL (when it carries a file extension, so typed loaders can
//! infer the format) or a BLAKE3-derived UUID of the whole key.
//!
//! Filesystem failures never propagate out of the lookup and removal
//! operations; they are logged through the event channel and `tracing`.
//! Concurrent writers of the same key are not coordinated and the last
//! writer wins.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use xfer_errors::StorageError;
use xfer_events::{AppEvent, CacheEvent, EventEmitter, EventSender};

const TEMP_DIR_NAME: &str = "xfer-cache";

/// Characters that cannot appear in a portable file name
const RESERVED: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// A resolved cache location for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub path: PathBuf,
    pub exists: bool,
}

/// File name for a cache key
///
/// Pure: the same key always yields the same name.
#[must_use]
pub fn file_name(key: &str) -> String {
    let without_query = key.split(['?', '#']).next().unwrap_or_default();
    let segment = without_query.rsplit('/').next().unwrap_or_default();

    if has_extension(segment) {
        segment.to_string()
    } else {
        xfer_hash::key_digest(key)
    }
}

fn has_extension(name: &str) -> bool {
    if name.is_empty() || name.chars().any(|c| c.is_control() || RESERVED.contains(&c)) {
        return false;
    }
    match name.rsplit_once('.') {
        Some((_, ext)) => !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()),
        None => false,
    }
}

/// Removes a half-written entry unless it was committed
struct PendingEntry {
    path: PathBuf,
    committed: bool,
}

impl Drop for PendingEntry {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Flat directory of downloaded payloads keyed by source URL
#[derive(Debug, Clone)]
pub struct DownloadCache {
    root: PathBuf,
    event_sender: Option<EventSender>,
}

impl EventEmitter for DownloadCache {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl DownloadCache {
    /// Cache rooted at `root`; the directory is created on first use
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            event_sender: None,
        }
    }

    /// Cache under the system temporary directory
    #[must_use]
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir().join(TEMP_DIR_NAME))
    }

    #[must_use]
    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.event_sender = Some(tx);
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the cache root if it is missing
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn ensure_directory(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, &self.root))
    }

    /// Path for `key` without touching the filesystem
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(file_name(key))
    }

    /// Derive the path for `key` and check whether a file is there
    pub async fn resolve(&self, key: &str) -> CacheEntry {
        self.ensure_logged().await;
        let path = self.path_for(key);
        let exists = is_file(&path).await;

        let event = if exists {
            CacheEvent::Hit {
                key: key.to_string(),
                path: path.clone(),
            }
        } else {
            CacheEvent::Miss {
                key: key.to_string(),
                path: path.clone(),
            }
        };
        self.emit(AppEvent::Cache(event));

        CacheEntry {
            key: key.to_string(),
            path,
            exists,
        }
    }

    /// Remove the entry for `key`
    ///
    /// Returns true iff no file remains at the entry's path, so deleting an
    /// absent entry succeeds.
    pub async fn delete(&self, key: &str) -> bool {
        self.ensure_logged().await;
        let path = self.path_for(key);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(key, path = %path.display(), "cache entry deleted");
                self.emit(AppEvent::Cache(CacheEvent::Deleted {
                    key: key.to_string(),
                    path: path.clone(),
                }));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => self.log_failure("failed to delete cache entry", &e, &path),
        }

        !is_file(&path).await
    }

    /// Remove the whole cache directory
    ///
    /// Returns true iff the root no longer exists afterwards.
    pub async fn clear(&self) -> bool {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => {
                tracing::debug!(root = %self.root.display(), "cache cleared");
                self.emit(AppEvent::Cache(CacheEvent::Cleared {
                    root: self.root.clone(),
                }));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => self.log_failure("failed to clear cache", &e, &self.root),
        }

        !tokio::fs::try_exists(&self.root).await.unwrap_or(true)
    }

    /// Write `bytes` as the entry for `key`
    ///
    /// The payload goes to a `.part` sibling first and is renamed into place
    /// once flushed, so a failed write never leaves a truncated entry that
    /// later lookups would treat as a hit.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be created or the entry cannot be
    /// written; no entry for `key` is left behind in that case.
    pub async fn store(&self, key: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        self.ensure_directory().await?;
        let path = self.path_for(key);

        let mut part_name = path.file_name().unwrap_or_default().to_os_string();
        part_name.push(".part");
        let part_path = path.with_file_name(part_name);

        let mut pending = PendingEntry {
            path: part_path.clone(),
            committed: false,
        };
        let io_err = |e: std::io::Error, at: &Path| StorageError::from_io_with_path(&e, at);

        let mut file = File::create(&part_path)
            .await
            .map_err(|e| io_err(e, &part_path))?;
        file.write_all(bytes)
            .await
            .map_err(|e| io_err(e, &part_path))?;
        file.flush().await.map_err(|e| io_err(e, &part_path))?;
        file.sync_all().await.map_err(|e| io_err(e, &part_path))?;
        drop(file);

        tokio::fs::rename(&part_path, &path)
            .await
            .map_err(|e| io_err(e, &path))?;
        pending.committed = true;

        self.record_stored(key, &path, bytes.len() as u64);
        Ok(path)
    }

    /// Record that `bytes` were written for `key`
    pub fn record_stored(&self, key: &str, path: &Path, bytes: u64) {
        tracing::debug!(key, path = %path.display(), bytes, "cache entry stored");
        self.emit(AppEvent::Cache(CacheEvent::Stored {
            key: key.to_string(),
            path: path.to_path_buf(),
            bytes,
        }));
    }

    async fn ensure_logged(&self) {
        if let Err(e) = self.ensure_directory().await {
            tracing::warn!(root = %self.root.display(), error = %e, "cache directory unavailable");
            self.emit_error_with_details("cache directory unavailable", e.to_string());
        }
    }

    fn log_failure(&self, message: &str, error: &std::io::Error, path: &Path) {
        let error = StorageError::from_io_with_path(error, path);
        tracing::warn!(path = %path.display(), error = %error, "{message}");
        self.emit_error_with_details(message, error.to_string());
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_extension_urls_keep_basename() {
        assert_eq!(file_name("https://example.com/a/img.jpg?x=1"), "img.jpg");
        assert_eq!(file_name("https://example.com/sound.ogg#t=3"), "sound.ogg");
        assert_eq!(file_name("https://example.com/bundle.tar.gz"), "bundle.tar.gz");
        assert_eq!(file_name("https://example.com/.env"), ".env");
    }

    #[test]
    fn test_extensionless_urls_use_digest() {
        let name = file_name("https://example.com/api/data");
        assert_eq!(name, xfer_hash::key_digest("https://example.com/api/data"));
        assert_eq!(name.len(), 36);
        assert!(!name.contains('.'));

        // Trailing slash and odd extensions fall back as well
        assert_eq!(
            file_name("https://example.com/dir/"),
            xfer_hash::key_digest("https://example.com/dir/")
        );
        assert_eq!(
            file_name("https://example.com/v1.2-beta"),
            xfer_hash::key_digest("https://example.com/v1.2-beta")
        );
        assert_eq!(
            file_name("https://example.com/trailing."),
            xfer_hash::key_digest("https://example.com/trailing.")
        );
    }

    #[test]
    fn test_query_changes_digest_but_not_basename() {
        assert_ne!(
            file_name("https://example.com/data?page=1"),
            file_name("https://example.com/data?page=2")
        );
        assert_eq!(
            file_name("https://example.com/a.png?v=1"),
            file_name("https://example.com/a.png?v=2")
        );
    }

    #[test]
    fn test_reserved_characters_fall_back() {
        let key = "https://example.com/we|rd.png";
        assert_eq!(file_name(key), xfer_hash::key_digest(key));
    }

    proptest! {
        #[test]
        fn prop_file_name_is_deterministic(key in ".*") {
            prop_assert_eq!(file_name(&key), file_name(&key));
        }

        #[test]
        fn prop_file_name_is_a_single_component(key in ".*") {
            let name = file_name(&key);
            prop_assert!(!name.is_empty());
            prop_assert!(!name.contains('/'));
            prop_assert!(!name.contains('\\'));
        }
    }

    #[tokio::test]
    async fn test_resolve_creates_root_lazily() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("cache");
        let cache = DownloadCache::new(&root);
        assert!(!root.exists());

        let entry = cache.resolve("https://example.com/a.txt").await;
        assert!(root.is_dir());
        assert!(!entry.exists);
        assert_eq!(entry.path, root.join("a.txt"));

        std::fs::write(&entry.path, b"x").unwrap();
        assert!(cache.resolve("https://example.com/a.txt").await.exists);
    }

    #[tokio::test]
    async fn test_store_writes_entry_and_reports() {
        let temp = tempfile::tempdir().unwrap();
        let (tx, mut rx) = xfer_events::channel();
        let cache = DownloadCache::new(temp.path().join("cache")).with_events(tx);

        let path = cache.store("https://example.com/a.bin", b"payload").await.unwrap();
        assert_eq!(path, cache.path_for("https://example.com/a.bin"));
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
        assert!(!temp.path().join("cache").join("a.bin.part").exists());

        let mut stored = None;
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::Cache(CacheEvent::Stored { bytes, .. }) = event {
                stored = Some(bytes);
            }
        }
        assert_eq!(stored, Some(7));
    }

    #[tokio::test]
    async fn test_store_failure_leaves_no_entry() {
        let temp = tempfile::tempdir().unwrap();
        let cache = DownloadCache::new(temp.path());
        let key = "https://example.com/photo.jpg";
        std::fs::create_dir(temp.path().join("photo.jpg.part")).unwrap();

        assert!(cache.store(key, b"abc").await.is_err());
        assert!(!cache.resolve(key).await.exists);
    }

    #[tokio::test]
    async fn test_store_removes_part_when_rename_fails() {
        let temp = tempfile::tempdir().unwrap();
        let cache = DownloadCache::new(temp.path());
        let key = "https://example.com/photo.jpg";
        std::fs::create_dir(temp.path().join("photo.jpg")).unwrap();
        std::fs::write(temp.path().join("photo.jpg").join("inner"), b"x").unwrap();

        assert!(cache.store(key, b"abc").await.is_err());
        assert!(!temp.path().join("photo.jpg.part").exists());
        assert!(!cache.resolve(key).await.exists);
    }
}
