//! Persistent HTTP response cache.
//!
//! Bodies are keyed by request URL and kept in a single JSON file so a
//! rate-limited provider is not asked the same question twice within the
//! TTL. The file is rewritten on every insert; a missing or corrupt file
//! yields an empty cache. Expired entries are dropped when the file is
//! opened and when a lookup finds them stale.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from cache persistence.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    stored_at: DateTime<Utc>,
    body: String,
}

#[derive(Debug)]
pub struct ResponseCache {
    path: Option<PathBuf>,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    /// Opens (or starts) a cache file.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        let path = path.into();
        let entries = match Self::read_file(&path) {
            Ok(Some(entries)) => {
                info!(path = %path.display(), entries = entries.len(), "Loaded response cache");
                entries
            }
            Ok(None) => {
                info!(path = %path.display(), "No response cache found, starting fresh");
                HashMap::new()
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load response cache, starting fresh"
                );
                HashMap::new()
            }
        };

        let cache = Self {
            path: Some(path),
            ttl,
            entries: Mutex::new(entries),
        };
        match cache.purge_expired() {
            Ok(0) => {}
            Ok(removed) => debug!(removed, "Purged expired cache entries"),
            Err(e) => warn!(error = %e, "Failed to rewrite purged response cache"),
        }
        cache
    }

    /// A cache that is never written to disk.
    #[must_use]
    pub fn in_memory(ttl: Duration) -> Self {
        Self {
            path: None,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns a cached body if it is younger than the TTL.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, Utc::now())
    }

    fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<String> {
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?;
        if now - entry.stored_at > self.ttl {
            debug!(key, "Cache entry expired");
            entries.remove(key);
            return None;
        }
        Some(entry.body.clone())
    }

    /// Stores a body and writes the cache through to disk.
    ///
    /// # Errors
    /// Returns error if the cache file cannot be written. The in-memory
    /// entry is kept either way.
    pub fn insert(&self, key: impl Into<String>, body: impl Into<String>) -> Result<(), CacheError> {
        self.insert_at(key.into(), body.into(), Utc::now())
    }

    fn insert_at(&self, key: String, body: String, now: DateTime<Utc>) -> Result<(), CacheError> {
        let snapshot = {
            let mut entries = self.entries.lock();
            entries.insert(key, CacheEntry { stored_at: now, body });
            entries.clone()
        };
        self.write_file(&snapshot)
    }

    /// Drops expired entries and rewrites the file.
    ///
    /// # Errors
    /// Returns error if the cache file cannot be written.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        self.purge_at(Utc::now())
    }

    fn purge_at(&self, now: DateTime<Utc>) -> Result<usize, CacheError> {
        let (removed, snapshot) = {
            let mut entries = self.entries.lock();
            let before = entries.len();
            entries.retain(|_, entry| now - entry.stored_at <= self.ttl);
            (before - entries.len(), entries.clone())
        };
        if removed > 0 {
            self.write_file(&snapshot)?;
        }
        Ok(removed)
    }

    fn read_file(path: &Path) -> Result<Option<HashMap<String, CacheEntry>>, CacheError> {
        if !path.exists() {
            return Ok(None);
        }
        let reader = BufReader::new(File::open(path)?);
        Ok(Some(serde_json::from_reader(reader)?))
    }

    fn write_file(&self, entries: &HashMap<String, CacheEntry>) -> Result<(), CacheError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, entries)?;
        debug!(path = %path.display(), entries = entries.len(), "Saved response cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_insert_and_get() {
        let cache = ResponseCache::in_memory(Duration::hours(1));
        assert!(cache.get("https://x/a").is_none());
        cache.insert("https://x/a", "{\"ok\":true}").unwrap();
        assert_eq!(cache.get("https://x/a").as_deref(), Some("{\"ok\":true}"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entry_is_miss() {
        let cache = ResponseCache::in_memory(Duration::seconds(60));
        let stored = Utc::now() - Duration::seconds(120);
        cache.insert_at("k".into(), "v".into(), stored).unwrap();
        assert_eq!(
            cache.get_at("k", stored + Duration::seconds(30)).as_deref(),
            Some("v")
        );
        assert!(cache.get_at("k", Utc::now()).is_none());
        // stale entries are evicted on lookup
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reopen_drops_expired_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        let cache = ResponseCache::open(&path, Duration::hours(1));
        cache
            .insert_at("stale".into(), "v".into(), Utc::now() - Duration::hours(2))
            .unwrap();
        drop(cache);

        let reopened = ResponseCache::open(&path, Duration::hours(1));
        assert!(reopened.is_empty());

        let on_disk: HashMap<String, CacheEntry> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(on_disk.is_empty());
    }

    #[test]
    fn test_persists_across_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let cache = ResponseCache::open(&path, Duration::hours(1));
        assert!(cache.is_empty());
        cache.insert("url", "body").unwrap();
        assert!(path.exists());

        let reopened = ResponseCache::open(&path, Duration::hours(1));
        assert_eq!(reopened.get("url").as_deref(), Some("body"));
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json").unwrap();

        let cache = ResponseCache::open(&path, Duration::hours(1));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let cache = ResponseCache::in_memory(Duration::seconds(60));
        cache
            .insert_at("old".into(), "v".into(), Utc::now() - Duration::seconds(600))
            .unwrap();
        cache.insert("new", "v").unwrap();
        assert_eq!(cache.purge_expired().unwrap(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("new").is_some());
    }
}
