//! Persistent store adapter.
//!
//! `KeyValueStore` is the raw durable store; `PersistentStore` layers the
//! timestamped envelope and the persistence TTL on top. Persistence is best
//! effort: read failures become misses and write failures are only logged.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::entry::CacheEntry;

/// Default persistence TTL: entries older than this are not used even for hydration.
pub const DEFAULT_PERSIST_TTL_HOURS: i64 = 24;

/// A durable string key-value store.
pub trait KeyValueStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>>;

    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// One JSON file per key inside a cache directory.
pub struct FileStore {
    cache_dir: PathBuf,
}

impl FileStore {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Map a cache key to a file name. `items:sub:42` becomes `items_sub_42.json`.
    fn cache_path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.cache_dir.join(format!("{}.json", name))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.cache_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", key))?;
        Ok(Some(contents))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.cache_path(key);
        std::fs::write(&path, value)
            .with_context(|| format!("Failed to write cache file: {}", key))?;
        Ok(())
    }
}

/// Process-local store. Used by tests and when persistence is turned off.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Envelope-aware wrapper around a `KeyValueStore`.
#[derive(Clone)]
pub struct PersistentStore {
    backend: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl PersistentStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            ttl: Duration::hours(DEFAULT_PERSIST_TTL_HOURS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// A store that keeps nothing across restarts.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Read an envelope. Absent, unreadable, malformed and expired entries are all `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let raw = match self.backend.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                debug!(key, error = %e, "Persistent cache read failed");
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key, error = %e, "Discarding malformed persistent cache entry");
                return None;
            }
        };

        if !entry.is_fresh(self.ttl) {
            debug!(key, age = %entry.age_display(), "Persistent cache entry expired");
            return None;
        }
        Some(entry)
    }

    /// Write `data` stamped with the current time.
    pub fn set<T: Serialize>(&self, key: &str, data: &T) {
        self.set_entry(key, &CacheEntry::new(data));
    }

    /// Write an envelope with an explicit timestamp.
    pub fn set_entry<T: Serialize>(&self, key: &str, entry: &CacheEntry<T>) {
        let contents = match serde_json::to_string(entry) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };
        if let Err(e) = self.backend.write(key, &contents) {
            warn!(key, error = %e, "Failed to persist cache entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    /// Backend whose writes always fail, like a full disk or exceeded quota.
    struct FullStore;

    impl KeyValueStore for FullStore {
        fn read(&self, _key: &str) -> Result<Option<String>> {
            Err(anyhow!("device not ready"))
        }

        fn write(&self, _key: &str, _value: &str) -> Result<()> {
            Err(anyhow!("quota exceeded"))
        }
    }

    #[test]
    fn test_set_then_get() {
        let store = PersistentStore::in_memory();
        store.set("categories", &vec!["Optics".to_string()]);
        let entry: CacheEntry<Vec<String>> = store.get("categories").unwrap();
        assert_eq!(entry.data, vec!["Optics".to_string()]);
        assert!(entry.age_minutes() <= 1);
    }

    #[test]
    fn test_get_missing_key() {
        let store = PersistentStore::in_memory();
        assert!(store.get::<Vec<String>>("nope").is_none());
    }

    #[test]
    fn test_get_rejects_malformed_envelopes() {
        let backend = Arc::new(MemoryStore::new());
        let store = PersistentStore::new(backend.clone());

        backend.write("garbage", "not json").unwrap();
        backend.write("no_at", r#"{"data": [1, 2]}"#).unwrap();
        backend.write("no_data", r#"{"at": "2024-01-01T00:00:00Z"}"#).unwrap();

        assert!(store.get::<Vec<i32>>("garbage").is_none());
        assert!(store.get::<Vec<i32>>("no_at").is_none());
        assert!(store.get::<Vec<i32>>("no_data").is_none());
    }

    #[test]
    fn test_get_respects_persist_ttl() {
        let store = PersistentStore::in_memory();
        let twelve_hours = CacheEntry::with_timestamp(vec![1], Utc::now() - Duration::hours(12));
        let two_days = CacheEntry::with_timestamp(vec![2], Utc::now() - Duration::hours(48));
        store.set_entry("recent", &twelve_hours);
        store.set_entry("ancient", &two_days);

        assert_eq!(store.get::<Vec<i32>>("recent").unwrap().data, vec![1]);
        assert!(store.get::<Vec<i32>>("ancient").is_none());
    }

    #[test]
    fn test_failures_are_swallowed() {
        let store = PersistentStore::new(Arc::new(FullStore));
        store.set("categories", &vec![1, 2, 3]);
        assert!(store.get::<Vec<i32>>("categories").is_none());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileStore::new(dir.path().join("cache")).unwrap();
        files.write("items:sub:42", "{}").unwrap();

        assert!(dir.path().join("cache").join("items_sub_42.json").exists());
        assert_eq!(files.read("items:sub:42").unwrap().as_deref(), Some("{}"));
        assert!(files.read("items:sub:43").unwrap().is_none());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = PersistentStore::new(Arc::new(FileStore::new(dir.path().to_path_buf()).unwrap()));
            store.set("subs:3", &vec!["Scopes".to_string()]);
        }
        let reopened = PersistentStore::new(Arc::new(FileStore::new(dir.path().to_path_buf()).unwrap()));
        let entry: CacheEntry<Vec<String>> = reopened.get("subs:3").unwrap();
        assert_eq!(entry.data, vec!["Scopes".to_string()]);
    }
}
