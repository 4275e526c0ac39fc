//! Two-tier cache: a short-TTL in-memory map in front of the persistent store.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::entry::CacheEntry;
use super::store::PersistentStore;

/// Cache keys derived from the query that produced the data.
pub struct CacheKey;

impl CacheKey {
    pub fn categories() -> String {
        "categories".to_string()
    }

    pub fn subcategories(category_id: i64) -> String {
        format!("subs:{}", category_id)
    }

    pub fn instruments(subcategory_id: i64) -> String {
        format!("items:sub:{}", subcategory_id)
    }
}

/// Cache for one entity type.
///
/// The in-memory tier lives for the lifetime of the process and is never
/// evicted; entries simply stop being fresh. Key cardinality is bounded by
/// the number of categories and subcategories.
pub struct TieredCache<T> {
    name: &'static str,
    ttl: Duration,
    memory: RwLock<HashMap<String, CacheEntry<T>>>,
    persistent: PersistentStore,
}

impl<T> TieredCache<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    pub fn new(name: &'static str, ttl: Duration, persistent: PersistentStore) -> Self {
        Self {
            name,
            ttl,
            memory: RwLock::new(HashMap::new()),
            persistent,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// In-memory entry for `key` if it is within the short TTL.
    pub fn read_fresh(&self, key: &str) -> Option<CacheEntry<T>> {
        let memory = match self.memory.read() {
            Ok(memory) => memory,
            Err(e) => {
                warn!(cache = self.name, error = %e, "Memory tier lock poisoned");
                return None;
            }
        };
        memory
            .get(key)
            .filter(|entry| entry.is_fresh(self.ttl))
            .cloned()
    }

    /// Persisted entry for `key`, usable for hydration up to the persistence TTL.
    pub fn read_persisted(&self, key: &str) -> Option<CacheEntry<T>> {
        self.persistent.get(key)
    }

    /// Write-through to both tiers, stamped now.
    pub fn write(&self, key: &str, data: T) -> CacheEntry<T> {
        let entry = CacheEntry::new(data);
        self.persistent.set_entry(key, &entry);
        self.insert_memory(key, entry.clone());
        debug!(cache = self.name, key, "Cache entry written");
        entry
    }

    /// Populate the in-memory tier from a persisted envelope, keeping its timestamp.
    pub fn hydrate(&self, key: &str, entry: CacheEntry<T>) {
        self.insert_memory(key, entry);
    }

    /// Edit the cached value for `key` in place in every tier that holds it.
    ///
    /// Entry timestamps are preserved so a patch never makes stale data look fresh.
    /// Returns true if any tier was updated.
    pub fn patch<F>(&self, key: &str, mut edit: F) -> bool
    where
        F: FnMut(&mut T),
    {
        let mut patched = false;

        if let Ok(mut memory) = self.memory.write() {
            if let Some(entry) = memory.get_mut(key) {
                edit(&mut entry.data);
                patched = true;
            }
        }

        if let Some(mut entry) = self.persistent.get::<T>(key) {
            edit(&mut entry.data);
            self.persistent.set_entry(key, &entry);
            patched = true;
        }

        if patched {
            debug!(cache = self.name, key, "Cache entry patched");
        }
        patched
    }

    /// Age display for each in-memory key, sorted by key.
    pub fn ages(&self) -> Vec<(String, String)> {
        let memory = match self.memory.read() {
            Ok(memory) => memory,
            Err(_) => return Vec::new(),
        };
        let mut ages: Vec<(String, String)> = memory
            .iter()
            .map(|(key, entry)| (key.clone(), entry.age_display()))
            .collect();
        ages.sort();
        ages
    }

    fn insert_memory(&self, key: &str, entry: CacheEntry<T>) {
        match self.memory.write() {
            Ok(mut memory) => {
                memory.insert(key.to_string(), entry);
            }
            Err(e) => warn!(cache = self.name, error = %e, "Memory tier lock poisoned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn cache() -> TieredCache<Vec<String>> {
        TieredCache::new("test", Duration::seconds(45), PersistentStore::in_memory())
    }

    #[test]
    fn test_keys() {
        assert_eq!(CacheKey::categories(), "categories");
        assert_eq!(CacheKey::subcategories(3), "subs:3");
        assert_eq!(CacheKey::instruments(42), "items:sub:42");
    }

    #[test]
    fn test_write_populates_both_tiers() {
        let cache = cache();
        cache.write("k", vec!["a".to_string()]);
        assert_eq!(cache.read_fresh("k").unwrap().data, vec!["a".to_string()]);
        assert_eq!(cache.read_persisted("k").unwrap().data, vec!["a".to_string()]);
    }

    #[test]
    fn test_read_fresh_ignores_stale_memory() {
        let cache = cache();
        let stale = CacheEntry::with_timestamp(vec!["old".to_string()], Utc::now() - Duration::seconds(46));
        cache.hydrate("k", stale);
        assert!(cache.read_fresh("k").is_none());
    }

    #[test]
    fn test_patch_preserves_timestamp() {
        let cache = cache();
        let at = Utc::now() - Duration::seconds(10);
        let entry = CacheEntry::with_timestamp(vec!["a".to_string(), "b".to_string()], at);
        cache.hydrate("k", entry.clone());
        cache.persistent.set_entry("k", &entry);

        assert!(cache.patch("k", |items| items.retain(|s| s != "a")));

        let fresh = cache.read_fresh("k").unwrap();
        assert_eq!(fresh.data, vec!["b".to_string()]);
        assert_eq!(fresh.at, at);
        assert_eq!(cache.read_persisted("k").unwrap().data, vec!["b".to_string()]);
    }

    #[test]
    fn test_patch_missing_key() {
        let cache = cache();
        assert!(!cache.patch("absent", |items| items.clear()));
    }

    #[test]
    fn test_ages() {
        let cache = cache();
        cache.write("b", vec![]);
        cache.write("a", vec![]);
        let ages = cache.ages();
        assert_eq!(ages[0], ("a".to_string(), "just now".to_string()));
        assert_eq!(ages.len(), 2);
    }
}
