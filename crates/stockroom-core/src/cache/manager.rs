use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::entry::{CacheEntry, CacheResult, CacheSource};
use super::store::{PersistentStore, DEFAULT_PERSIST_TTL_HOURS};
use super::tiered::{CacheKey, TieredCache};
use crate::api::{ApiError, InventoryApi};
use crate::error::InventoryError;
use crate::models::{Category, Instrument, Subcategory};

/// Categories and subcategories change rarely.
const CATALOG_TTL_SECS: i64 = 60;

/// Instruments churn more and a stale quantity is costlier
/// (an out-of-stock item shown as available).
const INSTRUMENT_TTL_SECS: i64 = 45;

/// Default worker count for bulk warming.
const DEFAULT_PREFETCH_CONCURRENCY: usize = 5;

/// How many subcategories ahead to warm on expand / page change.
const DEFAULT_ADJACENT_PREFETCH_COUNT: usize = 3;

/// Cache tuning.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub category_ttl: Duration,
    pub subcategory_ttl: Duration,
    pub instrument_ttl: Duration,
    pub persist_ttl: Duration,
    pub prefetch_concurrency: usize,
    pub adjacent_prefetch_count: usize,
    pub revalidate_on_hydrate: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            category_ttl: Duration::seconds(CATALOG_TTL_SECS),
            subcategory_ttl: Duration::seconds(CATALOG_TTL_SECS),
            instrument_ttl: Duration::seconds(INSTRUMENT_TTL_SECS),
            persist_ttl: Duration::hours(DEFAULT_PERSIST_TTL_HOURS),
            prefetch_concurrency: DEFAULT_PREFETCH_CONCURRENCY,
            adjacent_prefetch_count: DEFAULT_ADJACENT_PREFETCH_COUNT,
            revalidate_on_hydrate: true,
        }
    }
}

/// A cacheable query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTarget {
    Categories,
    Subcategories(i64),
    Instruments(i64),
}

impl CacheTarget {
    pub fn key(&self) -> String {
        match self {
            CacheTarget::Categories => CacheKey::categories(),
            CacheTarget::Subcategories(category_id) => CacheKey::subcategories(*category_id),
            CacheTarget::Instruments(subcategory_id) => CacheKey::instruments(*subcategory_id),
        }
    }
}

impl fmt::Display for CacheTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTarget::Categories => write!(f, "categories"),
            CacheTarget::Subcategories(id) => write!(f, "subcategories of category {}", id),
            CacheTarget::Instruments(id) => write!(f, "instruments of subcategory {}", id),
        }
    }
}

struct Inner<A> {
    api: Arc<A>,
    settings: CacheSettings,
    categories: TieredCache<Vec<Category>>,
    subcategories: TieredCache<Vec<Subcategory>>,
    instruments: TieredCache<Vec<Instrument>>,
}

/// Cache service for the inventory catalog.
///
/// Construct one per process and hand out clones; clones share all state.
pub struct InventoryCache<A> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for InventoryCache<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: InventoryApi> InventoryCache<A> {
    pub fn new(api: Arc<A>, store: PersistentStore, settings: CacheSettings) -> Self {
        let store = store.with_ttl(settings.persist_ttl);
        let inner = Inner {
            api,
            categories: TieredCache::new("categories", settings.category_ttl, store.clone()),
            subcategories: TieredCache::new("subcategories", settings.subcategory_ttl, store.clone()),
            instruments: TieredCache::new("instruments", settings.instrument_ttl, store),
            settings,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.inner.api
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.inner.settings
    }

    // ===== Accessors =====

    pub async fn list_categories(&self) -> Result<CacheResult<Vec<Category>>, InventoryError> {
        let api = Arc::clone(&self.inner.api);
        self.read_through(&self.inner.categories, CacheTarget::Categories, || async move {
            api.fetch_categories().await
        })
        .await
    }

    pub async fn list_subcategories_for(
        &self,
        category_id: i64,
    ) -> Result<CacheResult<Vec<Subcategory>>, InventoryError> {
        let api = Arc::clone(&self.inner.api);
        let target = CacheTarget::Subcategories(category_id);
        self.read_through(&self.inner.subcategories, target, || async move {
            api.fetch_subcategories(category_id).await
        })
        .await
    }

    pub async fn list_instruments_for(
        &self,
        subcategory_id: i64,
    ) -> Result<CacheResult<Vec<Instrument>>, InventoryError> {
        let api = Arc::clone(&self.inner.api);
        let target = CacheTarget::Instruments(subcategory_id);
        self.read_through(&self.inner.instruments, target, || async move {
            api.fetch_instruments(subcategory_id).await
        })
        .await
    }

    /// Read `target` through the cache, returning only where the data came from.
    pub async fn load(&self, target: CacheTarget) -> Result<CacheSource, InventoryError> {
        Ok(match target {
            CacheTarget::Categories => self.list_categories().await?.source,
            CacheTarget::Subcategories(id) => self.list_subcategories_for(id).await?.source,
            CacheTarget::Instruments(id) => self.list_instruments_for(id).await?.source,
        })
    }

    // ===== Refresh (always hits the network) =====

    pub async fn refresh_categories(&self) -> Result<Vec<Category>, InventoryError> {
        let api = Arc::clone(&self.inner.api);
        self.fetch_and_store(&self.inner.categories, CacheTarget::Categories, || async move {
            api.fetch_categories().await
        })
        .await
        .map(CacheResult::into_data)
    }

    pub async fn refresh_subcategories_for(
        &self,
        category_id: i64,
    ) -> Result<Vec<Subcategory>, InventoryError> {
        let api = Arc::clone(&self.inner.api);
        let target = CacheTarget::Subcategories(category_id);
        self.fetch_and_store(&self.inner.subcategories, target, || async move {
            api.fetch_subcategories(category_id).await
        })
        .await
        .map(CacheResult::into_data)
    }

    pub async fn refresh_instruments_for(
        &self,
        subcategory_id: i64,
    ) -> Result<Vec<Instrument>, InventoryError> {
        let api = Arc::clone(&self.inner.api);
        let target = CacheTarget::Instruments(subcategory_id);
        self.fetch_and_store(&self.inner.instruments, target, || async move {
            api.fetch_instruments(subcategory_id).await
        })
        .await
        .map(CacheResult::into_data)
    }

    pub async fn refresh(&self, target: CacheTarget) -> Result<(), InventoryError> {
        match target {
            CacheTarget::Categories => self.refresh_categories().await.map(|_| ()),
            CacheTarget::Subcategories(id) => self.refresh_subcategories_for(id).await.map(|_| ()),
            CacheTarget::Instruments(id) => self.refresh_instruments_for(id).await.map(|_| ()),
        }
    }

    /// Refresh `target` on a detached task. Failures are logged, never surfaced.
    pub fn refresh_in_background(&self, target: CacheTarget) {
        let this = self.clone();
        tokio::spawn(async move {
            match this.refresh(target).await {
                Ok(()) => debug!(%target, "Background refresh complete"),
                Err(e) => warn!(%target, error = %e, "Background refresh failed"),
            }
        });
    }

    // ===== First-paint readers (no network) =====

    pub fn cached_categories_now(&self) -> Option<Vec<Category>> {
        Self::cached_now(&self.inner.categories, &CacheKey::categories())
    }

    pub fn cached_subcategories_now(&self, category_id: i64) -> Option<Vec<Subcategory>> {
        Self::cached_now(&self.inner.subcategories, &CacheKey::subcategories(category_id))
    }

    pub fn cached_instruments_now(&self, subcategory_id: i64) -> Option<Vec<Instrument>> {
        Self::cached_now(&self.inner.instruments, &CacheKey::instruments(subcategory_id))
    }

    // ===== Mutation support =====

    /// Apply an in-place edit to the cached instrument list of a subcategory.
    pub fn patch_instruments<F>(&self, subcategory_id: i64, edit: F) -> bool
    where
        F: FnMut(&mut Vec<Instrument>),
    {
        self.inner
            .instruments
            .patch(&CacheKey::instruments(subcategory_id), edit)
    }

    /// Age display for every in-memory entry, for status reporting.
    pub fn cache_ages(&self) -> Vec<(String, String)> {
        let mut ages = self.inner.categories.ages();
        ages.extend(self.inner.subcategories.ages());
        ages.extend(self.inner.instruments.ages());
        ages
    }

    // ===== Internals =====

    fn cached_now<T>(cache: &TieredCache<T>, key: &str) -> Option<T>
    where
        T: Clone + Serialize + DeserializeOwned,
    {
        cache
            .read_fresh(key)
            .or_else(|| cache.read_persisted(key))
            .map(|entry| entry.data)
    }

    /// Fresh memory -> persisted (hydrate, maybe revalidate) -> network.
    async fn read_through<T, F, Fut>(
        &self,
        cache: &TieredCache<T>,
        target: CacheTarget,
        fetcher: F,
    ) -> Result<CacheResult<T>, InventoryError>
    where
        T: Clone + Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let key = target.key();

        if let Some(entry) = cache.read_fresh(&key) {
            debug!(cache = cache.name(), key = %key, "Memory cache hit");
            return Ok(CacheResult::from_entry(entry, CacheSource::Memory));
        }

        if let Some(entry) = cache.read_persisted(&key) {
            let stale = !entry.is_fresh(cache.ttl());
            debug!(cache = cache.name(), key = %key, age = %entry.age_display(), stale, "Hydrating from persistent cache");
            cache.hydrate(&key, entry.clone());
            if stale && self.inner.settings.revalidate_on_hydrate {
                self.refresh_in_background(target);
            }
            return Ok(CacheResult::from_entry(entry, CacheSource::Persisted));
        }

        debug!(cache = cache.name(), key = %key, "Cache miss, fetching");
        self.fetch_and_store(cache, target, fetcher).await
    }

    async fn fetch_and_store<T, F, Fut>(
        &self,
        cache: &TieredCache<T>,
        target: CacheTarget,
        fetcher: F,
    ) -> Result<CacheResult<T>, InventoryError>
    where
        T: Clone + Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let data = fetcher()
            .await
            .map_err(|e| InventoryError::fetch(target.to_string(), e))?;
        let entry: CacheEntry<T> = cache.write(&target.key(), data);
        info!(%target, "Fetched and cached");
        Ok(CacheResult::from_entry(entry, CacheSource::Network))
    }
}
