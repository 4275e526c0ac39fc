//! Local caching module for the inventory catalog.
//!
//! Every cached value is wrapped in a timestamped `CacheEntry` and lives in
//! two tiers:
//!
//! - an in-memory tier with a short TTL (60s for categories and
//!   subcategories, 45s for instruments), used for zero-I/O reads
//! - a persistent tier (JSON files by default) kept for 24 hours, used to
//!   hydrate the UI on startup before the network answers
//!
//! `InventoryCache` ties both tiers to the inventory API.

pub mod entry;
pub mod manager;
pub mod store;
pub mod tiered;

pub use entry::{CacheEntry, CacheResult, CacheSource};
pub use manager::{CacheSettings, CacheTarget, InventoryCache};
pub use store::{FileStore, KeyValueStore, MemoryStore, PersistentStore};
pub use tiered::{CacheKey, TieredCache};
