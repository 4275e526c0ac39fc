//! Stockroom core - caching and optimistic updates for an inventory service.
//!
//! The crate sits between a UI and the inventory REST API:
//!
//! - `cache`: two-tier (memory + persisted) cache with fetch-and-cache accessors
//! - `prefetch`: anticipatory loading driven by navigation events
//! - `mutation`: optimistic edit, delete, and issue workflows with rollback
//! - `api`: the `InventoryApi` seam and its HTTP client

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod mutation;
pub mod prefetch;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use api::{ApiClient, ApiError, InventoryApi};
pub use cache::{CacheResult, CacheSettings, CacheSource, CacheTarget, InventoryCache, PersistentStore};
pub use config::Config;
pub use error::InventoryError;
pub use mutation::{InstrumentList, ListHandle, MutationController, MutationPhase};
pub use prefetch::{Prefetcher, WarmReport};
