//! Application configuration management.
//!
//! This module handles loading and saving the configuration: the inventory
//! API location, cache TTLs and prefetch tuning.
//!
//! Configuration is stored at `~/.config/stockroom/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::cache::CacheSettings;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "stockroom";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// API location used when none is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: Option<String>,
    /// Send session cookies with every request
    pub include_credentials: bool,
    pub category_ttl_secs: i64,
    pub subcategory_ttl_secs: i64,
    pub instrument_ttl_secs: i64,
    pub persist_ttl_hours: i64,
    pub prefetch_concurrency: usize,
    pub adjacent_prefetch_count: usize,
    /// Refresh in the background after serving stale persisted data
    pub revalidate_on_hydrate: bool,
    pub user_role: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let cache = CacheSettings::default();
        Self {
            api_base_url: None,
            include_credentials: true,
            category_ttl_secs: cache.category_ttl.num_seconds(),
            subcategory_ttl_secs: cache.subcategory_ttl.num_seconds(),
            instrument_ttl_secs: cache.instrument_ttl.num_seconds(),
            persist_ttl_hours: cache.persist_ttl.num_hours(),
            prefetch_concurrency: cache.prefetch_concurrency,
            adjacent_prefetch_count: cache.adjacent_prefetch_count,
            revalidate_on_hydrate: cache.revalidate_on_hydrate,
            user_role: None,
            log_dir: None,
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `path` is None.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
    }

    /// Cache tuning derived from this configuration. Non-positive values
    /// fall back to the defaults.
    pub fn cache_settings(&self) -> CacheSettings {
        let defaults = CacheSettings::default();
        let secs = |value: i64, fallback: Duration| {
            if value > 0 {
                Duration::seconds(value)
            } else {
                fallback
            }
        };
        CacheSettings {
            category_ttl: secs(self.category_ttl_secs, defaults.category_ttl),
            subcategory_ttl: secs(self.subcategory_ttl_secs, defaults.subcategory_ttl),
            instrument_ttl: secs(self.instrument_ttl_secs, defaults.instrument_ttl),
            persist_ttl: if self.persist_ttl_hours > 0 {
                Duration::hours(self.persist_ttl_hours)
            } else {
                defaults.persist_ttl
            },
            prefetch_concurrency: self.prefetch_concurrency.max(1),
            adjacent_prefetch_count: self.adjacent_prefetch_count,
            revalidate_on_hydrate: self.revalidate_on_hydrate,
        }
    }
}
