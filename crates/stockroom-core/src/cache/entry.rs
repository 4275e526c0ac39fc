use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Timestamped envelope for every cached value, in memory and on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub at: DateTime<Utc>,
    pub data: T,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T) -> Self {
        Self {
            at: Utc::now(),
            data,
        }
    }

    pub fn with_timestamp(data: T, at: DateTime<Utc>) -> Self {
        Self { at, data }
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.at
    }

    pub fn age_minutes(&self) -> i64 {
        self.age().num_minutes()
    }

    /// Fresh iff `now - at <= ttl`. Entries stamped in the future count as fresh.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() <= ttl
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            let remaining_mins = minutes % 60;
            if remaining_mins >= 30 {
                // Round up: 1h 30m+ becomes 2h
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            let remaining_hours = (minutes % 1440) / 60;
            if remaining_hours >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    /// Fresh in-memory entry, no I/O performed
    Memory,
    /// Hydrated from the persistent tier, possibly stale
    Persisted,
    /// Fetched from the network just now
    Network,
}

/// Data returned by an accessor, with metadata about its origin.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
    pub data: T,
    pub source: CacheSource,
    pub cached_at: DateTime<Utc>,
}

impl<T> CacheResult<T> {
    pub fn from_entry(entry: CacheEntry<T>, source: CacheSource) -> Self {
        Self {
            data: entry.data,
            source,
            cached_at: entry.at,
        }
    }

    pub fn into_data(self) -> T {
        self.data
    }
}
