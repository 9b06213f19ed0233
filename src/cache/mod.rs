//! Response cache for model calls
//!
//! [`CacheStore`] is the key-value boundary (get / set / invalidate by
//! pattern). [`AnalysisCache`] layers TTL and stale-while-revalidate
//! semantics on top of any store.

pub mod analysis;
pub mod key;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use analysis::{AnalysisCache, CachePolicy, Cached};
pub use key::{analysis_cache_key, canonical_json};
pub use memory::InMemoryCacheStore;

/// Error types for cache backends
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Invalid cache pattern: {0}")]
    Pattern(String),
}

/// How usable a cached entry is at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Within its TTL
    Fresh,
    /// Past its TTL but inside the stale window
    Stale,
    /// Past both windows
    Expired,
}

/// A stored value with its lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    pub stored_at: DateTime<Utc>,
    pub ttl: Duration,
    /// Extra time after `ttl` during which the value may be served stale
    pub stale_ttl: Duration,
}

impl CacheEntry {
    pub fn new(value: serde_json::Value, ttl: Duration, stale_ttl: Duration) -> Self {
        Self {
            value,
            stored_at: Utc::now(),
            ttl,
            stale_ttl,
        }
    }

    /// Classify the entry relative to `now`
    pub fn freshness(&self, now: DateTime<Utc>) -> Freshness {
        let age_ms = now
            .signed_duration_since(self.stored_at)
            .num_milliseconds()
            .max(0) as u128;
        let ttl_ms = self.ttl.as_millis();
        let stale_ms = ttl_ms.saturating_add(self.stale_ttl.as_millis());

        if age_ms < ttl_ms {
            Freshness::Fresh
        } else if age_ms < stale_ms {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }
}

/// Key-value store backing the cache
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch an entry regardless of its freshness
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Insert or replace an entry
    async fn set(&self, key: &str, entry: CacheEntry) -> Result<(), CacheError>;

    /// Remove every key matching a glob pattern (`*` wildcard), returning how many were removed
    async fn invalidate(&self, pattern: &str) -> Result<usize, CacheError>;
}
