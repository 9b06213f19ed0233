//! TTL cache with stale-while-revalidate

use crate::cache::{CacheEntry, CacheStore, Freshness};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Lifetime policy applied to a cached computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    /// How long a value is served as fresh
    pub ttl: Duration,

    /// Serve expired values while refreshing them in the background
    pub stale_while_revalidate: bool,

    /// How long after `ttl` a value may still be served stale
    pub stale_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(1800),
            stale_while_revalidate: true,
            stale_ttl: Duration::from_secs(3600),
        }
    }
}

/// A value together with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub served_from_cache: bool,
}

/// Read-through cache over a [`CacheStore`]
#[derive(Clone)]
pub struct AnalysisCache {
    store: Arc<dyn CacheStore>,
    refreshing: Arc<Mutex<HashSet<String>>>,
}

impl AnalysisCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            refreshing: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Return the cached value for `key`, computing and storing it on a miss
    ///
    /// A fresh entry is returned without calling `compute`. A stale entry
    /// (when the policy allows it) is returned immediately while `compute`
    /// refreshes it in a background task whose failures are only logged.
    /// Otherwise `compute` runs inline; its error is returned and nothing is
    /// stored.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        policy: &CachePolicy,
        compute: F,
    ) -> Result<Cached<T>, E>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        E: Display + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        if let Some(entry) = self.lookup(key).await {
            match entry.freshness(Utc::now()) {
                Freshness::Fresh => {
                    if let Some(value) = decode::<T>(key, entry.value) {
                        debug!("Cache hit for {}", key);
                        return Ok(Cached {
                            value,
                            served_from_cache: true,
                        });
                    }
                }
                Freshness::Stale if policy.stale_while_revalidate => {
                    if let Some(value) = decode::<T>(key, entry.value) {
                        debug!("Serving stale value for {} while revalidating", key);
                        self.spawn_refresh(key, policy.clone(), compute);
                        return Ok(Cached {
                            value,
                            served_from_cache: true,
                        });
                    }
                }
                _ => debug!("Cache entry for {} expired", key),
            }
        }

        let value = compute().await?;
        let encoded = encode(key, &value);
        if let Some(json) = encoded {
            write_entry(self.store.as_ref(), key, json, policy).await;
        }
        Ok(Cached {
            value,
            served_from_cache: false,
        })
    }

    /// Remove all keys matching a glob pattern
    pub async fn invalidate(&self, pattern: &str) -> usize {
        match self.store.invalidate(pattern).await {
            Ok(removed) => {
                debug!("Invalidated {} cache entries matching {}", removed, pattern);
                removed
            }
            Err(e) => {
                warn!("Cache invalidation for {} failed: {}", pattern, e);
                0
            }
        }
    }

    async fn lookup(&self, key: &str) -> Option<CacheEntry> {
        match self.store.get(key).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cache read for {} failed, treating as miss: {}", key, e);
                None
            }
        }
    }

    fn spawn_refresh<T, E, F, Fut>(&self, key: &str, policy: CachePolicy, compute: F)
    where
        T: Serialize + Send + 'static,
        E: Display + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        {
            let mut refreshing = self.refreshing.lock().unwrap_or_else(PoisonError::into_inner);
            if !refreshing.insert(key.to_string()) {
                debug!("Refresh for {} already in flight", key);
                return;
            }
        }

        let store = self.store.clone();
        let refreshing = self.refreshing.clone();
        let key = key.to_string();

        tokio::spawn(async move {
            match compute().await {
                Ok(value) => {
                    let encoded = encode(&key, &value);
                    drop(value);
                    if let Some(json) = encoded {
                        write_entry(store.as_ref(), &key, json, &policy).await;
                    }
                }
                Err(e) => warn!("Background refresh for {} failed: {}", key, e),
            }
            refreshing
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&key);
        });
    }
}

fn decode<T: DeserializeOwned>(key: &str, value: serde_json::Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!("Discarding undecodable cache entry {}: {}", key, e);
            None
        }
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Option<serde_json::Value> {
    match serde_json::to_value(value) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!("Could not serialize value for {}: {}", key, e);
            None
        }
    }
}

async fn write_entry(store: &dyn CacheStore, key: &str, json: serde_json::Value, policy: &CachePolicy) {
    let stale_ttl = if policy.stale_while_revalidate {
        policy.stale_ttl
    } else {
        Duration::ZERO
    };

    if let Err(e) = store.set(key, CacheEntry::new(json, policy.ttl, stale_ttl)).await {
        warn!("Cache write for {} failed: {}", key, e);
    }
}
