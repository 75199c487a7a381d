//! In-process cache backed by `DashMap`.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use crate::cache::{CacheResult, CacheStore};
use crate::observability::metrics;
use crate::queries::Maybe;

/// A cached payload and its expiry instant.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Value,
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    /// Check if the entry is past its expiry.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// A thread-safe in-memory cache.
///
/// Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    inner: Arc<DashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.inner.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.inner.len(), "Purged expired cache entries");
        }
        metrics::record_cache_size(self.inner.len());
        removed
    }

    /// Periodically purge expired entries until shutdown is signalled.
    pub async fn run_sweeper(self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?interval, "Cache sweeper starting");
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.purge_expired();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cache sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Maybe<Value>> {
        let now = Instant::now();
        let expired = match self.inner.get(key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Maybe::some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };

        // The read guard is released above; removing here cannot deadlock.
        if expired {
            self.inner.remove_if(key, |_, entry| entry.is_expired(now));
        }
        Ok(Maybe::none())
    }

    async fn add(&self, key: &str, value: Value, expiry: Option<Duration>) -> CacheResult<()> {
        tracing::debug!(key = %key, expiry = ?expiry, "Inserting item into cache");
        let entry = CacheEntry {
            value,
            expires_at: expiry.map(|ttl| Instant::now() + ttl),
        };
        self.inner.insert(key.to_string(), entry);
        metrics::record_cache_size(self.inner.len());
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        tracing::debug!(key = %key, "Removing item from cache");
        self.inner.remove(key);
        metrics::record_cache_size(self.inner.len());
        Ok(())
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
