//! TTL response cache for the browser automation API.
//!
//! GET responses are cached for a short per-endpoint TTL so status polling
//! and repeated environment lookups do not hammer the local automation tool.
//! The cache is an owned component with an explicit cleanup lifecycle: a
//! periodic sweep task is started with [`ResponseCache::start_cleanup`] and
//! stopped through the returned token (or [`ResponseCache::shutdown`]).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::{interval, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::CACHE_CLEANUP_INTERVAL;

struct CacheEntry {
    value: serde_json::Value,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }
}

/// TTL cache keyed by `method + endpoint + params`.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    shutdown: CancellationToken,
}

impl ResponseCache {
    pub fn new() -> Self {
        ResponseCache {
            entries: Arc::new(RwLock::new(HashMap::new())),
            shutdown: CancellationToken::new(),
        }
    }

    /// Looks up a cached value, dropping it if its TTL has elapsed.
    pub async fn get(&self, key: &str) -> Option<serde_json::Value> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: remove under the write lock.
        self.entries.write().await.remove(key);
        None
    }

    /// Stores a value with the given TTL.
    pub async fn insert(&self, key: &str, value: serde_json::Value, ttl: Duration) {
        self.entries.write().await.insert(
            key.to_string(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Removes every entry whose key starts with `prefix`.
    ///
    /// Mutating calls use this to invalidate the read paths they affect
    /// (e.g. deleting an environment invalidates the environment list).
    pub async fn invalidate_prefix(&self, prefix: &str) {
        self.entries
            .write()
            .await
            .retain(|key, _| !key.starts_with(prefix));
    }

    /// Drops every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of live entries (expired entries still pending a sweep count).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Starts the periodic sweep of expired entries.
    ///
    /// Returns a child token that stops just this sweep task; the whole cache
    /// can also be stopped via [`ResponseCache::shutdown`].
    pub fn start_cleanup(&self, sweep_interval: Option<Duration>) -> CancellationToken {
        let entries = Arc::clone(&self.entries);
        let token = self.shutdown.child_token();
        let task_token = token.clone();
        let period = sweep_interval.unwrap_or(CACHE_CLEANUP_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let mut entries = entries.write().await;
                        let before = entries.len();
                        entries.retain(|_, entry| !entry.is_expired());
                        let swept = before - entries.len();
                        if swept > 0 {
                            log::debug!("Response cache sweep removed {swept} expired entries");
                        }
                    }
                    _ = task_token.cancelled() => break,
                }
            }
        });

        token
    }

    /// Stops the sweep task(s) started from this cache.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}
