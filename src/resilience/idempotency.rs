//! # Idempotency Cache
//!
//! Bounded, TTL-evicting map from an idempotency key to the result a
//! side-effecting call already returned. A retried dispatch with the same
//! key gets the cached result instead of triggering duplicate production
//! work at the automation system.
//!
//! Eviction is owned by Moka (capacity + time-to-live), so correctness never
//! depends on a background cleanup timer.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Prefix shared by every generated key
pub const KEY_PREFIX: &str = "idempotency:";

/// Derive a stable key from a JSON-serializable payload.
///
/// Object keys are emitted in sorted order, so two payloads that differ only
/// in field order map to the same key.
pub fn generate_key<T: Serialize>(payload: &T) -> String {
    let canonical = serde_json::to_value(payload)
        .and_then(|value| serde_json::to_vec(&value))
        .unwrap_or_default();
    let digest = Sha256::digest(&canonical);
    format!("{KEY_PREFIX}{}", hex::encode(digest))
}

/// Whether a result came from the cache or from a fresh call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cached<V> {
    Hit(V),
    Fresh(V),
}

impl<V> Cached<V> {
    pub fn into_inner(self) -> V {
        match self {
            Cached::Hit(v) | Cached::Fresh(v) => v,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Cached::Hit(_))
    }
}

#[derive(Clone)]
pub struct IdempotencyCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    cache: moka::future::Cache<String, V>,
    ttl: Duration,
}

impl<V> std::fmt::Debug for IdempotencyCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdempotencyCache")
            .field("max_capacity", &self.cache.policy().max_capacity())
            .field("entry_count", &self.cache.entry_count())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl<V> IdempotencyCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let cache = moka::future::Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        debug!(
            max_capacity = max_capacity,
            ttl_seconds = ttl.as_secs(),
            "Idempotency cache created"
        );

        Self { cache, ttl }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: &str, value: V) {
        self.cache.insert(key.to_string(), value).await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    /// Return the cached value for `key`, or run `operation` and cache its
    /// success. Concurrent callers with the same key share one run of
    /// `operation`; the waiters see its result as a hit. Failures are not
    /// cached, so the next attempt runs again, and they come back shared
    /// because every waiter receives the same error.
    pub async fn get_or_execute<F, Fut, E>(
        &self,
        key: &str,
        operation: F,
    ) -> Result<Cached<V>, Arc<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Send + Sync + 'static,
    {
        let entry = self
            .cache
            .entry_by_ref(key)
            .or_try_insert_with(operation())
            .await?;

        if entry.is_fresh() {
            debug!(key = key, "Idempotency cache stored fresh result");
            Ok(Cached::Fresh(entry.into_value()))
        } else {
            debug!(key = key, "Idempotency cache HIT");
            Ok(Cached::Hit(entry.into_value()))
        }
    }

    /// Flush pending evictions; entry counts are eventually consistent otherwise
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}
