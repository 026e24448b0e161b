//! Read-through cache over a pluggable key/value backend.
//!
//! [`CacheBackend`] is the transport seam: [`MemoryCache`] for single-node
//! runs and tests, [`RedisCache`] for shared deployments. [`Cache`] wraps a
//! backend with JSON (de)serialization, a default TTL and pass-through
//! degradation: a failing backend behaves like an empty cache and the
//! failure is logged, never returned.

pub mod memory;
pub mod redis;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use estate_core::types::DbId;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use memory::MemoryCache;
pub use self::redis::RedisCache;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Raw string key/value transport with per-entry expiry.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Delete every key matching a glob (`*` and `?`). Returns the number of
    /// keys removed.
    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;
}

/// Cache key builders.
pub mod keys {
    use estate_core::types::DbId;

    pub const FEATURED_PATTERN: &str = "listings:featured:*";

    pub fn detail_by_id(id: DbId) -> String {
        format!("listing:detail:{id}")
    }

    pub fn detail_by_slug(slug: &str) -> String {
        format!("listing:detail:{slug}")
    }

    /// `digest` is the SHA-256 hex of the canonical search parameters.
    pub fn search(digest: &str) -> String {
        format!("listings:search:{digest}")
    }

    pub fn featured(limit: i64) -> String {
        format!("listings:featured:{limit}")
    }
}

/// Typed, failure-tolerant view over a [`CacheBackend`].
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl Cache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    /// A miss, a transport error and an undecodable payload all yield `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, key, "Cache read failed, passing through");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, key, "Discarding undecodable cache entry");
                self.delete(key).await;
                None
            }
        }
    }

    /// Store `value` for `ttl`, or for the default lifetime when `None`.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, key, "Cache payload could not be serialized");
                return;
            }
        };
        let ttl = ttl.unwrap_or(self.ttl);
        if let Err(e) = self.backend.set(key, payload, ttl).await {
            tracing::warn!(error = %e, key, "Cache write failed");
        }
    }

    pub async fn delete(&self, key: &str) {
        if let Err(e) = self.backend.delete(key).await {
            tracing::warn!(error = %e, key, "Cache delete failed");
        }
    }

    pub async fn delete_pattern(&self, pattern: &str) {
        match self.backend.delete_pattern(pattern).await {
            Ok(removed) => tracing::debug!(pattern, removed, "Cache pattern invalidated"),
            Err(e) => tracing::warn!(error = %e, pattern, "Cache pattern delete failed"),
        }
    }

    /// Return the cached value for `key`, or run `loader`, store its result
    /// for `ttl` (default lifetime when `None`) and return it. Loader errors
    /// are returned and not cached.
    ///
    /// Concurrent misses on the same key each run the loader.
    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        loader: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(key).await {
            tracing::trace!(key, "Cache hit");
            return Ok(hit);
        }
        let value = loader().await?;
        self.set(key, &value, ttl).await;
        Ok(value)
    }

    /// Drop the detail entries of a listing under its id and every slug it
    /// has been reachable by.
    pub async fn invalidate_listing(&self, id: DbId, slugs: &[&str]) {
        self.delete(&keys::detail_by_id(id)).await;
        for slug in slugs {
            self.delete(&keys::detail_by_slug(slug)).await;
        }
    }

    pub async fn is_healthy(&self) -> bool {
        match self.backend.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Cache health check failed");
                false
            }
        }
    }
}
