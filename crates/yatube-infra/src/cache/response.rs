//! Whole-page response cache.
//!
//! Entries expire only by TTL. Writes to the entity store never invalidate
//! them, so a cached page can be stale for up to one TTL.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use yatube_core::ports::{Cache, CacheError};

/// Caches rendered page bodies under `<namespace>:<key>` for a fixed TTL.
#[derive(Clone)]
pub struct ResponseCache {
    backend: Arc<dyn Cache>,
    namespace: String,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(backend: Arc<dyn Cache>, namespace: impl Into<String>, ttl: Duration) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Return the cached body for `key`, or render, store and return a fresh one.
    ///
    /// A render error is returned as-is and nothing is stored. A failing
    /// backend write is logged and the fresh body is still served.
    pub async fn get_or_render<F, Fut, E>(&self, key: &str, render: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let full_key = self.full_key(key);

        if let Some(body) = self.backend.get(&full_key).await {
            tracing::debug!(key = %full_key, "Response cache hit");
            return Ok(body);
        }

        let body = render().await?;
        if let Err(e) = self.backend.set(&full_key, &body, Some(self.ttl)).await {
            tracing::warn!(key = %full_key, error = %e, "Failed to store cached response");
        } else {
            tracing::debug!(key = %full_key, ttl_secs = self.ttl.as_secs_f64(), "Response cached");
        }
        Ok(body)
    }

    /// Drop a cached page ahead of its expiry.
    pub async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.backend.delete(&self.full_key(key)).await
    }
}
