use async_trait::async_trait;
use std::time::Duration;

/// Key-value cache with per-entry TTL. Backends: in-memory or Redis.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get a live value. Expired entries read as `None`.
    async fn get(&self, key: &str) -> Option<String>;

    /// Set a value, expiring after `ttl` when given.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn exists(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }
}

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}
