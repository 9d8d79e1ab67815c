//! Redis cache backend, shared by every server process pointed at the same instance.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use yatube_core::ports::{Cache, CacheError};

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Redis-backed cache.
///
/// The connection manager reconnects on its own; read failures degrade to a miss.
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(config: &RedisConfig) -> Result<Self, CacheError> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| CacheError::Connection(e.to_string()))?;

        let conn = tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Connection("Connection timed out".to_string()))?
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        tracing::info!(url = %config.url, "Connected to Redis cache");

        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Redis GET failed");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();

        let result = match ttl {
            // PSETEX keeps sub-second TTLs exact.
            Some(duration) => {
                conn.pset_ex::<_, _, ()>(key, value, duration.as_millis().max(1) as u64)
                    .await
            }
            None => conn.set::<_, _, ()>(key, value).await,
        };

        result.map_err(|e| CacheError::Operation(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))
    }

    async fn exists(&self, key: &str) -> bool {
        let mut conn = self.conn.clone();
        conn.exists::<_, bool>(key).await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_cache() -> Option<RedisCache> {
        let config = RedisConfig {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6389".to_string()),
            connect_timeout: Duration::from_secs(1),
        };

        RedisCache::connect(&config).await.ok()
    }

    #[tokio::test]
    async fn test_redis_cache_set_get() {
        let Some(cache) = test_cache().await else {
            tracing::warn!("Redis not available, skipping test");
            return;
        };

        cache.set("yatube_test_key", "body", None).await.unwrap();
        assert_eq!(cache.get("yatube_test_key").await, Some("body".to_string()));

        cache.delete("yatube_test_key").await.unwrap();
        assert_eq!(cache.get("yatube_test_key").await, None);
    }

    #[tokio::test]
    async fn test_redis_cache_ttl() {
        let Some(cache) = test_cache().await else {
            return;
        };

        cache
            .set("yatube_ttl_key", "body", Some(Duration::from_millis(200)))
            .await
            .unwrap();
        assert!(cache.exists("yatube_ttl_key").await);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(cache.get("yatube_ttl_key").await, None);
    }
}
