//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use yatube_infra::JwtConfig;
use yatube_infra::cache::DEFAULT_MAX_ENTRIES;

use crate::telemetry::TelemetryConfig;

/// Index page cache settings.
#[derive(Debug, Clone)]
pub struct IndexCacheConfig {
    pub namespace: String,
    pub ttl: Duration,
    /// Entry cap for the in-memory backend.
    pub max_entries: usize,
}

impl Default for IndexCacheConfig {
    fn default() -> Self {
        Self {
            namespace: "index_page".to_string(),
            ttl: Duration::from_secs(20),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub run_migrations: bool,
    pub redis_url: Option<String>,
    pub index_cache: IndexCacheConfig,
    pub jwt: JwtConfig,
    pub telemetry: TelemetryConfig,
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let index_defaults = IndexCacheConfig::default();
        let jwt_defaults = JwtConfig::default();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parsed("PORT", 8080),
            database_url: env::var("DATABASE_URL").ok(),
            db_max_connections: parsed("DB_MAX_CONNECTIONS", 20),
            db_min_connections: parsed("DB_MIN_CONNECTIONS", 2),
            run_migrations: flag("RUN_MIGRATIONS", false),
            redis_url: env::var("REDIS_URL").ok(),
            index_cache: IndexCacheConfig {
                namespace: env::var("INDEX_CACHE_NAMESPACE")
                    .unwrap_or(index_defaults.namespace),
                ttl: Duration::from_secs(parsed(
                    "INDEX_CACHE_TTL_SECS",
                    index_defaults.ttl.as_secs(),
                )),
                max_entries: parsed("INDEX_CACHE_MAX_ENTRIES", index_defaults.max_entries),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").unwrap_or(jwt_defaults.secret),
                expiration_hours: parsed("JWT_EXPIRATION_HOURS", jwt_defaults.expiration_hours),
                issuer: env::var("JWT_ISSUER").unwrap_or(jwt_defaults.issuer),
            },
            telemetry: TelemetryConfig::from_env(),
        }
    }
}
