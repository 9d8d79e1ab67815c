//! Application state - shared across all handlers.

use std::sync::Arc;

use yatube_core::Paginator;
use yatube_core::ports::{
    Cache, CommentRepository, FollowRepository, GroupRepository, PasswordService, PostRepository,
    TokenService, UserRepository,
};
use yatube_infra::{
    Argon2PasswordService, InMemoryCache, InMemoryStore, JwtTokenService, ResponseCache,
};

#[cfg(feature = "postgres")]
use yatube_infra::database::{
    DatabaseConfig, DatabaseConnections, PostgresCommentRepository, PostgresFollowRepository,
    PostgresGroupRepository, PostgresPostRepository, PostgresUserRepository,
};
#[cfg(feature = "redis")]
use yatube_infra::{RedisCache, RedisConfig};

use crate::config::AppConfig;

/// The five entity repositories, behind their ports.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub follows: Arc<dyn FollowRepository>,
}

impl Repositories {
    pub fn in_memory(store: &InMemoryStore) -> Self {
        Self {
            users: Arc::new(store.users()),
            groups: Arc::new(store.groups()),
            posts: Arc::new(store.posts()),
            comments: Arc::new(store.comments()),
            follows: Arc::new(store.follows()),
        }
    }

    #[cfg(feature = "postgres")]
    fn postgres(connections: &DatabaseConnections) -> Self {
        let db = &connections.main;
        Self {
            users: Arc::new(PostgresUserRepository::new(db.clone())),
            groups: Arc::new(PostgresGroupRepository::new(db.clone())),
            posts: Arc::new(PostgresPostRepository::new(db.clone())),
            comments: Arc::new(PostgresCommentRepository::new(db.clone())),
            follows: Arc::new(PostgresFollowRepository::new(db.clone())),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub follows: Arc<dyn FollowRepository>,
    pub index_cache: ResponseCache,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    pub paginator: Paginator,
    #[cfg(feature = "postgres")]
    pub db: Option<Arc<DatabaseConnections>>,
}

impl AppState {
    /// Assemble state from already-built collaborators.
    pub fn from_parts(
        repos: Repositories,
        index_cache: ResponseCache,
        tokens: Arc<dyn TokenService>,
        passwords: Arc<dyn PasswordService>,
    ) -> Self {
        Self {
            users: repos.users,
            groups: repos.groups,
            posts: repos.posts,
            comments: repos.comments,
            follows: repos.follows,
            index_cache,
            tokens,
            passwords,
            paginator: Paginator::default(),
            #[cfg(feature = "postgres")]
            db: None,
        }
    }

    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        let cache_backend = build_cache_backend(config).await;
        let index_cache = ResponseCache::new(
            cache_backend,
            config.index_cache.namespace.clone(),
            config.index_cache.ttl,
        );
        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(config.jwt.clone()));
        let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());

        #[cfg(feature = "postgres")]
        let state = {
            let db = connect_database(config).await;
            let repos = match &db {
                Some(connections) => Repositories::postgres(connections),
                None => Repositories::in_memory(&InMemoryStore::new()),
            };
            let mut state = Self::from_parts(repos, index_cache, tokens, passwords);
            state.db = db;
            state
        };

        #[cfg(not(feature = "postgres"))]
        let state = {
            tracing::info!("Running without postgres feature - using in-memory entity store");
            Self::from_parts(
                Repositories::in_memory(&InMemoryStore::new()),
                index_cache,
                tokens,
                passwords,
            )
        };

        tracing::info!("Application state initialized");
        state
    }

    /// Which entity store backs this instance.
    pub fn store_kind(&self) -> &'static str {
        #[cfg(feature = "postgres")]
        if self.db.is_some() {
            return "postgres";
        }
        "memory"
    }

    /// Release external resources. Called once the server has stopped.
    pub async fn shutdown(self) {
        #[cfg(feature = "postgres")]
        if let Some(db) = self.db {
            match Arc::try_unwrap(db) {
                Ok(connections) => match connections.close().await {
                    Ok(()) => tracing::info!("Database pool closed"),
                    Err(e) => tracing::warn!(error = %e, "Failed to close database pool"),
                },
                Err(_) => tracing::warn!("Database pool still shared at shutdown; leaving it open"),
            }
        }
        tracing::info!("Application state released");
    }
}

#[cfg(feature = "postgres")]
async fn connect_database(config: &AppConfig) -> Option<Arc<DatabaseConnections>> {
    let Some(url) = config.database_url.clone() else {
        tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
        return None;
    };

    let db_config = DatabaseConfig {
        url,
        max_connections: config.db_max_connections,
        min_connections: config.db_min_connections,
    };

    let connections = match DatabaseConnections::init(&db_config).await {
        Ok(connections) => connections,
        Err(e) => {
            tracing::error!(
                "Failed to connect to database: {}. Using in-memory fallback.",
                e
            );
            return None;
        }
    };

    if config.run_migrations {
        use migration::MigratorTrait;

        if let Err(e) = migration::Migrator::up(&connections.main, None).await {
            tracing::error!(error = %e, "Schema migration failed");
        } else {
            tracing::info!("Schema migrations applied");
        }
    }

    Some(Arc::new(connections))
}

async fn build_cache_backend(config: &AppConfig) -> Arc<dyn Cache> {
    #[cfg(feature = "redis")]
    if let Some(url) = &config.redis_url {
        let redis_config = RedisConfig {
            url: url.clone(),
            ..RedisConfig::default()
        };
        match RedisCache::connect(&redis_config).await {
            Ok(cache) => return Arc::new(cache),
            Err(e) => {
                tracing::error!("Failed to connect to Redis: {}. Using in-memory cache.", e);
            }
        }
    }

    #[cfg(not(feature = "redis"))]
    if config.redis_url.is_some() {
        tracing::warn!("REDIS_URL set but the redis feature is disabled; using in-memory cache");
    }

    Arc::new(InMemoryCache::with_max_entries(config.index_cache.max_entries))
}
