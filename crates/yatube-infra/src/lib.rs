//! # Yatube Infrastructure
//!
//! Concrete implementations of the ports defined in `yatube-core`.
//! This crate contains the entity stores, cache backends and auth services.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - PostgreSQL entity store via SeaORM
//! - `auth` - JWT + Argon2 authentication
//! - `redis` - Redis cache backend

pub mod cache;
pub mod database;

#[cfg(feature = "auth")]
pub mod auth;

// Re-exports - In-Memory
pub use cache::{InMemoryCache, ResponseCache};
pub use database::InMemoryStore;

#[cfg(feature = "auth")]
pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};

// Re-exports - External backends
#[cfg(feature = "postgres")]
pub use database::DatabaseConnections;
#[cfg(feature = "redis")]
pub use cache::{RedisCache, RedisConfig};
