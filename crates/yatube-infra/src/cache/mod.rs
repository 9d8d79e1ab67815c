//! Cache backends and the page-level response cache built on them.

mod memory;
mod response;

#[cfg(feature = "redis")]
mod redis;

pub use memory::{DEFAULT_MAX_ENTRIES, InMemoryCache};
pub use response::ResponseCache;

#[cfg(feature = "redis")]
pub use self::redis::{RedisCache, RedisConfig};
