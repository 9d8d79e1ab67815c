//! In-memory cache implementation - the default backend, and the fallback when Redis is unavailable.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use yatube_core::ports::{Cache, CacheError};

struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

/// Default upper bound on held entries.
pub const DEFAULT_MAX_ENTRIES: usize = 300;

/// Process-local cache using a HashMap behind an async RwLock.
///
/// Data is lost on process restart. When a new key would exceed
/// `max_entries`, expired entries are swept first; if the map is still full,
/// the third of entries closest to expiry is culled.
pub struct InMemoryCache {
    store: RwLock<HashMap<String, CacheEntry>>,
    max_entries: usize,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

fn make_room(store: &mut HashMap<String, CacheEntry>, max_entries: usize) {
    let now = Instant::now();
    store.retain(|_, entry| !entry.is_expired(now));
    if store.len() < max_entries {
        return;
    }

    // Entries without a TTL sort last and are culled only when nothing else is left.
    let mut by_expiry: Vec<(Option<Instant>, String)> = store
        .iter()
        .map(|(key, entry)| (entry.expires_at, key.clone()))
        .collect();
    by_expiry.sort_by_key(|(expires_at, _)| (expires_at.is_none(), *expires_at));

    let cull = (store.len() / 3).max(store.len() + 1 - max_entries);
    for (_, key) in by_expiry.into_iter().take(cull) {
        store.remove(&key);
    }
    tracing::debug!(culled = cull, held = store.len(), "In-memory cache culled");
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let store = self.store.read().await;
        let entry = store.get(key)?;

        if entry.is_expired(Instant::now()) {
            drop(store);
            self.store.write().await.remove(key);
            return None;
        }

        Some(entry.value.clone())
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut store = self.store.write().await;

        if !store.contains_key(key) && store.len() >= self.max_entries {
            make_room(&mut store, self.max_entries);
        }
        store.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.write().await.remove(key);
        Ok(())
    }
}
