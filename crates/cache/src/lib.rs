//! Bounded in-memory TTL cache with thread-safe async access.
//!
//! Backs the address-suggestion collaborator: repeated prefix lookups
//! within the TTL hit the cache instead of the external API. Entries
//! expire after the configured TTL; when the cache is full, the oldest
//! entry is evicted first.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Thread-safe bounded TTL cache.
#[derive(Clone)]
pub struct TtlCache<K, V> {
    inner: Arc<RwLock<HashMap<K, Entry<V>>>>,
    capacity: usize,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache holding at most `capacity` entries, each
    /// fresh for `ttl`.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            capacity,
            ttl,
        }
    }

    /// Get a cloned value by key; expired entries read as absent.
    pub async fn get(&self, key: &K) -> Option<V> {
        let map = self.inner.read().await;
        let entry = map.get(key)?;
        if entry.inserted_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Insert or refresh a value. Expired entries are purged on every
    /// insert; if the cache is still full afterwards, the oldest entry is
    /// evicted.
    pub async fn insert(&self, key: K, value: V) {
        let mut map = self.inner.write().await;

        let ttl = self.ttl;
        map.retain(|_, entry| entry.inserted_at.elapsed() < ttl);

        if map.len() >= self.capacity && !map.contains_key(&key) {
            let oldest = map
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                map.remove(&oldest);
            }
        }

        map.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Number of live (possibly expired, not yet purged) entries.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
