use std::{future::Future, hash::Hash, num::NonZeroUsize, sync::Arc};

use lru::LruCache;
use tokio::sync::Mutex;

pub const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(128) {
    Some(x) => x,
    None => panic!("capacity must not be zero"),
};

struct Inner<K: Hash + Eq, V> {
    entries: LruCache<K, Arc<V>>,
    /// Bumped by every invalidation. A fetch that started under an older
    /// generation must not store its result.
    generation: u64,
}

/// Bounded memo of lookups, least recently used entries evicted first.
pub struct SearchCache<K: Hash + Eq, V> {
    inner: Mutex<Inner<K, V>>,
}

impl<K: Hash + Eq, V> SearchCache<K, V> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        SearchCache {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                generation: 0,
            }),
        }
    }

    /// Cached value for `key`, or the result of `fetch`, which then gets
    /// cached. Errors are not cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, fetch: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let generation = {
            let mut inner = self.inner.lock().await;
            if let Some(hit) = inner.entries.get(&key) {
                return Ok(hit.clone());
            }
            inner.generation
        };

        // Not holding the lock here, so other lookups can go on meanwhile.
        let value = Arc::new(fetch().await?);

        let mut inner = self.inner.lock().await;
        if inner.generation == generation {
            inner.entries.put(key, value.clone());
        }
        Ok(value)
    }

    /// Forget everything.
    pub async fn invalidate_all(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
        inner.generation += 1;
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }
}

impl<K: Hash + Eq, V> Default for SearchCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
