//! In-process cache backend.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use tracing::warn;

use super::config::CacheConfig;
use super::{CacheError, CacheStore};

struct Entry {
    value: Bytes,
    expires_at: Instant,
}

/// LRU cache with per-entry expiry, local to this process.
pub struct MemoryCacheStore {
    entries: Mutex<LruCache<String, Entry>>,
}

impl MemoryCacheStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(config.memory_capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recovers the guard if a previous holder panicked.
    fn entries(&self, op: &'static str) -> MutexGuard<'_, LruCache<String, Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!(op, "memory cache lock was poisoned; continuing");
            poisoned.into_inner()
        })
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut entries = self.entries("get");
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| CacheError::backend("ttl is out of range"))?;
        self.entries("set").put(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries("remove").pop(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;

    fn store(capacity: usize) -> MemoryCacheStore {
        MemoryCacheStore::new(&CacheConfig {
            memory_capacity: NonZeroUsize::new(capacity).expect("non-zero"),
            ..CacheConfig::default()
        })
    }

    #[tokio::test]
    async fn stores_and_removes_values() {
        let store = store(4);
        store
            .set("audio:1", Bytes::from_static(b"one"), Duration::from_secs(60))
            .await
            .expect("set");
        assert_eq!(
            store.get("audio:1").await.expect("get"),
            Some(Bytes::from_static(b"one"))
        );

        store.remove("audio:1").await.expect("remove");
        assert_eq!(store.get("audio:1").await.expect("get"), None);
    }

    #[tokio::test]
    async fn expired_entries_are_dropped_on_read() {
        let store = store(4);
        store
            .set("audio:1", Bytes::from_static(b"one"), Duration::ZERO)
            .await
            .expect("set");
        assert_eq!(store.get("audio:1").await.expect("get"), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn unrepresentable_ttl_is_an_error() {
        let store = store(4);
        let err = store
            .set("audio:1", Bytes::from_static(b"one"), Duration::MAX)
            .await
            .expect_err("ttl overflow");
        assert!(matches!(err, CacheError::Backend(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn least_recently_used_entry_is_evicted() {
        let store = store(2);
        let ttl = Duration::from_secs(60);
        store.set("a", Bytes::from_static(b"a"), ttl).await.expect("set");
        store.set("b", Bytes::from_static(b"b"), ttl).await.expect("set");
        store.get("a").await.expect("touch a");
        store.set("c", Bytes::from_static(b"c"), ttl).await.expect("set");

        assert!(store.get("b").await.expect("get").is_none());
        assert!(store.get("a").await.expect("get").is_some());
        assert_eq!(store.len(), 2);
    }
}
