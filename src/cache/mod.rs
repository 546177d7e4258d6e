//! Cache-aside access around single-entity reads.
//!
//! A read goes through [`CacheAside::fetch_optional`]: on a hit the stored
//! JSON is decoded and returned; on a miss the loader runs and its result is
//! stored with the configured TTL. Mutations call [`CacheAside::remove`] with
//! the same [`CacheKey`] the read path uses. There is no dependency tracking.
//!
//! Cache failures never fail a request: they are logged and counted, the
//! loader runs, and the write-back is skipped.

mod config;
mod keys;
mod store;

pub use config::{CacheBackend, CacheConfig};
pub use keys::CacheKey;
pub use store::MemoryCacheStore;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Backend(String),
    #[error("cached payload could not be decoded: {0}")]
    Codec(String),
}

impl CacheError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Byte-oriented key/value backend.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError>;
    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}

#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    enabled: bool,
}

impl CacheAside {
    pub fn new(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            ttl: config.ttl,
            enabled: config.enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Return the cached value for `key`, or load and cache it.
    pub async fn fetch<T, E, F, Fut>(&self, key: &CacheKey, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.lookup(key).await {
            return Ok(value);
        }
        let value = loader().await?;
        self.populate(key, &value).await;
        Ok(value)
    }

    /// Like [`CacheAside::fetch`], but `None` results are not cached.
    pub async fn fetch_optional<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        loader: F,
    ) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        if let Some(value) = self.lookup(key).await {
            return Ok(Some(value));
        }
        let value = loader().await?;
        if let Some(value) = value.as_ref() {
            self.populate(key, value).await;
        }
        Ok(value)
    }

    /// Drop the entry for `key`; the next read recomputes it.
    pub async fn remove(&self, key: &CacheKey) {
        if !self.enabled {
            return;
        }
        let rendered = key.to_string();
        match self.store.remove(&rendered).await {
            Ok(()) => debug!(key = %rendered, "cache entry invalidated"),
            Err(err) => {
                counter!("audiochan_cache_error_total", "scope" => key.scope(), "op" => "remove")
                    .increment(1);
                warn!(key = %rendered, error = %err, "failed to invalidate cache entry");
            }
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        if !self.enabled {
            return None;
        }
        let rendered = key.to_string();
        let bytes = match self.store.get(&rendered).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                counter!("audiochan_cache_miss_total", "scope" => key.scope()).increment(1);
                return None;
            }
            Err(err) => {
                counter!("audiochan_cache_error_total", "scope" => key.scope(), "op" => "get")
                    .increment(1);
                warn!(key = %rendered, error = %err, "cache read failed, loading from source");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                counter!("audiochan_cache_hit_total", "scope" => key.scope()).increment(1);
                Some(value)
            }
            Err(err) => {
                let err = CacheError::Codec(err.to_string());
                counter!("audiochan_cache_error_total", "scope" => key.scope(), "op" => "decode")
                    .increment(1);
                warn!(key = %rendered, error = %err, "discarding undecodable cache entry");
                None
            }
        }
    }

    async fn populate<T: Serialize>(&self, key: &CacheKey, value: &T) {
        if !self.enabled {
            return;
        }
        let rendered = key.to_string();
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => Bytes::from(bytes),
            Err(err) => {
                warn!(key = %rendered, error = %err, "value could not be encoded for caching");
                return;
            }
        };
        if let Err(err) = self.store.set(&rendered, bytes, self.ttl).await {
            counter!("audiochan_cache_error_total", "scope" => key.scope(), "op" => "set")
                .increment(1);
            warn!(key = %rendered, error = %err, "cache write failed, skipping");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Track {
        id: i64,
        title: String,
    }

    struct FailingStore;

    #[async_trait]
    impl CacheStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
            Err(CacheError::backend("connection refused"))
        }

        async fn set(&self, _key: &str, _value: Bytes, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::backend("connection refused"))
        }

        async fn remove(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::backend("connection refused"))
        }
    }

    fn memory_cache() -> (CacheAside, Arc<MemoryCacheStore>) {
        let config = CacheConfig::default();
        let store = Arc::new(MemoryCacheStore::new(&config));
        (CacheAside::new(store.clone(), &config), store)
    }

    fn track() -> Track {
        Track {
            id: 1,
            title: "Intro".into(),
        }
    }

    async fn load(calls: &AtomicUsize) -> Result<Option<Track>, std::convert::Infallible> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(track()))
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let (cache, _) = memory_cache();
        let calls = AtomicUsize::new(0);
        let key = CacheKey::Audio(1);

        let first = cache.fetch_optional(&key, || load(&calls)).await.unwrap();
        let second = cache.fetch_optional(&key, || load(&calls)).await.unwrap();

        assert_eq!(first, Some(track()));
        assert_eq!(second, Some(track()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn remove_forces_reload() {
        let (cache, _) = memory_cache();
        let calls = AtomicUsize::new(0);
        let key = CacheKey::Audio(1);

        cache.fetch_optional(&key, || load(&calls)).await.unwrap();
        cache.remove(&key).await;
        cache.fetch_optional(&key, || load(&calls)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_values_are_not_cached() {
        let (cache, store) = memory_cache();
        let result: Result<Option<Track>, std::convert::Infallible> = cache
            .fetch_optional(&CacheKey::Audio(9), || async { Ok(None) })
            .await;
        assert_eq!(result.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn loader_errors_propagate_and_are_not_cached() {
        let (cache, store) = memory_cache();
        let result: Result<Track, &str> = cache
            .fetch(&CacheKey::Audio(2), || async { Err("database down") })
            .await;
        assert_eq!(result.unwrap_err(), "database down");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn backend_failures_fall_through_to_loader() {
        let cache = CacheAside::new(Arc::new(FailingStore), &CacheConfig::default());
        let calls = AtomicUsize::new(0);
        let key = CacheKey::Audio(1);

        let first = cache.fetch_optional(&key, || load(&calls)).await.unwrap();
        let second = cache.fetch_optional(&key, || load(&calls)).await.unwrap();
        cache.remove(&key).await;

        assert_eq!(first, Some(track()));
        assert_eq!(second, Some(track()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn corrupt_entries_are_treated_as_misses() {
        let (cache, store) = memory_cache();
        store
            .set("audio:1", Bytes::from_static(b"not json"), Duration::from_secs(60))
            .await
            .unwrap();
        let calls = AtomicUsize::new(0);

        let value = cache
            .fetch_optional(&CacheKey::Audio(1), || load(&calls))
            .await
            .unwrap();

        assert_eq!(value, Some(track()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disabled_cache_always_loads() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let store = Arc::new(MemoryCacheStore::new(&config));
        let cache = CacheAside::new(store.clone(), &config);
        let calls = AtomicUsize::new(0);

        cache.fetch_optional(&CacheKey::Audio(1), || load(&calls)).await.unwrap();
        cache.fetch_optional(&CacheKey::Audio(1), || load(&calls)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(store.is_empty());
    }
}
