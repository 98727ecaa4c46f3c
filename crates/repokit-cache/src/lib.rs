//! # repokit-cache
//!
//! Caching providers for repository query results.
//!
//! ## Features
//!
//! - **Provider trait**: `CacheProvider` is the seam repository contexts talk to
//! - **Memory provider**: TTL expiry and LRU eviction over a concurrent map
//! - **Typed access**: `Cache<B>` serializes values as JSON
//! - **Stable keys**: `CacheKey` hashes query fingerprints with blake3
//!
//! ## Quick Start
//!
//! ```rust
//! use repokit_cache::{Cache, CacheConfig, MemoryCacheProvider};
//! use std::time::Duration;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let cache = Cache::new(MemoryCacheProvider::new(CacheConfig::default()));
//!
//! cache.put("customers:count", &3usize, Duration::from_secs(60)).await.unwrap();
//! let count: Option<usize> = cache.get("customers:count").await.unwrap();
//! assert_eq!(count, Some(3));
//! # });
//! ```

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod backends;
pub mod config;
pub mod key;

pub use backends::*;
pub use config::*;
pub use key::*;

/// Cache operation errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Cache configuration error: {0}")]
    Configuration(String),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Storage seam for cached query results
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Get raw bytes stored under `key`
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store raw bytes under `key` with an optional TTL
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()>;

    /// Remove `key`, returning whether it was present
    async fn forget(&self, key: &str) -> CacheResult<bool>;

    /// Check if a live entry exists for `key`
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Remove every entry
    async fn flush(&self) -> CacheResult<()>;

    /// Provider statistics, if tracked
    async fn stats(&self) -> CacheResult<CacheStats> {
        Ok(CacheStats::default())
    }
}

#[async_trait]
impl<P> CacheProvider for Arc<P>
where
    P: CacheProvider + ?Sized,
{
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        (**self).put(key, value, ttl).await
    }

    async fn forget(&self, key: &str) -> CacheResult<bool> {
        (**self).forget(key).await
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        (**self).exists(key).await
    }

    async fn flush(&self) -> CacheResult<()> {
        (**self).flush().await
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        (**self).stats().await
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub total_keys: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

/// Typed cache interface over a provider
pub struct Cache<P: CacheProvider> {
    provider: P,
    default_ttl: Option<Duration>,
}

impl<P: CacheProvider> Cache<P> {
    /// Create a new cache over the given provider
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            default_ttl: None,
        }
    }

    /// Create a new cache whose `put_default` uses `ttl`
    pub fn with_default_ttl(provider: P, ttl: Duration) -> Self {
        Self {
            provider,
            default_ttl: Some(ttl),
        }
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Get a typed value
    pub async fn get<T>(&self, key: &str) -> CacheResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        match self.provider.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Put a typed value with an explicit TTL
    pub async fn put<T>(&self, key: &str, value: &T, ttl: Duration) -> CacheResult<()>
    where
        T: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec(value)?;
        self.provider.put(key, bytes, Some(ttl)).await
    }

    /// Put a typed value using the default TTL (no expiry when unset)
    pub async fn put_default<T>(&self, key: &str, value: &T) -> CacheResult<()>
    where
        T: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec(value)?;
        self.provider.put(key, bytes, self.default_ttl).await
    }

    pub async fn forget(&self, key: &str) -> CacheResult<bool> {
        self.provider.forget(key).await
    }

    pub async fn exists(&self, key: &str) -> CacheResult<bool> {
        self.provider.exists(key).await
    }

    pub async fn flush(&self) -> CacheResult<()> {
        self.provider.flush().await
    }

    /// Remember pattern: return the cached value or compute, store and return it
    pub async fn remember<T, F, Fut, E>(&self, key: &str, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: From<CacheError>,
    {
        if let Some(cached) = self.get(key).await? {
            tracing::trace!(key, "cache hit");
            return Ok(cached);
        }

        tracing::trace!(key, "cache miss");
        let value = compute().await?;
        self.put_default(key, &value).await?;
        Ok(value)
    }

    pub async fn stats(&self) -> CacheResult<CacheStats> {
        self.provider.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_typed_round_trip() {
        let cache = Cache::new(MemoryCacheProvider::new(CacheConfig::default()));

        cache
            .put("names", &vec!["ada", "grace"], Duration::from_secs(60))
            .await
            .unwrap();
        let names: Option<Vec<String>> = cache.get("names").await.unwrap();
        assert_eq!(names, Some(vec!["ada".to_string(), "grace".to_string()]));

        assert!(cache.forget("names").await.unwrap());
        let names: Option<Vec<String>> = cache.get("names").await.unwrap();
        assert_eq!(names, None);
    }

    #[tokio::test]
    async fn test_remember_computes_once() {
        let cache = Cache::with_default_ttl(
            MemoryCacheProvider::new(CacheConfig::default()),
            Duration::from_secs(60),
        );
        let calls = Arc::new(AtomicU32::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let value: usize = cache
                .remember("total", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, CacheError>(42)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_arc_dyn_provider() {
        let provider: Arc<dyn CacheProvider> =
            Arc::new(MemoryCacheProvider::new(CacheConfig::default()));
        let cache = Cache::new(provider.clone());

        cache.put_default("flag", &true).await.unwrap();
        assert!(provider.exists("flag").await.unwrap());
    }

    #[test]
    fn test_hit_ratio() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_ratio() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_ratio(), 0.0);
    }
}
