//! In-memory cache provider with TTL expiry and LRU eviction

use crate::{CacheConfig, CacheProvider, CacheResult, CacheStats};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Entry in the memory cache
#[derive(Debug)]
struct CacheEntry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
    last_access: AtomicU64,
}

impl CacheEntry {
    fn new(data: Vec<u8>, ttl: Option<Duration>, tick: u64) -> Self {
        Self {
            data,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
            last_access: AtomicU64::new(tick),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |exp| Instant::now() >= exp)
    }

    fn touch(&self, tick: u64) -> Vec<u8> {
        self.last_access.store(tick, Ordering::Relaxed);
        self.data.clone()
    }
}

/// In-memory cache provider
pub struct MemoryCacheProvider {
    entries: DashMap<String, CacheEntry>,
    config: CacheConfig,
    clock: AtomicU64,
    stats: Mutex<CacheStats>,
}

impl MemoryCacheProvider {
    /// Create a new memory provider with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            clock: AtomicU64::new(0),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn remove_expired(&self) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_expired())
            .map(|entry| entry.key().clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
        }
        expired.len()
    }

    fn least_recently_used(&self) -> Option<String> {
        self.entries
            .iter()
            .min_by_key(|entry| entry.value().last_access.load(Ordering::Relaxed))
            .map(|entry| entry.key().clone())
    }

    /// Make room for one more entry
    fn evict_for_insert(&self) {
        let Some(max_entries) = *self.config.get_max_entries() else {
            return;
        };

        self.remove_expired();

        while self.entries.len() >= max_entries {
            let Some(key) = self.least_recently_used() else {
                break;
            };
            self.entries.remove(&key);
            self.stats.lock().evictions += 1;
            tracing::trace!(key = %key, "evicted cache entry");
        }
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let tick = self.tick();
        let lookup = self
            .entries
            .get(key)
            .map(|entry| (!entry.is_expired()).then(|| entry.touch(tick)));

        // The shard guard is released before removing an expired entry
        let found = match lookup {
            Some(Some(data)) => Some(data),
            Some(None) => {
                self.entries.remove(key);
                None
            }
            None => None,
        };

        let mut stats = self.stats.lock();
        if found.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        Ok(found)
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        if !self.entries.contains_key(key) {
            self.evict_for_insert();
        }

        let ttl = ttl.or(*self.config.get_default_ttl());
        let entry = CacheEntry::new(value, ttl, self.tick());
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn forget(&self, key: &str) -> CacheResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => return Ok(false),
        };

        if expired {
            self.entries.remove(key);
            return Ok(false);
        }
        Ok(true)
    }

    async fn flush(&self) -> CacheResult<()> {
        self.entries.clear();
        Ok(())
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let stats = self.stats.lock();
        Ok(CacheStats {
            total_keys: self.entries.len() as u64,
            ..stats.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_provider_basic_operations() {
        let provider = MemoryCacheProvider::new(CacheConfig::default());

        provider
            .put("test", b"value".to_vec(), Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert_eq!(provider.get("test").await.unwrap(), Some(b"value".to_vec()));
        assert!(provider.exists("test").await.unwrap());
        assert!(!provider.exists("missing").await.unwrap());

        assert!(provider.forget("test").await.unwrap());
        assert!(!provider.forget("test").await.unwrap());
        assert!(provider.is_empty());
    }

    #[tokio::test]
    async fn test_memory_provider_ttl() {
        let provider = MemoryCacheProvider::new(CacheConfig::default());

        provider
            .put("short", b"value".to_vec(), Some(Duration::from_millis(30)))
            .await
            .unwrap();
        assert!(provider.exists("short").await.unwrap());

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(!provider.exists("short").await.unwrap());
        assert_eq!(provider.get("short").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_provider_lru_eviction() {
        let config = CacheConfig::builder().max_entries_limit(2).build_config();
        let provider = MemoryCacheProvider::new(config);

        provider.put("key1", b"1".to_vec(), None).await.unwrap();
        provider.put("key2", b"2".to_vec(), None).await.unwrap();

        // key1 becomes the most recently used entry
        provider.get("key1").await.unwrap();

        provider.put("key3", b"3".to_vec(), None).await.unwrap();

        assert!(provider.exists("key1").await.unwrap());
        assert!(!provider.exists("key2").await.unwrap());
        assert!(provider.exists("key3").await.unwrap());
        assert_eq!(provider.stats().await.unwrap().evictions, 1);
    }

    #[tokio::test]
    async fn test_overwrite_does_not_evict() {
        let config = CacheConfig::builder().max_entries_limit(1).build_config();
        let provider = MemoryCacheProvider::new(config);

        provider.put("only", b"a".to_vec(), None).await.unwrap();
        provider.put("only", b"b".to_vec(), None).await.unwrap();

        assert_eq!(provider.get("only").await.unwrap(), Some(b"b".to_vec()));
        assert_eq!(provider.stats().await.unwrap().evictions, 0);
    }

    #[tokio::test]
    async fn test_memory_provider_stats() {
        let provider = MemoryCacheProvider::new(CacheConfig::default());

        provider.put("a", b"1".to_vec(), None).await.unwrap();
        provider.get("a").await.unwrap();
        provider.get("b").await.unwrap();

        let stats = provider.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_keys, 1);

        provider.flush().await.unwrap();
        assert_eq!(provider.stats().await.unwrap().total_keys, 0);
    }
}
