//! Query result caching
//!
//! Entries are keyed by entity set, a per-set generation and the query
//! fingerprint. Results that embed other sets through fetched navigations
//! also carry the generation of each of those sets. A commit bumps the
//! generation of every set it touched, which orphans the old entries; they
//! age out through the provider's TTL.

use repokit_cache::{Cache, CacheKey, CacheProvider};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::ModelResult;

pub struct QueryCache {
    cache: Cache<Arc<dyn CacheProvider>>,
    prefix: String,
    namespace: String,
}

impl QueryCache {
    /// `namespace` separates contexts sharing one provider, e.g. by store
    pub fn new(
        provider: Arc<dyn CacheProvider>,
        namespace: &str,
        expiration: Option<Duration>,
    ) -> Self {
        let cache = match expiration {
            Some(ttl) => Cache::with_default_ttl(provider, ttl),
            None => Cache::new(provider),
        };
        Self {
            cache,
            prefix: "repokit".to_string(),
            namespace: namespace.to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn expiration(&self) -> Option<Duration> {
        self.cache.default_ttl()
    }

    fn scope(&self, table: &str) -> String {
        format!("{}/{}", self.namespace, table)
    }

    fn now_nanos() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default()
    }

    /// Current generation of a set, created on first use
    async fn generation(&self, table: &str) -> ModelResult<u64> {
        let key = CacheKey::generation_key(&self.prefix, &self.scope(table));
        if let Some(generation) = self.cache.get::<u64>(&key).await? {
            return Ok(generation);
        }
        let generation = Self::now_nanos();
        self.cache.put_default(&key, &generation).await?;
        Ok(generation)
    }

    async fn entry_key(
        &self,
        table: &str,
        fetched: &[String],
        kind: &str,
        fingerprint: &str,
    ) -> ModelResult<String> {
        let generation = self.generation(table).await?;
        let mut key = CacheKey::new(&self.prefix, &self.scope(table)).generation(generation);
        for other in fetched {
            let generation = self.generation(other).await?;
            key = key.part(&format!("{}@{}", other, generation));
        }
        Ok(key.part(kind).part(fingerprint).build())
    }

    /// Cached result of a query on `table` whose fetch paths reach the
    /// `fetched` sets
    pub async fn get<R: DeserializeOwned>(
        &self,
        table: &str,
        fetched: &[String],
        kind: &str,
        fingerprint: &str,
    ) -> ModelResult<Option<R>> {
        let key = self.entry_key(table, fetched, kind, fingerprint).await?;
        let found: Option<R> = self.cache.get(&key).await?;
        tracing::trace!(%key, hit = found.is_some(), "query cache lookup");
        Ok(found)
    }

    pub async fn put<R: Serialize>(
        &self,
        table: &str,
        fetched: &[String],
        kind: &str,
        fingerprint: &str,
        value: &R,
    ) -> ModelResult<()> {
        let key = self.entry_key(table, fetched, kind, fingerprint).await?;
        self.cache.put_default(&key, value).await?;
        Ok(())
    }

    /// Make every cached result of the given sets unreachable
    pub async fn invalidate(&self, tables: &[String]) -> ModelResult<()> {
        for table in tables {
            let key = CacheKey::generation_key(&self.prefix, &self.scope(table));
            let previous = self.cache.get::<u64>(&key).await?.unwrap_or_default();
            let next = Self::now_nanos().max(previous.saturating_add(1));
            self.cache.put_default(&key, &next).await?;
            tracing::debug!(table = %table, generation = next, "invalidated cached queries");
        }
        Ok(())
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("prefix", &self.prefix)
            .field("namespace", &self.namespace)
            .field("expiration", &self.cache.default_ttl())
            .finish()
    }
}
