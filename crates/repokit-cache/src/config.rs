//! Cache configuration and builder

use serde::{Deserialize, Serialize};
use service_builder::builder;
use std::time::Duration;

/// Configuration for cache providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[builder]
pub struct CacheConfig {
    /// TTL applied when callers do not pass one
    #[builder(getter, default = "Some(Duration::from_secs(3600))")]
    pub default_ttl: Option<Duration>,

    /// Maximum number of live entries (memory provider)
    #[builder(getter, default = "Some(10_000)")]
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Some(Duration::from_secs(3600)),
            max_entries: Some(10_000),
        }
    }
}

// Convenience methods on the generated builder
impl CacheConfigBuilder {
    pub fn default_ttl_duration(self, ttl: Duration) -> Self {
        self.default_ttl(Some(ttl))
    }

    pub fn no_default_ttl(self) -> Self {
        self.default_ttl(None)
    }

    pub fn max_entries_limit(self, max: usize) -> Self {
        self.max_entries(Some(max))
    }

    pub fn unlimited_entries(self) -> Self {
        self.max_entries(None)
    }

    /// Every field has a default, so building cannot fail
    pub fn build_config(self) -> CacheConfig {
        self.build_with_defaults().unwrap_or_default()
    }
}
