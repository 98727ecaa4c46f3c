//! Cache key construction
//!
//! Query fingerprints can be long, so keys are `prefix:scope:generation:digest`
//! where the digest is a blake3 hash of the fingerprint parts.

use std::fmt;

/// Builder for stable cache keys
#[derive(Debug, Clone)]
pub struct CacheKey {
    prefix: String,
    scope: String,
    generation: u64,
    hasher: blake3::Hasher,
}

impl CacheKey {
    pub fn new(prefix: &str, scope: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            scope: scope.to_string(),
            generation: 0,
            hasher: blake3::Hasher::new(),
        }
    }

    /// Key under which the generation counter of `scope` is stored
    pub fn generation_key(prefix: &str, scope: &str) -> String {
        format!("{}:{}:generation", prefix, scope)
    }

    pub fn generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Feed one fingerprint part; parts are length-prefixed so boundaries matter
    pub fn part(mut self, part: &str) -> Self {
        self.hasher.update(&(part.len() as u64).to_le_bytes());
        self.hasher.update(part.as_bytes());
        self
    }

    pub fn build(&self) -> String {
        let digest = self.hasher.finalize();
        format!(
            "{}:{}:{}:{}",
            self.prefix,
            self.scope,
            self.generation,
            hex::encode(&digest.as_bytes()[..16])
        )
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.build())
    }
}
