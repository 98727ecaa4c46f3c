//! Fetch strategies - related entities loaded together with a query

use std::fmt;
use std::marker::PhantomData;

/// Navigation paths to resolve, e.g. `orders` or `orders.lines`
pub struct FetchStrategy<T> {
    paths: Vec<String>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> FetchStrategy<T> {
    pub fn new() -> Self {
        Self {
            paths: Vec::new(),
            _entity: PhantomData,
        }
    }

    /// Add a dotted navigation path; duplicates are ignored
    pub fn include(mut self, path: &str) -> Self {
        if !self.paths.iter().any(|p| p == path) {
            self.paths.push(path.to_string());
        }
        self
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<T> Default for FetchStrategy<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for FetchStrategy<T> {
    fn clone(&self) -> Self {
        Self {
            paths: self.paths.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for FetchStrategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchStrategy").field("paths", &self.paths).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_deduplicates() {
        let strategy = FetchStrategy::<()>::new()
            .include("orders")
            .include("orders.lines")
            .include("orders");
        assert_eq!(strategy.paths(), &["orders".to_string(), "orders.lines".to_string()]);
        assert!(!strategy.is_empty());
    }
}
