//! Query options paging and fetch operations

use super::fetch::FetchStrategy;
use super::options::{Paging, QueryOptions, DEFAULT_PAGE_SIZE};

impl<T> QueryOptions<T> {
    /// Page `index` (1-based) of `DEFAULT_PAGE_SIZE` entities
    pub fn page(self, index: usize) -> Self {
        self.page_with(index, DEFAULT_PAGE_SIZE)
    }

    /// Bounds are checked when the query runs
    pub fn page_with(mut self, index: usize, size: usize) -> Self {
        self.paging = Some(Paging { index, size });
        self
    }

    /// Eagerly load a navigation path
    pub fn fetch(mut self, path: &str) -> Self {
        self.fetch = self.fetch.include(path);
        self
    }

    /// Merge the paths of a prepared strategy
    pub fn with_fetch_strategy(mut self, strategy: FetchStrategy<T>) -> Self {
        for path in strategy.paths() {
            self.fetch = self.fetch.include(path);
        }
        self
    }
}
