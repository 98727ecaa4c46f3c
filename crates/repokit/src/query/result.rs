//! Paged query results

use serde::{Deserialize, Serialize};

/// Query result together with the number of matches before paging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedQueryResult<R> {
    pub result: R,
    pub total: usize,
}

impl<R> PagedQueryResult<R> {
    pub fn new(result: R, total: usize) -> Self {
        Self { result, total }
    }

    pub fn map<U, F: FnOnce(R) -> U>(self, f: F) -> PagedQueryResult<U> {
        PagedQueryResult {
            result: f(self.result),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_keeps_total() {
        let page = PagedQueryResult::new(vec![1, 2, 3], 10);
        let mapped = page.map(|items| items.len());
        assert_eq!(mapped, PagedQueryResult::new(3, 10));
    }
}
