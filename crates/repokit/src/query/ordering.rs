//! Query options ORDER BY operations

use super::options::{QueryOptions, SortKey};
use super::types::OrderDirection;

impl<T> QueryOptions<T> {
    /// Sort ascending; later keys break ties of earlier ones
    pub fn order_by(mut self, path: &str) -> Self {
        self.sorting.push(SortKey {
            path: path.to_string(),
            direction: OrderDirection::Asc,
        });
        self
    }

    /// Sort descending
    pub fn order_by_desc(mut self, path: &str) -> Self {
        self.sorting.push(SortKey {
            path: path.to_string(),
            direction: OrderDirection::Desc,
        });
        self
    }
}
