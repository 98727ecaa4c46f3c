//! Query Options
//!
//! `QueryOptions<T>` bundles everything a query can ask for: a
//! `Specification<T>` filter, sort keys, paging and a fetch strategy. The
//! builder is split across files the way its concerns are:
//!
//! - `where_clause`: field-condition shortcuts
//! - `ordering`: sort keys
//! - `pagination`: paging and fetch paths

pub mod fetch;
pub mod options;
pub mod result;
pub mod specification;
pub mod types;

mod ordering;
mod pagination;
mod where_clause;

pub use fetch::FetchStrategy;
pub use options::{Paging, QueryOptions, SortKey, DEFAULT_PAGE_SIZE};
pub use result::PagedQueryResult;
pub use specification::Specification;
pub use types::{
    compare_values, lookup_path, values_equal, OrderDirection, QueryOperator, WhereCondition,
};
