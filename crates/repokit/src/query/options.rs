//! Query options - specification, sorting, paging and fetching for one query

use std::fmt;

use super::fetch::FetchStrategy;
use super::specification::Specification;
use super::types::OrderDirection;
use crate::conventions::EntityMetadata;
use crate::error::{ModelError, ModelResult};

/// Page size used by `page(index)`
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub path: String,
    pub direction: OrderDirection,
}

/// 1-based page index and page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub index: usize,
    pub size: usize,
}

impl Paging {
    pub fn skip(&self) -> usize {
        self.index.saturating_sub(1).saturating_mul(self.size)
    }
}

pub struct QueryOptions<T> {
    pub(crate) specification: Option<Specification<T>>,
    pub(crate) sorting: Vec<SortKey>,
    pub(crate) paging: Option<Paging>,
    pub(crate) fetch: FetchStrategy<T>,
}

impl<T> QueryOptions<T> {
    pub fn new() -> Self {
        Self {
            specification: None,
            sorting: Vec::new(),
            paging: None,
            fetch: FetchStrategy::new(),
        }
    }

    /// Add a specification; several are AND-ed together
    pub fn satisfy_by(mut self, specification: Specification<T>) -> Self {
        self.specification = Some(match self.specification.take() {
            Some(existing) => existing.and(specification),
            None => specification,
        });
        self
    }

    pub fn specification(&self) -> Option<&Specification<T>> {
        self.specification.as_ref()
    }

    pub fn sorting(&self) -> &[SortKey] {
        &self.sorting
    }

    pub fn paging(&self) -> Option<Paging> {
        self.paging
    }

    pub fn fetch_strategy(&self) -> &FetchStrategy<T> {
        &self.fetch
    }

    /// Check paging bounds and that every referenced member exists
    pub fn validate(&self, metadata: &EntityMetadata) -> ModelResult<()> {
        if let Some(paging) = self.paging {
            if paging.index < 1 {
                return Err(ModelError::InvalidParameter(format!(
                    "page index must be at least 1, got {}",
                    paging.index
                )));
            }
            if paging.size < 1 {
                return Err(ModelError::InvalidParameter(format!(
                    "page size must be at least 1, got {}",
                    paging.size
                )));
            }
        }

        for key in &self.sorting {
            self.check_path(metadata, &key.path, "sort")?;
        }
        if let Some(spec) = &self.specification {
            for condition in spec.conditions() {
                self.check_path(metadata, &condition.column, "filter")?;
            }
        }
        Ok(())
    }

    fn check_path(&self, metadata: &EntityMetadata, path: &str, usage: &str) -> ModelResult<()> {
        let root = path.split('.').next().unwrap_or(path);
        if metadata.field(root).is_some() {
            return Ok(());
        }
        if metadata.navigation(root).is_some() {
            let fetched = self
                .fetch
                .paths()
                .iter()
                .any(|p| p.split('.').next() == Some(root));
            if fetched {
                return Ok(());
            }
            return Err(ModelError::Query(format!(
                "{} path '{}' goes through navigation '{}' which is not fetched",
                usage, path, root
            )));
        }
        Err(ModelError::Query(format!(
            "unknown {} path '{}' on '{}'",
            usage, path, metadata.type_name
        )))
    }

    /// Cache key text, `None` when the query cannot be cached
    pub fn fingerprint(&self) -> Option<String> {
        let filter = match &self.specification {
            Some(spec) => spec.fingerprint()?,
            None => "*".to_string(),
        };
        let sorting: Vec<String> = self
            .sorting
            .iter()
            .map(|k| format!("{} {}", k.path, k.direction))
            .collect();
        let paging = self
            .paging
            .map(|p| format!("{}x{}", p.index, p.size))
            .unwrap_or_else(|| "all".to_string());

        Some(format!(
            "where {} | order {} | page {} | fetch {}",
            filter,
            sorting.join(","),
            paging,
            self.fetch.paths().join(",")
        ))
    }
}

impl<T> Default for QueryOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for QueryOptions<T> {
    fn clone(&self) -> Self {
        Self {
            specification: self.specification.clone(),
            sorting: self.sorting.clone(),
            paging: self.paging,
            fetch: self.fetch.clone(),
        }
    }
}

impl<T> fmt::Debug for QueryOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("specification", &self.specification)
            .field("sorting", &self.sorting)
            .field("paging", &self.paging)
            .field("fetch", &self.fetch)
            .finish()
    }
}

impl<T> From<Specification<T>> for QueryOptions<T> {
    fn from(specification: Specification<T>) -> Self {
        QueryOptions::new().satisfy_by(specification)
    }
}
