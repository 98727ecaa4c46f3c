//! Error types for repository operations
//!
//! Every failure is surfaced to the caller of the failing operation; nothing
//! here is retried.

use repokit_cache::CacheError;
use thiserror::Error;

/// Result type alias for repository operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Error types for repository, context and store operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// No primary key could be resolved for the entity type
    #[error("Unable to resolve a primary key for '{0}'; annotate a key field or add an `id` field")]
    MissingPrimaryKey(String),

    /// Annotations or naming conventions are inconsistent
    #[error("Convention error: {0}")]
    Convention(String),

    /// Repository key type does not match the resolved primary key
    #[error("Key arity mismatch for '{entity}': repository key has {actual} part(s), entity key has {expected}")]
    KeyArity {
        entity: String,
        expected: usize,
        actual: usize,
    },

    /// Add with a key that already exists in the entity set
    #[error("An entity with key {key} already exists in '{table}'")]
    DuplicateKey { table: String, key: String },

    /// Update or delete of an entity that is not in the entity set
    #[error("No entity with key {key} found in '{table}'")]
    NotFound { table: String, key: String },

    /// Query options refer to something that cannot be evaluated
    #[error("Query error: {0}")]
    Query(String),

    /// Argument outside its allowed range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(String),

    /// Backing store rejected or failed an operation
    #[error("Store error: {0}")]
    Store(String),

    /// Operation not supported by the context's store
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Transaction state error
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// An interceptor aborted the operation
    #[error("Interceptor error: {0}")]
    Interceptor(String),

    /// Query cache failure
    #[error("Cache error: {0}")]
    Cache(String),

    /// Invalid repository options
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ModelError {
    pub fn not_found(table: &str, key: impl ToString) -> Self {
        ModelError::NotFound {
            table: table.to_string(),
            key: key.to_string(),
        }
    }

    pub fn duplicate_key(table: &str, key: impl ToString) -> Self {
        ModelError::DuplicateKey {
            table: table.to_string(),
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ModelError::NotFound { .. })
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        ModelError::Io(err.to_string())
    }
}

impl From<csv::Error> for ModelError {
    fn from(err: csv::Error) -> Self {
        ModelError::Serialization(format!("csv: {}", err))
    }
}

impl From<quick_xml::Error> for ModelError {
    fn from(err: quick_xml::Error) -> Self {
        ModelError::Serialization(format!("xml: {}", err))
    }
}

impl From<quick_xml::events::attributes::AttrError> for ModelError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        ModelError::Serialization(format!("xml attribute: {}", err))
    }
}

impl From<CacheError> for ModelError {
    fn from(err: CacheError) -> Self {
        ModelError::Cache(err.to_string())
    }
}

impl From<anyhow::Error> for ModelError {
    fn from(err: anyhow::Error) -> Self {
        ModelError::Interceptor(format!("{:#}", err))
    }
}
