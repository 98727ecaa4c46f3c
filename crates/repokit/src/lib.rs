//! # repokit: Repository pattern toolkit
//!
//! Provider-agnostic repositories, units of work and query options over
//! pluggable stores. Two store families ship with the crate:
//!
//! - an in-memory store whose named databases are shared process-wide
//! - flat-file stores persisting one file per table as JSON, XML or CSV
//!
//! Entities are plain serde structs; keys, columns and navigations follow
//! naming conventions that can be overridden through `Entity::schema`.
//! Query results can be cached through any `repokit_cache::CacheProvider`.

pub mod context;
pub mod conventions;
pub mod entity;
pub mod error;
pub mod factory;
pub mod interceptor;
pub mod logging;
pub mod options;
pub mod query;
pub mod repository;
pub mod store;
pub mod unit_of_work;

// Re-export core traits and types
pub use context::{EntityState, QueryCache, RepositoryContext, Transaction};
pub use conventions::{metadata_of, EntityMetadata};
pub use entity::{Entity, EntityKey, EntitySchema, FieldSchema, Generated, Navigation};
pub use error::{ModelError, ModelResult};
pub use factory::RepositoryFactory;
pub use interceptor::{AuditInterceptor, RepositoryInterceptor};
pub use logging::{init_logging, LoggingConfig};
pub use options::{RepositoryOptions, StoreOptions};
pub use query::{
    FetchStrategy, OrderDirection, PagedQueryResult, QueryOptions, Specification, WhereCondition,
};
pub use repository::{ReadOnlyRepository, Repository};
pub use store::{FileFormat, FileStore, MemoryStore, StoreBackend};
pub use unit_of_work::UnitOfWork;

pub use repokit_cache;
