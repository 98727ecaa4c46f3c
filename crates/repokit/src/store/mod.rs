//! Store backends
//!
//! A store holds whole entity sets. Contexts load a set, work on it in memory
//! and hand every touched set back in one `persist` call; nothing finer
//! grained is offered.

pub mod file;
pub mod formats;
pub mod memory;

pub use file::FileStore;
pub use formats::FileFormat;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::conventions::EntityMetadata;
use crate::error::ModelResult;

/// Rows of one entity set, keyed by column name
#[derive(Debug, Clone)]
pub struct EntitySet {
    pub metadata: Arc<EntityMetadata>,
    pub rows: Vec<Value>,
}

impl EntitySet {
    pub fn new(metadata: Arc<EntityMetadata>, rows: Vec<Value>) -> Self {
        Self { metadata, rows }
    }

    pub fn table(&self) -> &str {
        &self.metadata.table_name
    }
}

/// Storage backend trait for entity sets
#[async_trait]
pub trait StoreBackend: Send + Sync + fmt::Debug {
    /// Short description used in logs
    fn describe(&self) -> String;

    /// All rows of the entity set, in stored order; an unknown set is empty
    async fn load(&self, metadata: &EntityMetadata) -> ModelResult<Vec<Value>>;

    /// Replace every given set. Either all sets are written or none.
    async fn persist(&self, sets: Vec<EntitySet>) -> ModelResult<()>;

    fn supports_transactions(&self) -> bool {
        false
    }
}

#[async_trait]
impl<S: StoreBackend + ?Sized> StoreBackend for Arc<S> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    async fn load(&self, metadata: &EntityMetadata) -> ModelResult<Vec<Value>> {
        (**self).load(metadata).await
    }

    async fn persist(&self, sets: Vec<EntitySet>) -> ModelResult<()> {
        (**self).persist(sets).await
    }

    fn supports_transactions(&self) -> bool {
        (**self).supports_transactions()
    }
}
