//! In-memory store backed by process-wide named databases
//!
//! Every `MemoryStore` opened with the same name sees the same data for the
//! lifetime of the process, until the database is dropped.

use async_trait::async_trait;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::{EntitySet, StoreBackend};
use crate::conventions::EntityMetadata;
use crate::error::ModelResult;

static DATABASES: Lazy<DashMap<String, Arc<InMemoryDatabase>>> = Lazy::new(DashMap::new);

/// Tables of one named database
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    tables: RwLock<HashMap<String, Vec<Value>>>,
}

impl InMemoryDatabase {
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map(Vec::len).unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    name: String,
    database: Arc<InMemoryDatabase>,
}

impl MemoryStore {
    /// Open (or create) the named database
    pub fn new(name: &str) -> Self {
        let database = DATABASES
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(InMemoryDatabase::default()))
            .value()
            .clone();
        Self {
            name: name.to_string(),
            database,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database(&self) -> &InMemoryDatabase {
        &self.database
    }

    /// Remove all data of the named database. Returns whether it existed.
    pub fn drop_database(name: &str) -> bool {
        match DATABASES.remove(name) {
            Some((_, database)) => {
                database.tables.write().clear();
                tracing::debug!(database = %name, "dropped in-memory database");
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl StoreBackend for MemoryStore {
    fn describe(&self) -> String {
        format!("memory:{}", self.name)
    }

    async fn load(&self, metadata: &EntityMetadata) -> ModelResult<Vec<Value>> {
        Ok(self
            .database
            .tables
            .read()
            .get(&metadata.table_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn persist(&self, sets: Vec<EntitySet>) -> ModelResult<()> {
        let mut tables = self.database.tables.write();
        for set in sets {
            tables.insert(set.metadata.table_name.clone(), set.rows);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conventions::resolver::resolve;
    use crate::entity::EntitySchema;
    use serde_json::json;

    fn metadata(table: &str) -> Arc<EntityMetadata> {
        Arc::new(resolve(EntitySchema::new(table), json!({"id": 0, "name": ""})).unwrap())
    }

    #[tokio::test]
    async fn test_named_databases_are_shared() {
        let name = format!("memory-store-{}", uuid::Uuid::new_v4());
        let meta = metadata("Widget");

        let first = MemoryStore::new(&name);
        first
            .persist(vec![EntitySet::new(meta.clone(), vec![json!({"id": 1, "name": "a"})])])
            .await
            .unwrap();

        let second = MemoryStore::new(&name);
        assert_eq!(second.load(&meta).await.unwrap().len(), 1);
        assert_eq!(second.database().table_names(), vec!["Widget".to_string()]);
        assert_eq!(second.describe(), format!("memory:{}", name));

        assert!(MemoryStore::drop_database(&name));
        assert!(!MemoryStore::drop_database(&name));
        assert!(MemoryStore::new(&name).load(&meta).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_table_is_empty() {
        let store = MemoryStore::new(&format!("memory-store-{}", uuid::Uuid::new_v4()));
        assert!(store.load(&metadata("Nothing")).await.unwrap().is_empty());
        assert_eq!(store.database().row_count("Nothing"), 0);
    }
}
