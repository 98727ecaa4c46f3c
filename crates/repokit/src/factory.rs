//! Repository factory - contexts, repositories and units of work from options

use std::sync::Arc;

use crate::context::{QueryCache, RepositoryContext};
use crate::entity::{Entity, EntityKey};
use crate::error::{ModelError, ModelResult};
use crate::options::{RepositoryOptions, StoreOptions};
use crate::repository::{ReadOnlyRepository, Repository};
use crate::store::{FileStore, MemoryStore, StoreBackend};
use crate::unit_of_work::UnitOfWork;

#[derive(Debug, Clone)]
pub struct RepositoryFactory {
    options: RepositoryOptions,
}

impl RepositoryFactory {
    /// Validates the options up front
    pub fn new(options: RepositoryOptions) -> ModelResult<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn from_env() -> ModelResult<Self> {
        Self::new(RepositoryOptions::from_env()?)
    }

    pub fn options(&self) -> &RepositoryOptions {
        &self.options
    }

    fn store(&self) -> ModelResult<Arc<dyn StoreBackend>> {
        let store: Arc<dyn StoreBackend> = match &self.options.store {
            Some(StoreOptions::File { root, format }) => {
                Arc::new(FileStore::new(root.clone(), *format))
            }
            Some(StoreOptions::InMemory { database_name }) => {
                Arc::new(MemoryStore::new(database_name))
            }
            None => return Err(ModelError::Configuration("no store configured".to_string())),
        };
        Ok(store)
    }

    /// A fresh context configured by the options
    pub fn create_context(&self) -> ModelResult<Arc<RepositoryContext>> {
        let store = self.store()?;
        let description = store.describe();
        let mut context = RepositoryContext::new(store)
            .with_ignore_transaction_warning(self.options.ignore_transaction_warning);

        for interceptor in &self.options.interceptors {
            context = context.with_interceptor(Arc::clone(interceptor));
        }
        if let Some(provider) = &self.options.cache_provider {
            context = context.with_query_cache(QueryCache::new(
                Arc::clone(provider),
                &description,
                self.options.cache_expiration,
            ));
        }

        tracing::debug!(
            context = %context.id(),
            store = %description,
            "created repository context"
        );
        Ok(Arc::new(context))
    }

    /// Auto-commit repository over its own context
    pub fn create<T: Entity, K: EntityKey>(&self) -> ModelResult<Repository<T, K>> {
        Repository::new(self.create_context()?)
    }

    pub fn create_read_only<T: Entity, K: EntityKey>(
        &self,
    ) -> ModelResult<ReadOnlyRepository<T, K>> {
        ReadOnlyRepository::new(self.create_context()?)
    }

    pub fn create_unit_of_work(&self) -> ModelResult<UnitOfWork> {
        UnitOfWork::new(self.create_context()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Badge {
        id: i64,
        title: String,
    }

    impl Entity for Badge {}

    #[tokio::test]
    async fn test_repositories_share_named_database() {
        let name = format!("factory-{}", uuid::Uuid::new_v4());
        let factory = RepositoryFactory::new(
            RepositoryOptions::builder().use_in_memory_database(&name).build(),
        )
        .unwrap();

        let writer = factory.create::<Badge, i64>().unwrap();
        writer.add(&Badge { id: 0, title: "gold".into() }).await.unwrap();

        let reader = factory.create_read_only::<Badge, i64>().unwrap();
        assert_eq!(reader.find(&1).await.unwrap().map(|b| b.title), Some("gold".to_string()));
    }

    #[test]
    fn test_invalid_options_rejected() {
        assert!(matches!(
            RepositoryFactory::new(RepositoryOptions::default()),
            Err(ModelError::Configuration(_))
        ));
    }

    #[test]
    fn test_unit_of_work_needs_flag() {
        let factory = RepositoryFactory::new(
            RepositoryOptions::builder().use_in_memory_database("factory-uow").build(),
        )
        .unwrap();
        assert!(matches!(factory.create_unit_of_work(), Err(ModelError::Unsupported(_))));
    }
}
