//! Repositories - typed facades over a repository context
//!
//! `Repository<T, K>` exposes CRUD and query operations for one entity type
//! keyed by `K`. In auto-commit mode every write is saved immediately;
//! repositories handed out by a unit of work stage their writes instead.

use serde_json::Value;
use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::context::RepositoryContext;
use crate::conventions::{metadata_of, EntityMetadata};
use crate::entity::{format_key, Entity, EntityKey};
use crate::error::{ModelError, ModelResult};
use crate::query::{FetchStrategy, PagedQueryResult, QueryOptions};

pub struct Repository<T: Entity, K: EntityKey> {
    context: Arc<RepositoryContext>,
    metadata: Arc<EntityMetadata>,
    auto_commit: bool,
    _types: PhantomData<fn() -> (T, K)>,
}

impl<T: Entity, K: EntityKey> Repository<T, K> {
    /// Auto-commit repository over `context`.
    ///
    /// Each successful write saves everything staged on the context, so a
    /// deferred repository sharing the context has its work committed too.
    /// Give auto-commit repositories their own context unless that is wanted.
    pub fn new(context: Arc<RepositoryContext>) -> ModelResult<Self> {
        Self::with_auto_commit(context, true)
    }

    /// Fails with `KeyArity` when `K` does not fit the entity's primary key
    pub fn with_auto_commit(
        context: Arc<RepositoryContext>,
        auto_commit: bool,
    ) -> ModelResult<Self> {
        let metadata = metadata_of::<T>()?;
        if K::ARITY != metadata.primary_keys.len() {
            return Err(ModelError::KeyArity {
                entity: metadata.type_name.clone(),
                expected: metadata.primary_keys.len(),
                actual: K::ARITY,
            });
        }
        Ok(Self {
            context,
            metadata,
            auto_commit,
            _types: PhantomData,
        })
    }

    pub fn context(&self) -> &Arc<RepositoryContext> {
        &self.context
    }

    pub fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    pub fn is_auto_commit(&self) -> bool {
        self.auto_commit
    }

    /// Commit in auto-commit mode. A failed staging step drops what the
    /// operation staged after `mark`; earlier changes stay staged.
    async fn finish<R>(&self, mark: u64, staged: ModelResult<R>) -> ModelResult<R> {
        if !self.auto_commit {
            return staged;
        }
        match staged {
            Ok(value) => {
                self.context.save_changes().await?;
                Ok(value)
            }
            Err(e) => {
                self.context.discard_since(mark);
                Err(e)
            }
        }
    }

    /// Add an entity; the returned copy carries any generated key
    pub async fn add(&self, entity: &T) -> ModelResult<T> {
        let mark = self.context.staging_mark();
        let staged = self.context.add(entity).await;
        self.finish(mark, staged).await
    }

    pub async fn add_range(&self, entities: &[T]) -> ModelResult<Vec<T>> {
        let mark = self.context.staging_mark();
        let staged: ModelResult<Vec<T>> = async {
            let mut added = Vec::with_capacity(entities.len());
            for entity in entities {
                added.push(self.context.add(entity).await?);
            }
            Ok(added)
        }
        .await;
        self.finish(mark, staged).await
    }

    pub async fn update(&self, entity: &T) -> ModelResult<()> {
        let mark = self.context.staging_mark();
        let staged = self.context.update(entity).await;
        self.finish(mark, staged).await
    }

    pub async fn update_range(&self, entities: &[T]) -> ModelResult<()> {
        let mark = self.context.staging_mark();
        let staged: ModelResult<()> = async {
            for entity in entities {
                self.context.update(entity).await?;
            }
            Ok(())
        }
        .await;
        self.finish(mark, staged).await
    }

    pub async fn delete(&self, entity: &T) -> ModelResult<()> {
        let mark = self.context.staging_mark();
        let staged = self.context.remove(entity).await;
        self.finish(mark, staged).await
    }

    pub async fn delete_range(&self, entities: &[T]) -> ModelResult<()> {
        let mark = self.context.staging_mark();
        let staged: ModelResult<()> = async {
            for entity in entities {
                self.context.remove(entity).await?;
            }
            Ok(())
        }
        .await;
        self.finish(mark, staged).await
    }

    /// Delete the entity with `key`; `NotFound` when there is none
    pub async fn delete_by_key(&self, key: &K) -> ModelResult<()> {
        let mark = self.context.staging_mark();
        let staged: ModelResult<()> = async {
            let values = key.to_values();
            match self.context.find_by_key::<T>(&values, &FetchStrategy::new()).await? {
                Some(entity) => self.context.remove(&entity).await,
                None => Err(ModelError::not_found(
                    &self.metadata.table_name,
                    format_key(&values),
                )),
            }
        }
        .await;
        self.finish(mark, staged).await
    }

    /// Delete every match of `options`, returning how many were deleted
    pub async fn delete_where(&self, options: &QueryOptions<T>) -> ModelResult<usize> {
        let mark = self.context.staging_mark();
        let staged: ModelResult<usize> = async {
            let matches = self.context.find_all(options).await?.result;
            for entity in &matches {
                self.context.remove(entity).await?;
            }
            Ok(matches.len())
        }
        .await;
        self.finish(mark, staged).await
    }

    pub async fn find(&self, key: &K) -> ModelResult<Option<T>> {
        self.find_with_fetch(key, &FetchStrategy::new()).await
    }

    pub async fn find_with_fetch(
        &self,
        key: &K,
        fetch: &FetchStrategy<T>,
    ) -> ModelResult<Option<T>> {
        self.context.find_by_key(&key.to_values(), fetch).await
    }

    pub async fn find_where(&self, options: &QueryOptions<T>) -> ModelResult<Option<T>> {
        self.context.find(options).await
    }

    pub async fn find_all(&self) -> ModelResult<Vec<T>> {
        Ok(self.context.find_all(&QueryOptions::new()).await?.result)
    }

    pub async fn find_all_where(
        &self,
        options: &QueryOptions<T>,
    ) -> ModelResult<PagedQueryResult<Vec<T>>> {
        self.context.find_all(options).await
    }

    pub async fn find_all_as<R, F>(
        &self,
        options: &QueryOptions<T>,
        selector: F,
    ) -> ModelResult<PagedQueryResult<Vec<R>>>
    where
        F: Fn(&T) -> R,
    {
        self.context.find_all_as(options, selector).await
    }

    pub async fn count(&self) -> ModelResult<usize> {
        self.context.count(&QueryOptions::<T>::new()).await
    }

    pub async fn count_where(&self, options: &QueryOptions<T>) -> ModelResult<usize> {
        self.context.count(options).await
    }

    pub async fn exists(&self, key: &K) -> ModelResult<bool> {
        Ok(self.find(key).await?.is_some())
    }

    pub async fn exists_where(&self, options: &QueryOptions<T>) -> ModelResult<bool> {
        self.context.exists(options).await
    }

    pub async fn to_dictionary<DK, V, KF, VF>(
        &self,
        options: &QueryOptions<T>,
        key_fn: KF,
        value_fn: VF,
    ) -> ModelResult<PagedQueryResult<HashMap<DK, V>>>
    where
        DK: Eq + Hash + std::fmt::Debug,
        KF: Fn(&T) -> DK,
        VF: Fn(&T) -> V,
    {
        self.context.to_dictionary(options, key_fn, value_fn).await
    }

    pub async fn group_by<GK, R, KF, RF>(
        &self,
        options: &QueryOptions<T>,
        key_fn: KF,
        result_fn: RF,
    ) -> ModelResult<PagedQueryResult<Vec<R>>>
    where
        GK: PartialEq,
        KF: Fn(&T) -> GK,
        RF: Fn(&GK, &[T]) -> R,
    {
        self.context.group_by(options, key_fn, result_fn).await
    }

    /// Raw SQL; unsupported by memory and file stores
    pub async fn execute_sql(&self, sql: &str, parameters: &[Value]) -> ModelResult<Vec<T>> {
        self.context.execute_sql(sql, parameters).await
    }
}

impl<T: Entity, K: EntityKey> Clone for Repository<T, K> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            metadata: Arc::clone(&self.metadata),
            auto_commit: self.auto_commit,
            _types: PhantomData,
        }
    }
}

impl<T: Entity, K: EntityKey> std::fmt::Debug for Repository<T, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &self.metadata.type_name)
            .field("context", &self.context.id())
            .field("auto_commit", &self.auto_commit)
            .finish()
    }
}

/// Repository limited to read operations
#[derive(Clone, Debug)]
pub struct ReadOnlyRepository<T: Entity, K: EntityKey> {
    inner: Repository<T, K>,
}

impl<T: Entity, K: EntityKey> ReadOnlyRepository<T, K> {
    pub fn new(context: Arc<RepositoryContext>) -> ModelResult<Self> {
        Ok(Self {
            inner: Repository::with_auto_commit(context, false)?,
        })
    }

    pub fn metadata(&self) -> &EntityMetadata {
        self.inner.metadata()
    }

    pub async fn find(&self, key: &K) -> ModelResult<Option<T>> {
        self.inner.find(key).await
    }

    pub async fn find_with_fetch(
        &self,
        key: &K,
        fetch: &FetchStrategy<T>,
    ) -> ModelResult<Option<T>> {
        self.inner.find_with_fetch(key, fetch).await
    }

    pub async fn find_where(&self, options: &QueryOptions<T>) -> ModelResult<Option<T>> {
        self.inner.find_where(options).await
    }

    pub async fn find_all(&self) -> ModelResult<Vec<T>> {
        self.inner.find_all().await
    }

    pub async fn find_all_where(
        &self,
        options: &QueryOptions<T>,
    ) -> ModelResult<PagedQueryResult<Vec<T>>> {
        self.inner.find_all_where(options).await
    }

    pub async fn find_all_as<R, F>(
        &self,
        options: &QueryOptions<T>,
        selector: F,
    ) -> ModelResult<PagedQueryResult<Vec<R>>>
    where
        F: Fn(&T) -> R,
    {
        self.inner.find_all_as(options, selector).await
    }

    pub async fn count(&self) -> ModelResult<usize> {
        self.inner.count().await
    }

    pub async fn count_where(&self, options: &QueryOptions<T>) -> ModelResult<usize> {
        self.inner.count_where(options).await
    }

    pub async fn exists(&self, key: &K) -> ModelResult<bool> {
        self.inner.exists(key).await
    }

    pub async fn exists_where(&self, options: &QueryOptions<T>) -> ModelResult<bool> {
        self.inner.exists_where(options).await
    }

    pub async fn to_dictionary<DK, V, KF, VF>(
        &self,
        options: &QueryOptions<T>,
        key_fn: KF,
        value_fn: VF,
    ) -> ModelResult<PagedQueryResult<HashMap<DK, V>>>
    where
        DK: Eq + Hash + std::fmt::Debug,
        KF: Fn(&T) -> DK,
        VF: Fn(&T) -> V,
    {
        self.inner.to_dictionary(options, key_fn, value_fn).await
    }

    pub async fn group_by<GK, R, KF, RF>(
        &self,
        options: &QueryOptions<T>,
        key_fn: KF,
        result_fn: RF,
    ) -> ModelResult<PagedQueryResult<Vec<R>>>
    where
        GK: PartialEq,
        KF: Fn(&T) -> GK,
        RF: Fn(&GK, &[T]) -> R,
    {
        self.inner.group_by(options, key_fn, result_fn).await
    }
}

impl<T: Entity, K: EntityKey> From<Repository<T, K>> for ReadOnlyRepository<T, K> {
    fn from(inner: Repository<T, K>) -> Self {
        Self { inner }
    }
}
