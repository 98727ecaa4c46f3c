//! Applying staged changes
//!
//! The whole batch is applied to in-memory copies of the touched sets before
//! anything is persisted, so a duplicate or missing key leaves the store as it
//! was.

use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

use super::{keys_equal, EntityState, PendingChange, RepositoryContext};
use crate::conventions::EntityMetadata;
use crate::error::{ModelError, ModelResult};
use crate::store::EntitySet;

impl RepositoryContext {
    /// Apply every staged change and persist the touched entity sets.
    /// Returns the number of affected entities.
    ///
    /// The staged batch is consumed even when the commit fails.
    #[instrument(skip(self), fields(context = %self.id, store = %self.store.describe()))]
    pub async fn save_changes(&self) -> ModelResult<usize> {
        let batch: Vec<PendingChange> = self.pending.lock().drain(..).collect();
        if batch.is_empty() {
            return Ok(0);
        }

        let mut sets: Vec<EntitySet> = Vec::new();
        for change in &batch {
            let index = match sets.iter().position(|s| s.table() == change.metadata.table_name) {
                Some(index) => index,
                None => {
                    let rows = self.store.load(&change.metadata).await?;
                    sets.push(EntitySet::new(Arc::clone(&change.metadata), rows));
                    sets.len() - 1
                }
            };
            apply(&mut sets[index].rows, change)?;
        }

        let tables: Vec<String> = sets.iter().map(|s| s.table().to_string()).collect();
        self.store.persist(sets).await?;

        if let Some(cache) = &self.cache {
            cache.invalidate(&tables).await?;
        }

        for change in &batch {
            self.interceptors
                .trigger_executed(change.state.operation(), &change.metadata, &change.record)
                .await?;
        }

        tracing::debug!(changes = batch.len(), sets = ?tables, "committed staged changes");
        Ok(batch.len())
    }
}

fn position_of(rows: &[Value], metadata: &EntityMetadata, key: &[Value]) -> Option<usize> {
    rows.iter()
        .position(|row| keys_equal(&metadata.row_key_values(row), key))
}

fn apply(rows: &mut Vec<Value>, change: &PendingChange) -> ModelResult<()> {
    let metadata = &change.metadata;
    let key = metadata.key_values(&change.record);
    let found = position_of(rows, metadata, &key);

    match (change.state, found) {
        (EntityState::Added, None) => {
            rows.push(metadata.to_storage(&change.record));
            Ok(())
        }
        (EntityState::Added, Some(_)) => Err(ModelError::duplicate_key(
            &metadata.table_name,
            metadata.describe_key(&change.record),
        )),
        (EntityState::Modified, Some(index)) => {
            rows[index] = metadata.to_storage(&change.record);
            Ok(())
        }
        (EntityState::Removed, Some(index)) => {
            rows.remove(index);
            Ok(())
        }
        (EntityState::Modified | EntityState::Removed, None) => Err(ModelError::not_found(
            &metadata.table_name,
            metadata.describe_key(&change.record),
        )),
    }
}
