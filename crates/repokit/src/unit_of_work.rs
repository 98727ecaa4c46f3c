//! Unit of Work - several repositories, one commit

use std::sync::Arc;
use tracing::warn;

use crate::context::{RepositoryContext, Transaction};
use crate::entity::{Entity, EntityKey};
use crate::error::{ModelError, ModelResult};
use crate::repository::Repository;

/// Groups repository writes on a shared context into one commit
///
/// Creating a unit of work begins a transaction on the context, so the store
/// must support transactions or the context must ignore the transaction
/// warning. Dropping a unit of work without committing discards its work.
pub struct UnitOfWork {
    context: Arc<RepositoryContext>,
    transaction: Option<Transaction>,
}

impl UnitOfWork {
    pub fn new(context: Arc<RepositoryContext>) -> ModelResult<Self> {
        let transaction = context.begin_transaction()?;
        Ok(Self {
            context,
            transaction: Some(transaction),
        })
    }

    pub fn context(&self) -> &Arc<RepositoryContext> {
        &self.context
    }

    /// Repository whose writes wait for `commit`
    pub fn create<T: Entity, K: EntityKey>(&self) -> ModelResult<Repository<T, K>> {
        if self.transaction.is_none() {
            return Err(ModelError::Transaction("unit of work is already completed".to_string()));
        }
        Repository::with_auto_commit(Arc::clone(&self.context), false)
    }

    pub fn has_changes(&self) -> bool {
        self.context.has_changes()
    }

    /// Save all staged work; returns the number of affected entities
    pub async fn commit(mut self) -> ModelResult<usize> {
        match self.transaction.take() {
            Some(transaction) => transaction.commit().await,
            None => Err(ModelError::Transaction("unit of work is already completed".to_string())),
        }
    }

    pub fn rollback(mut self) -> ModelResult<()> {
        match self.transaction.take() {
            Some(transaction) => transaction.rollback(),
            None => Err(ModelError::Transaction("unit of work is already completed".to_string())),
        }
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if let Some(transaction) = self.transaction.take() {
            let pending = self.context.pending_count();
            warn!(
                context = %self.context.id(),
                pending,
                "unit of work dropped without commit; discarding staged changes"
            );
            if let Err(e) = transaction.rollback() {
                warn!(error = %e, "failed to roll back dropped unit of work");
            }
        }
    }
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("context", &self.context.id())
            .field("active", &self.transaction.is_some())
            .finish()
    }
}
