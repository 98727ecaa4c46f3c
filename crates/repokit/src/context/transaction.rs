//! Transaction emulation
//!
//! Memory and file stores cannot isolate or roll back anything once it is
//! persisted. A transaction over them only scopes the staging buffer:
//! `commit` saves the staged changes, `rollback` (or dropping the transaction)
//! discards them. Such transactions are refused unless the context was told to
//! ignore the missing guarantees.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

use super::RepositoryContext;
use crate::error::{ModelError, ModelResult};

/// Transaction over a repository context, with automatic cleanup
pub struct Transaction {
    context: Arc<RepositoryContext>,
    active: bool,
    committed: bool,
}

impl RepositoryContext {
    /// Begin a transaction. Only one can be active per context.
    pub fn begin_transaction(self: &Arc<Self>) -> ModelResult<Transaction> {
        if !self.store.supports_transactions() {
            if !self.ignore_transaction_warning {
                return Err(ModelError::Unsupported(format!(
                    "store '{}' does not support transactions; \
                     enable ignore_transaction_warning to continue without them",
                    self.store.describe()
                )));
            }
            warn!(
                context = %self.id,
                store = %self.store.describe(),
                "store does not support transactions; changes are only grouped until commit"
            );
        }

        if self
            .transaction_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ModelError::Transaction(
                "a transaction is already active on this context".to_string(),
            ));
        }

        debug!(context = %self.id, "began transaction");
        Ok(Transaction {
            context: Arc::clone(self),
            active: true,
            committed: false,
        })
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction_active.load(Ordering::SeqCst)
    }
}

impl Transaction {
    pub fn context(&self) -> &Arc<RepositoryContext> {
        &self.context
    }

    /// Save staged changes; returns the number of affected entities
    pub async fn commit(mut self) -> ModelResult<usize> {
        self.ensure_active()?;
        let outcome = self.context.save_changes().await;
        self.finish();
        self.committed = outcome.is_ok();
        debug!(context = %self.context.id(), committed = self.committed, "transaction finished");
        outcome
    }

    /// Discard staged changes
    pub fn rollback(mut self) -> ModelResult<()> {
        self.ensure_active()?;
        let discarded = self.context.discard_changes();
        self.finish();
        debug!(context = %self.context.id(), discarded, "rolled back transaction");
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    fn ensure_active(&self) -> ModelResult<()> {
        if self.active {
            Ok(())
        } else {
            Err(ModelError::Transaction("Transaction has already been consumed".to_string()))
        }
    }

    fn finish(&mut self) {
        self.active = false;
        self.context.transaction_active.store(false, Ordering::SeqCst);
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.active {
            let discarded = self.context.discard_changes();
            warn!(
                context = %self.context.id(),
                discarded,
                "transaction dropped without commit or rollback; staged changes discarded"
            );
            self.finish();
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("context", &self.context.id())
            .field("active", &self.active)
            .field("committed", &self.committed)
            .finish()
    }
}
