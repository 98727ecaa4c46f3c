//! Repository Context
//!
//! A context sits between repositories and a store. Writes are staged in a
//! buffer and applied by `save_changes`; queries run against the stored
//! entity sets. One context can be shared by any number of repositories
//! (that is how a unit of work groups them).
//!
//! - `commit`: applying staged changes
//! - `query`: the query pipeline and its projections
//! - `fetch`: resolving navigation paths
//! - `transaction`: transaction emulation
//! - `cache`: query result caching

pub mod cache;
mod commit;
mod fetch;
mod query;
pub mod transaction;

pub use cache::QueryCache;
pub use transaction::Transaction;

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::conventions::{metadata_of, EntityMetadata, IdentityStrategy};
use crate::entity::Entity;
use crate::error::{ModelError, ModelResult};
use crate::interceptor::{InterceptedOperation, InterceptorRegistry, RepositoryInterceptor};
use crate::query::values_equal;
use crate::store::StoreBackend;

/// Kind of staged change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Added,
    Modified,
    Removed,
}

impl EntityState {
    fn operation(&self) -> InterceptedOperation {
        match self {
            EntityState::Added => InterceptedOperation::Add,
            EntityState::Modified => InterceptedOperation::Update,
            EntityState::Removed => InterceptedOperation::Delete,
        }
    }
}

/// A change waiting in the staging buffer; `record` is entity-shaped
#[derive(Debug, Clone)]
pub struct PendingChange {
    pub state: EntityState,
    pub metadata: Arc<EntityMetadata>,
    pub record: Value,
    /// Staging order within the context
    pub sequence: u64,
}

pub struct RepositoryContext {
    id: Uuid,
    store: Arc<dyn StoreBackend>,
    pending: Mutex<VecDeque<PendingChange>>,
    stage_counter: AtomicU64,
    interceptors: InterceptorRegistry,
    cache: Option<QueryCache>,
    ignore_transaction_warning: bool,
    transaction_active: AtomicBool,
}

impl RepositoryContext {
    pub fn new(store: Arc<dyn StoreBackend>) -> Self {
        Self {
            id: Uuid::new_v4(),
            store,
            pending: Mutex::new(VecDeque::new()),
            stage_counter: AtomicU64::new(0),
            interceptors: InterceptorRegistry::new(),
            cache: None,
            ignore_transaction_warning: false,
            transaction_active: AtomicBool::new(false),
        }
    }

    pub fn with_interceptor(
        mut self,
        interceptor: Arc<dyn RepositoryInterceptor>,
    ) -> Self {
        self.interceptors.register(interceptor);
        self
    }

    pub fn with_query_cache(mut self, cache: QueryCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Allow transactions on stores that cannot honor them
    pub fn with_ignore_transaction_warning(mut self, ignore: bool) -> Self {
        self.ignore_transaction_warning = ignore;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn store(&self) -> &Arc<dyn StoreBackend> {
        &self.store
    }

    pub fn query_cache(&self) -> Option<&QueryCache> {
        self.cache.as_ref()
    }

    pub fn has_changes(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Drop all staged changes, returning how many there were
    pub fn discard_changes(&self) -> usize {
        let discarded = {
            let mut pending = self.pending.lock();
            let count = pending.len();
            pending.clear();
            count
        };
        if discarded > 0 {
            tracing::debug!(context = %self.id, discarded, "discarded staged changes");
        }
        discarded
    }

    /// Marks the staging position; changes staged afterwards can be dropped
    /// with `discard_since`
    pub fn staging_mark(&self) -> u64 {
        self.stage_counter.load(Ordering::SeqCst)
    }

    /// Drop the changes staged since `mark`, keeping earlier ones
    pub fn discard_since(&self, mark: u64) -> usize {
        let discarded = {
            let mut pending = self.pending.lock();
            let before = pending.len();
            pending.retain(|change| change.sequence < mark);
            before - pending.len()
        };
        if discarded > 0 {
            tracing::debug!(context = %self.id, discarded, mark, "discarded staged changes");
        }
        discarded
    }

    /// Stage an add. Unset identity keys are generated here, so the returned
    /// entity already carries its key.
    pub async fn add<T: Entity>(&self, entity: &T) -> ModelResult<T> {
        let metadata = metadata_of::<T>()?;
        let mut record = serde_json::to_value(entity)?;

        self.interceptors
            .trigger_executing(InterceptedOperation::Add, &metadata, &mut record)
            .await?;
        self.assign_identity(&metadata, &mut record).await?;

        let staged: T = serde_json::from_value(record.clone())?;
        self.stage(EntityState::Added, metadata, record);
        Ok(staged)
    }

    pub async fn update<T: Entity>(&self, entity: &T) -> ModelResult<()> {
        self.stage_existing(EntityState::Modified, entity).await
    }

    pub async fn remove<T: Entity>(&self, entity: &T) -> ModelResult<()> {
        self.stage_existing(EntityState::Removed, entity).await
    }

    async fn stage_existing<T: Entity>(&self, state: EntityState, entity: &T) -> ModelResult<()> {
        let metadata = metadata_of::<T>()?;
        let mut record = serde_json::to_value(entity)?;
        self.interceptors
            .trigger_executing(state.operation(), &metadata, &mut record)
            .await?;
        self.stage(state, metadata, record);
        Ok(())
    }

    fn stage(&self, state: EntityState, metadata: Arc<EntityMetadata>, record: Value) {
        tracing::debug!(
            context = %self.id,
            entity = %metadata.type_name,
            key = %metadata.describe_key(&record),
            ?state,
            "staged change"
        );
        let mut pending = self.pending.lock();
        let sequence = self.stage_counter.fetch_add(1, Ordering::SeqCst);
        pending.push_back(PendingChange {
            state,
            metadata,
            record,
            sequence,
        });
    }

    async fn assign_identity(
        &self,
        metadata: &EntityMetadata,
        record: &mut Value,
    ) -> ModelResult<()> {
        let (Some(strategy), [key]) = (metadata.identity, metadata.primary_keys.as_slice()) else {
            return Ok(());
        };
        let current = record.get(key).cloned().unwrap_or(Value::Null);
        if !is_unset(strategy, &current) {
            return Ok(());
        }

        let generated = match strategy {
            IdentityStrategy::Sequence => Value::from(self.next_sequence(metadata).await?),
            IdentityStrategy::Uuid | IdentityStrategy::Text => {
                Value::String(Uuid::new_v4().to_string())
            }
        };

        match record {
            Value::Object(fields) => {
                fields.insert(key.clone(), generated);
                Ok(())
            }
            _ => Err(ModelError::Serialization(format!(
                "'{}' did not serialize to an object",
                metadata.type_name
            ))),
        }
    }

    /// Largest integer key among stored rows and staged adds, plus one
    async fn next_sequence(&self, metadata: &EntityMetadata) -> ModelResult<i64> {
        let rows = self.store.load(metadata).await?;
        let stored = rows
            .iter()
            .filter_map(|row| metadata.row_key_values(row).first().and_then(Value::as_i64));

        let staged: Vec<i64> = self
            .pending
            .lock()
            .iter()
            .filter(|c| {
                c.state == EntityState::Added && c.metadata.table_name == metadata.table_name
            })
            .filter_map(|c| metadata.key_values(&c.record).first().and_then(Value::as_i64))
            .collect();

        let max = stored.chain(staged).max().unwrap_or(0);
        Ok(max.max(0) + 1)
    }
}

/// A generated key is only assigned over a default-valued key
fn is_unset(strategy: IdentityStrategy, value: &Value) -> bool {
    match (strategy, value) {
        (_, Value::Null) => true,
        (IdentityStrategy::Sequence, Value::Number(n)) => n.as_i64() == Some(0),
        (IdentityStrategy::Uuid, Value::String(s)) => {
            s.is_empty() || Uuid::parse_str(s).map(|u| u.is_nil()).unwrap_or(false)
        }
        (IdentityStrategy::Text, Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

/// Key equality across entity-shaped and storage-shaped key values
pub(crate) fn keys_equal(left: &[Value], right: &[Value]) -> bool {
    left.len() == right.len() && left.iter().zip(right).all(|(a, b)| values_equal(a, b))
}

impl Drop for RepositoryContext {
    fn drop(&mut self) {
        let remaining = self.pending.get_mut().len();
        if remaining > 0 {
            tracing::debug!(context = %self.id, remaining, "context dropped with staged changes");
        }
    }
}

impl std::fmt::Debug for RepositoryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryContext")
            .field("id", &self.id)
            .field("store", &self.store.describe())
            .field("pending", &self.pending.lock().len())
            .field("interceptors", &self.interceptors)
            .field("cache", &self.cache)
            .field("ignore_transaction_warning", &self.ignore_transaction_warning)
            .field("transaction_active", &self.transaction_active.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Ticket {
        id: i64,
        subject: String,
    }

    impl Entity for Ticket {}

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Token {
        id: Uuid,
    }

    impl Entity for Token {}

    fn context() -> RepositoryContext {
        let store = MemoryStore::new(&format!("context-{}", Uuid::new_v4()));
        RepositoryContext::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_add_generates_sequence_keys() {
        let ctx = context();
        let first = ctx.add(&Ticket { id: 0, subject: "a".into() }).await.unwrap();
        let second = ctx.add(&Ticket { id: 0, subject: "b".into() }).await.unwrap();
        let explicit = ctx.add(&Ticket { id: 40, subject: "c".into() }).await.unwrap();

        assert_eq!((first.id, second.id, explicit.id), (1, 2, 40));
        assert_eq!(ctx.pending_count(), 3);

        let next = ctx.add(&Ticket::default()).await.unwrap();
        assert_eq!(next.id, 41);
    }

    #[tokio::test]
    async fn test_add_generates_uuid_keys() {
        let ctx = context();
        let token = ctx.add(&Token::default()).await.unwrap();
        assert!(!token.id.is_nil());
    }

    #[tokio::test]
    async fn test_discard_changes() {
        let ctx = context();
        ctx.update(&Ticket { id: 3, subject: "x".into() }).await.unwrap();
        assert!(ctx.has_changes());
        assert_eq!(ctx.discard_changes(), 1);
        assert!(!ctx.has_changes());
    }

    #[tokio::test]
    async fn test_discard_since_keeps_earlier_changes() {
        let ctx = context();
        ctx.update(&Ticket { id: 3, subject: "x".into() }).await.unwrap();
        let mark = ctx.staging_mark();
        ctx.add(&Ticket { id: 0, subject: "y".into() }).await.unwrap();
        ctx.remove(&Ticket { id: 9, subject: "z".into() }).await.unwrap();

        assert_eq!(ctx.discard_since(mark), 2);
        assert_eq!(ctx.pending_count(), 1);
        assert_eq!(ctx.discard_since(mark), 0);
    }

    #[test]
    fn test_is_unset() {
        assert!(is_unset(IdentityStrategy::Sequence, &json!(0)));
        assert!(!is_unset(IdentityStrategy::Sequence, &json!(5)));
        assert!(is_unset(IdentityStrategy::Uuid, &json!("00000000-0000-0000-0000-000000000000")));
        assert!(is_unset(IdentityStrategy::Text, &json!("")));
        assert!(!is_unset(IdentityStrategy::Text, &json!("abc")));
    }

    #[test]
    fn test_keys_equal() {
        assert!(keys_equal(&[json!(1), json!("a")], &[json!(1.0), json!("a")]));
        assert!(!keys_equal(&[json!(1)], &[json!(1), json!(2)]));
    }
}
