//! Convention Resolver
//!
//! Derives `EntityMetadata` for an entity type from its annotations and its
//! serialized default instance. Resolution happens once per type; results
//! are cached process-wide.
//!
//! Primary key resolution chain:
//! 1. fields annotated as keys (composite keys need an explicit order)
//! 2. a field named `id`
//! 3. a field named `{type}_id` / `{Type}Id`

pub mod metadata;
pub mod resolver;

pub use metadata::{
    EntityMetadata, FieldMetadata, IdentityStrategy, NavigationMetadata, ValueKind,
};

use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::TypeId;
use std::sync::Arc;

use crate::entity::Entity;
use crate::error::ModelResult;

static METADATA: Lazy<DashMap<TypeId, Arc<EntityMetadata>>> = Lazy::new(DashMap::new);

/// Resolved metadata for `T`, computed on first use
pub fn metadata_of<T: Entity>() -> ModelResult<Arc<EntityMetadata>> {
    let type_id = TypeId::of::<T>();
    if let Some(found) = METADATA.get(&type_id) {
        return Ok(found.value().clone());
    }

    let sample = serde_json::to_value(T::default())?;
    let resolved = Arc::new(resolver::resolve(T::schema(), sample)?);
    tracing::debug!(
        entity = %resolved.type_name,
        table = %resolved.table_name,
        keys = ?resolved.primary_keys,
        "resolved entity conventions"
    );

    // A concurrent resolution of the same type may have won; keep the first
    let entry = METADATA.entry(type_id).or_insert(resolved);
    Ok(entry.value().clone())
}

/// Lowercase with underscores removed, so `customer_id` matches `CustomerId`
pub(crate) fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(|c| c.to_lowercase())
        .collect()
}
