//! Entity System - Trait and annotations for repository entities
//!
//! Entities are plain serde structs. Their serialized shape is the surface the
//! convention resolver inspects; `EntitySchema` carries the optional
//! annotations (keys, columns, generation, navigations) that override the
//! naming conventions.
//!
//! - `key`: scalar and composite key types accepted by repositories
//! - `schema`: annotation builders returned from `Entity::schema`

pub mod key;
pub mod schema;

pub use key::{format_key, EntityKey, KeyPart};
pub use schema::{EntitySchema, FieldSchema, Generated, Navigation, NavigationKind};

use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

/// Core trait for entities managed by a repository
///
/// `Default` is required: the default instance is serialized once per type to
/// discover field names and value kinds. Navigation fields (`Option<U>` or
/// `Vec<U>`) are never persisted and are filled only when fetched.
pub trait Entity:
    Clone + Debug + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Annotations for this entity; conventions cover anything left out
    fn schema() -> EntitySchema {
        EntitySchema::for_type::<Self>()
    }
}

/// Last path segment of a type name, without generic arguments
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
