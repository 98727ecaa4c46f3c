//! Entity annotations
//!
//! The builders here play the role attributes play elsewhere: they mark key
//! fields, rename columns, opt fields out of persistence and describe
//! navigations to related entities.

use std::sync::Arc;

use super::{short_type_name, Entity};
use crate::conventions::{metadata_of, EntityMetadata};
use crate::error::ModelResult;

/// Key generation annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generated {
    /// The store assigns the key when an unset key is added
    Identity,
    /// The caller always supplies the key
    None,
}

/// Annotations for a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: String,
    pub column: Option<String>,
    pub key: bool,
    pub order: Option<usize>,
    pub generated: Option<Generated>,
    pub mapped: bool,
}

impl FieldSchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            column: None,
            key: false,
            order: None,
            generated: None,
            mapped: true,
        }
    }

    /// Mark as (part of) the primary key
    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    /// Position within a composite key
    pub fn order(mut self, order: usize) -> Self {
        self.order = Some(order);
        self
    }

    /// Store under a different column name
    pub fn column(mut self, column: &str) -> Self {
        self.column = Some(column.to_string());
        self
    }

    pub fn generated(mut self, generated: Generated) -> Self {
        self.generated = Some(generated);
        self
    }

    /// Exclude from persistence; the default value is used when loading
    pub fn not_mapped(mut self) -> Self {
        self.mapped = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// The owner holds the foreign key (`Option<U>` field)
    Reference,
    /// The target holds the foreign key (`Vec<U>` field)
    Collection,
}

/// A related entity reachable from the owner through a field
#[derive(Debug, Clone)]
pub struct Navigation {
    pub name: String,
    pub kind: NavigationKind,
    pub foreign_key: Vec<String>,
    pub target_type: &'static str,
    pub(crate) target: fn() -> ModelResult<Arc<EntityMetadata>>,
}

impl Navigation {
    /// Navigation to a single related entity
    pub fn reference<U: Entity>(name: &str) -> Self {
        Self::new::<U>(name, NavigationKind::Reference)
    }

    /// Navigation to the related entities that point back at the owner
    pub fn collection<U: Entity>(name: &str) -> Self {
        Self::new::<U>(name, NavigationKind::Collection)
    }

    fn new<U: Entity>(name: &str, kind: NavigationKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            foreign_key: Vec::new(),
            target_type: short_type_name::<U>(),
            target: metadata_of::<U>,
        }
    }

    /// Explicit foreign key field(s), overriding the naming convention
    pub fn foreign_key(mut self, fields: &[&str]) -> Self {
        self.foreign_key = fields.iter().map(|f| f.to_string()).collect();
        self
    }
}

/// Annotation set for an entity type
#[derive(Debug, Clone)]
pub struct EntitySchema {
    pub type_name: String,
    pub table: Option<String>,
    pub fields: Vec<FieldSchema>,
    pub navigations: Vec<Navigation>,
}

impl EntitySchema {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            table: None,
            fields: Vec::new(),
            navigations: Vec::new(),
        }
    }

    /// Schema named after the Rust type
    pub fn for_type<T: ?Sized>() -> Self {
        Self::new(short_type_name::<T>())
    }

    /// Explicit table (entity set) name
    pub fn table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Shorthand for a single annotated key field
    pub fn key(self, name: &str) -> Self {
        self.field(FieldSchema::new(name).key())
    }

    pub fn navigation(mut self, navigation: Navigation) -> Self {
        self.navigations.push(navigation);
        self
    }

    pub fn annotation(&self, field: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == field)
    }
}
