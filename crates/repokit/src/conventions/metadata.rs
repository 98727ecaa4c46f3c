//! Resolved entity metadata
//!
//! Records move through the engine in two shapes: entity-shaped objects keyed
//! by field name, and storage rows keyed by column name that omit navigation
//! and unmapped fields. `EntityMetadata` converts between the two and reads
//! key values from either.

use serde_json::{Map, Value};
use std::sync::Arc;

use super::normalize;
use crate::entity::{format_key, NavigationKind};
use crate::error::{ModelError, ModelResult};

/// JSON kind of a field, taken from the default instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Integer,
    Float,
    String,
    Uuid,
    Array,
    Object,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(n) if n.is_f64() => ValueKind::Float,
            Value::Number(_) => ValueKind::Integer,
            Value::String(s) if uuid::Uuid::parse_str(s).is_ok() => ValueKind::Uuid,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }
}

/// How keys are generated for added entities whose key is unset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityStrategy {
    /// Largest existing integer key plus one
    Sequence,
    /// Fresh v4 UUID
    Uuid,
    /// Fresh v4 UUID rendered as text
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMetadata {
    pub name: String,
    pub column: String,
    pub kind: ValueKind,
    pub is_key: bool,
    pub mapped: bool,
}

/// Navigation with its target resolved lazily
#[derive(Debug, Clone)]
pub struct NavigationMetadata {
    pub name: String,
    pub kind: NavigationKind,
    pub target_type: String,
    pub declared_foreign_key: Vec<String>,
    pub(crate) target: fn() -> ModelResult<Arc<EntityMetadata>>,
}

impl NavigationMetadata {
    pub fn target(&self) -> ModelResult<Arc<EntityMetadata>> {
        (self.target)()
    }

    /// Foreign key fields: on the owner for references, on the target for
    /// collections. Ordered like the referenced primary key.
    pub fn foreign_key(
        &self,
        owner: &EntityMetadata,
        target: &EntityMetadata,
    ) -> ModelResult<Vec<String>> {
        let (holder, referenced) = match self.kind {
            NavigationKind::Reference => (owner, target),
            NavigationKind::Collection => (target, owner),
        };

        if !self.declared_foreign_key.is_empty() {
            for field in &self.declared_foreign_key {
                if holder.field(field).is_none() {
                    return Err(ModelError::Convention(format!(
                        "foreign key '{}' of navigation '{}.{}' is not a field of '{}'",
                        field, owner.type_name, self.name, holder.type_name
                    )));
                }
            }
            if self.declared_foreign_key.len() != referenced.primary_keys.len() {
                return Err(ModelError::Convention(format!(
                    "navigation '{}.{}' declares {} foreign key field(s) but '{}' has {} key field(s)",
                    owner.type_name,
                    self.name,
                    self.declared_foreign_key.len(),
                    referenced.type_name,
                    referenced.primary_keys.len()
                )));
            }
            return Ok(self.declared_foreign_key.clone());
        }

        let prefixes: Vec<String> = match self.kind {
            NavigationKind::Reference => vec![normalize(&self.name), normalize(&target.type_name)],
            NavigationKind::Collection => vec![normalize(&owner.type_name)],
        };

        for prefix in &prefixes {
            let resolved: Option<Vec<String>> = referenced
                .primary_keys
                .iter()
                .map(|key| {
                    let wanted = if referenced.primary_keys.len() == 1 {
                        format!("{}id", prefix)
                    } else {
                        format!("{}{}", prefix, normalize(key))
                    };
                    holder.find_field_normalized(&wanted).map(|f| f.name.clone())
                })
                .collect();

            if let Some(fields) = resolved {
                return Ok(fields);
            }
        }

        Err(ModelError::Convention(format!(
            "unable to resolve the foreign key of navigation '{}.{}'; declare it explicitly",
            owner.type_name, self.name
        )))
    }
}

/// Everything the engine knows about an entity type
#[derive(Debug, Clone)]
pub struct EntityMetadata {
    pub type_name: String,
    pub table_name: String,
    pub fields: Vec<FieldMetadata>,
    pub primary_keys: Vec<String>,
    pub identity: Option<IdentityStrategy>,
    pub navigations: Vec<NavigationMetadata>,
    pub(crate) defaults: Map<String, Value>,
}

impl EntityMetadata {
    pub fn field(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub(crate) fn find_field_normalized(&self, normalized: &str) -> Option<&FieldMetadata> {
        self.fields
            .iter()
            .find(|f| f.mapped && normalize(&f.name) == normalized)
    }

    pub fn navigation(&self, name: &str) -> Option<&NavigationMetadata> {
        self.navigations.iter().find(|n| n.name == name)
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.field(name).is_some() || self.navigation(name).is_some()
    }

    /// Persisted fields in declaration order
    pub fn mapped_fields(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.fields.iter().filter(|f| f.mapped)
    }

    pub fn columns(&self) -> Vec<&str> {
        self.mapped_fields().map(|f| f.column.as_str()).collect()
    }

    fn key_columns(&self) -> impl Iterator<Item = &str> {
        self.primary_keys
            .iter()
            .map(|key| self.field(key).map(|f| f.column.as_str()).unwrap_or(key.as_str()))
    }

    /// Key values of an entity-shaped record
    pub fn key_values(&self, record: &Value) -> Vec<Value> {
        self.primary_keys
            .iter()
            .map(|key| record.get(key).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Key values of a storage row
    pub fn row_key_values(&self, row: &Value) -> Vec<Value> {
        self.key_columns()
            .map(|column| row.get(column).cloned().unwrap_or(Value::Null))
            .collect()
    }

    pub fn describe_key(&self, record: &Value) -> String {
        format_key(&self.key_values(record))
    }

    /// Entity-shaped record to storage row
    pub fn to_storage(&self, record: &Value) -> Value {
        let mut row = Map::new();
        for field in self.mapped_fields() {
            let value = record.get(&field.name).cloned().unwrap_or(Value::Null);
            row.insert(field.column.clone(), value);
        }
        Value::Object(row)
    }

    /// Storage row to entity-shaped record; absent members take their defaults
    pub fn from_storage(&self, row: &Value) -> Value {
        let mut record = self.defaults.clone();
        for field in self.mapped_fields() {
            if let Some(value) = row.get(&field.column) {
                record.insert(field.name.clone(), value.clone());
            }
        }
        Value::Object(record)
    }
}
