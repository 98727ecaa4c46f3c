//! Resolution of annotations and naming conventions into metadata

use serde_json::Value;

use super::metadata::{
    EntityMetadata, FieldMetadata, IdentityStrategy, NavigationMetadata, ValueKind,
};
use super::normalize;
use crate::entity::{EntitySchema, Generated};
use crate::error::{ModelError, ModelResult};

/// Resolve metadata from a schema and the serialized default instance
pub fn resolve(schema: EntitySchema, sample: Value) -> ModelResult<EntityMetadata> {
    let Value::Object(defaults) = sample else {
        return Err(ModelError::Convention(format!(
            "entity '{}' must serialize to a JSON object",
            schema.type_name
        )));
    };

    for annotation in &schema.fields {
        if !defaults.contains_key(&annotation.name) {
            return Err(ModelError::Convention(format!(
                "annotated field '{}' is not a field of '{}'",
                annotation.name, schema.type_name
            )));
        }
    }
    for navigation in &schema.navigations {
        if !defaults.contains_key(&navigation.name) {
            return Err(ModelError::Convention(format!(
                "navigation '{}' is not a field of '{}'",
                navigation.name, schema.type_name
            )));
        }
    }

    let is_navigation = |name: &str| schema.navigations.iter().any(|n| n.name == name);

    let fields: Vec<FieldMetadata> = defaults
        .iter()
        .filter(|(name, _)| !is_navigation(name.as_str()))
        .map(|(name, value)| {
            let annotation = schema.annotation(name);
            FieldMetadata {
                name: name.clone(),
                column: annotation
                    .and_then(|a| a.column.clone())
                    .unwrap_or_else(|| name.clone()),
                kind: ValueKind::of(value),
                is_key: false,
                mapped: annotation.map(|a| a.mapped).unwrap_or(true),
            }
        })
        .collect();

    let mut metadata = EntityMetadata {
        table_name: schema.table.clone().unwrap_or_else(|| schema.type_name.clone()),
        type_name: schema.type_name.clone(),
        fields,
        primary_keys: Vec::new(),
        identity: None,
        navigations: schema
            .navigations
            .iter()
            .map(|n| NavigationMetadata {
                name: n.name.clone(),
                kind: n.kind,
                target_type: n.target_type.to_string(),
                declared_foreign_key: n.foreign_key.clone(),
                target: n.target,
            })
            .collect(),
        defaults,
    };

    metadata.primary_keys = resolve_primary_keys(&schema, &metadata)?;
    for key in &metadata.primary_keys {
        if let Some(field) = metadata.fields.iter_mut().find(|f| &f.name == key) {
            field.is_key = true;
        }
    }
    metadata.identity = resolve_identity(&schema, &metadata)?;

    Ok(metadata)
}

fn resolve_primary_keys(
    schema: &EntitySchema,
    metadata: &EntityMetadata,
) -> ModelResult<Vec<String>> {
    let mut annotated: Vec<_> = schema.fields.iter().filter(|f| f.key).collect();

    for key in &annotated {
        if !metadata.field(&key.name).map(|f| f.mapped).unwrap_or(false) {
            return Err(ModelError::Convention(format!(
                "key field '{}' of '{}' must be a persisted field",
                key.name, schema.type_name
            )));
        }
    }

    match annotated.len() {
        0 => {}
        1 => return Ok(vec![annotated[0].name.clone()]),
        _ => {
            if annotated.iter().any(|k| k.order.is_none()) {
                return Err(ModelError::Convention(format!(
                    "unable to determine the composite key order of '{}'; set an order on every key field",
                    schema.type_name
                )));
            }
            annotated.sort_by_key(|k| k.order);
            return Ok(annotated.iter().map(|k| k.name.clone()).collect());
        }
    }

    let candidates = ["id".to_string(), format!("{}id", normalize(&schema.type_name))];

    candidates
        .iter()
        .find_map(|wanted| metadata.find_field_normalized(wanted))
        .map(|field| vec![field.name.clone()])
        .ok_or_else(|| ModelError::MissingPrimaryKey(schema.type_name.clone()))
}

fn resolve_identity(
    schema: &EntitySchema,
    metadata: &EntityMetadata,
) -> ModelResult<Option<IdentityStrategy>> {
    let generated_keys: Vec<_> = schema
        .fields
        .iter()
        .filter(|f| f.generated == Some(Generated::Identity))
        .collect();

    if metadata.primary_keys.len() != 1 {
        if !generated_keys.is_empty() {
            return Err(ModelError::Convention(format!(
                "identity generation is only supported for single-field keys ('{}')",
                schema.type_name
            )));
        }
        return Ok(None);
    }

    let key = &metadata.primary_keys[0];
    let annotation = schema.annotation(key).and_then(|a| a.generated);
    let kind = metadata.field(key).map(|f| f.kind).unwrap_or(ValueKind::Null);

    match (annotation, kind) {
        (Some(Generated::None), _) => Ok(None),
        (_, ValueKind::Integer) => Ok(Some(IdentityStrategy::Sequence)),
        (_, ValueKind::Uuid) => Ok(Some(IdentityStrategy::Uuid)),
        (_, ValueKind::String) => Ok(Some(IdentityStrategy::Text)),
        (Some(Generated::Identity), ValueKind::Null) => Ok(Some(IdentityStrategy::Sequence)),
        (Some(Generated::Identity), other) => Err(ModelError::Convention(format!(
            "identity generation is not supported for {:?} key '{}' of '{}'",
            other, key, schema.type_name
        ))),
        (None, _) => Ok(None),
    }
}
