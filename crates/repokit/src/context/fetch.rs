//! Fetch resolution
//!
//! Navigation values are never stored. For each fetched path the target set
//! is loaded and joined on the foreign key: a reference becomes the matching
//! record (or null), a collection becomes the array of records pointing back
//! at the owner. Deeper segments are resolved on the target records first.

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

use super::{keys_equal, RepositoryContext};
use crate::conventions::EntityMetadata;
use crate::entity::NavigationKind;
use crate::error::{ModelError, ModelResult};

type FetchFuture<'a> = Pin<Box<dyn Future<Output = ModelResult<()>> + Send + 'a>>;

/// Group paths by their first segment: `a.b`, `a.c`, `d` -> `a: [b, c]`, `d: []`
fn group_paths(paths: &[String]) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for path in paths {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path.as_str(), None),
        };
        let index = match groups.iter().position(|(name, _)| name == head) {
            Some(index) => index,
            None => {
                groups.push((head.to_string(), Vec::new()));
                groups.len() - 1
            }
        };
        if let Some(rest) = rest {
            groups[index].1.push(rest.to_string());
        }
    }
    groups
}

fn values_at(record: &Value, fields: &[String]) -> Vec<Value> {
    fields
        .iter()
        .map(|field| record.get(field).cloned().unwrap_or(Value::Null))
        .collect()
}

fn set_member(record: &mut Value, name: &str, value: Value) {
    if let Value::Object(fields) = record {
        fields.insert(name.to_string(), value);
    }
}

impl RepositoryContext {
    pub(crate) fn resolve_fetch<'a>(
        &'a self,
        metadata: &'a EntityMetadata,
        records: &'a mut [Value],
        paths: &'a [String],
    ) -> FetchFuture<'a> {
        Box::pin(async move {
            if paths.is_empty() || records.is_empty() {
                return Ok(());
            }

            for (name, rest) in group_paths(paths) {
                let navigation = metadata.navigation(&name).ok_or_else(|| {
                    ModelError::Query(format!(
                        "'{}' is not a navigation of '{}'",
                        name, metadata.type_name
                    ))
                })?;
                let target = navigation.target()?;
                let foreign_key = navigation.foreign_key(metadata, &target)?;

                let rows = self.store.load(&target).await?;
                let mut related: Vec<Value> =
                    rows.iter().map(|row| target.from_storage(row)).collect();
                self.resolve_fetch(&target, &mut related, &rest).await?;

                for record in records.iter_mut() {
                    let joined = match navigation.kind {
                        NavigationKind::Reference => {
                            let wanted = values_at(record, &foreign_key);
                            if wanted.iter().all(Value::is_null) {
                                Value::Null
                            } else {
                                related
                                    .iter()
                                    .find(|candidate| {
                                        keys_equal(&target.key_values(candidate), &wanted)
                                    })
                                    .cloned()
                                    .unwrap_or(Value::Null)
                            }
                        }
                        NavigationKind::Collection => {
                            let owner_key = metadata.key_values(record);
                            Value::Array(
                                related
                                    .iter()
                                    .filter(|candidate| {
                                        keys_equal(&values_at(candidate, &foreign_key), &owner_key)
                                    })
                                    .cloned()
                                    .collect(),
                            )
                        }
                    };
                    set_member(record, &name, joined);
                }

                tracing::debug!(
                    entity = %metadata.type_name,
                    navigation = %name,
                    target = %target.type_name,
                    "fetched navigation"
                );
            }
            Ok(())
        })
    }
}
