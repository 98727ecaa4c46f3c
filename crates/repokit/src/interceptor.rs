//! Interceptors - hooks around repository writes
//!
//! Executing hooks run when a change is staged and may rewrite the record or
//! abort the operation. Executed hooks run after a successful commit.
//! Records are entity-shaped JSON objects.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use crate::conventions::EntityMetadata;
use crate::error::{ModelError, ModelResult};

#[async_trait]
pub trait RepositoryInterceptor: Send + Sync {
    async fn add_executing(
        &self,
        _metadata: &EntityMetadata,
        _record: &mut Value,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn add_executed(
        &self,
        _metadata: &EntityMetadata,
        _record: &Value,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn update_executing(
        &self,
        _metadata: &EntityMetadata,
        _record: &mut Value,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn update_executed(
        &self,
        _metadata: &EntityMetadata,
        _record: &Value,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn delete_executing(
        &self,
        _metadata: &EntityMetadata,
        _record: &mut Value,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn delete_executed(
        &self,
        _metadata: &EntityMetadata,
        _record: &Value,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Write operation an interceptor is invoked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptedOperation {
    Add,
    Update,
    Delete,
}

/// Ordered interceptor chain; the first failure stops the chain
#[derive(Clone, Default)]
pub struct InterceptorRegistry {
    interceptors: Vec<Arc<dyn RepositoryInterceptor>>,
}

impl InterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, interceptor: Arc<dyn RepositoryInterceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub async fn trigger_executing(
        &self,
        operation: InterceptedOperation,
        metadata: &EntityMetadata,
        record: &mut Value,
    ) -> ModelResult<()> {
        for interceptor in &self.interceptors {
            let outcome = match operation {
                InterceptedOperation::Add => interceptor.add_executing(metadata, record).await,
                InterceptedOperation::Update => {
                    interceptor.update_executing(metadata, record).await
                }
                InterceptedOperation::Delete => {
                    interceptor.delete_executing(metadata, record).await
                }
            };
            outcome.map_err(|e| {
                ModelError::Interceptor(format!(
                    "{:?} of '{}' rejected: {:#}",
                    operation, metadata.type_name, e
                ))
            })?;
        }
        Ok(())
    }

    pub async fn trigger_executed(
        &self,
        operation: InterceptedOperation,
        metadata: &EntityMetadata,
        record: &Value,
    ) -> ModelResult<()> {
        for interceptor in &self.interceptors {
            let outcome = match operation {
                InterceptedOperation::Add => interceptor.add_executed(metadata, record).await,
                InterceptedOperation::Update => interceptor.update_executed(metadata, record).await,
                InterceptedOperation::Delete => interceptor.delete_executed(metadata, record).await,
            };
            outcome.map_err(ModelError::from)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for InterceptorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorRegistry")
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

/// Stamps who changed an entity and when
///
/// Applies to entities that declare `created_by` / `created_at` and
/// `modified_by` / `modified_at` fields; other entities pass through.
#[derive(Debug, Clone)]
pub struct AuditInterceptor {
    user: String,
}

impl AuditInterceptor {
    pub fn new(user: &str) -> Self {
        Self {
            user: user.to_string(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    fn stamp(
        &self,
        metadata: &EntityMetadata,
        record: &mut Value,
        by: &str,
        at: &str,
    ) -> anyhow::Result<()> {
        let Value::Object(fields) = record else {
            anyhow::bail!("audited record of '{}' is not an object", metadata.type_name);
        };
        if metadata.field(by).is_some() {
            fields.insert(by.to_string(), Value::String(self.user.clone()));
        }
        if metadata.field(at).is_some() {
            fields.insert(at.to_string(), serde_json::to_value(Utc::now())?);
        }
        Ok(())
    }
}

#[async_trait]
impl RepositoryInterceptor for AuditInterceptor {
    async fn add_executing(
        &self,
        metadata: &EntityMetadata,
        record: &mut Value,
    ) -> anyhow::Result<()> {
        self.stamp(metadata, record, "created_by", "created_at")
    }

    async fn update_executing(
        &self,
        metadata: &EntityMetadata,
        record: &mut Value,
    ) -> anyhow::Result<()> {
        self.stamp(metadata, record, "modified_by", "modified_at")
    }
}
