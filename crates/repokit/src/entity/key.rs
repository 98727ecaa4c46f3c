//! Key System - Scalar and composite key types for repositories
//!
//! A repository is parameterized by its key type. Scalar keys have arity one;
//! tuples of scalar keys form composite keys whose parts follow the entity's
//! key order.

use serde_json::Value;
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};

/// A single key component
pub trait KeyPart: Clone + std::fmt::Debug + Send + Sync + 'static {
    fn to_value(&self) -> Value;
    fn from_value(value: &Value) -> ModelResult<Self>;
}

/// Key type of a repository
pub trait EntityKey: Clone + std::fmt::Debug + Send + Sync + 'static {
    /// Number of key parts
    const ARITY: usize;

    fn to_values(&self) -> Vec<Value>;
    fn from_values(values: &[Value]) -> ModelResult<Self>;
}

fn part_from_value<T: serde::de::DeserializeOwned>(value: &Value) -> ModelResult<T> {
    serde_json::from_value(value.clone()).map_err(|e| {
        ModelError::Serialization(format!("invalid key part {}: {}", value, e))
    })
}

macro_rules! impl_numeric_key {
    ($($ty:ty),*) => {
        $(
            impl KeyPart for $ty {
                fn to_value(&self) -> Value {
                    Value::from(*self)
                }

                fn from_value(value: &Value) -> ModelResult<Self> {
                    part_from_value(value)
                }
            }
        )*
    };
}

impl_numeric_key!(i16, i32, i64, u16, u32, u64);

impl KeyPart for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: &Value) -> ModelResult<Self> {
        part_from_value(value)
    }
}

impl KeyPart for Uuid {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }

    fn from_value(value: &Value) -> ModelResult<Self> {
        part_from_value(value)
    }
}

fn expect_arity(values: &[Value], arity: usize) -> ModelResult<()> {
    if values.len() != arity {
        return Err(ModelError::InvalidParameter(format!(
            "expected {} key part(s), got {}",
            arity,
            values.len()
        )));
    }
    Ok(())
}

macro_rules! impl_scalar_entity_key {
    ($($ty:ty),*) => {
        $(
            impl EntityKey for $ty {
                const ARITY: usize = 1;

                fn to_values(&self) -> Vec<Value> {
                    vec![self.to_value()]
                }

                fn from_values(values: &[Value]) -> ModelResult<Self> {
                    expect_arity(values, 1)?;
                    <$ty as KeyPart>::from_value(&values[0])
                }
            }
        )*
    };
}

impl_scalar_entity_key!(i16, i32, i64, u16, u32, u64, String, Uuid);

impl<A: KeyPart, B: KeyPart> EntityKey for (A, B) {
    const ARITY: usize = 2;

    fn to_values(&self) -> Vec<Value> {
        vec![self.0.to_value(), self.1.to_value()]
    }

    fn from_values(values: &[Value]) -> ModelResult<Self> {
        expect_arity(values, 2)?;
        Ok((A::from_value(&values[0])?, B::from_value(&values[1])?))
    }
}

impl<A: KeyPart, B: KeyPart, C: KeyPart> EntityKey for (A, B, C) {
    const ARITY: usize = 3;

    fn to_values(&self) -> Vec<Value> {
        vec![self.0.to_value(), self.1.to_value(), self.2.to_value()]
    }

    fn from_values(values: &[Value]) -> ModelResult<Self> {
        expect_arity(values, 3)?;
        Ok((
            A::from_value(&values[0])?,
            B::from_value(&values[1])?,
            C::from_value(&values[2])?,
        ))
    }
}

/// Human readable key for messages: `7` or `(7, 2)`
pub fn format_key(values: &[Value]) -> String {
    match values {
        [single] => single.to_string(),
        parts => {
            let parts: Vec<String> = parts.iter().map(|v| v.to_string()).collect();
            format!("({})", parts.join(", "))
        }
    }
}
