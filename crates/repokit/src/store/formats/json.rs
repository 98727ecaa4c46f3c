//! JSON: a pretty-printed array of row objects

use serde_json::Value;

use super::expect_object;
use crate::error::ModelResult;

pub(super) fn encode(rows: &[Value]) -> ModelResult<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(rows)?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub(super) fn decode(bytes: &[u8]) -> ModelResult<Vec<Value>> {
    let rows: Vec<Value> = serde_json::from_slice(bytes)?;
    rows.into_iter()
        .map(|row| expect_object(row).map(Value::Object))
        .collect()
}
