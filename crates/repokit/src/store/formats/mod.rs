//! Flat-file formats for entity sets
//!
//! Each format turns the rows of one entity set into a file body and back.
//! Rows are JSON objects keyed by column name; decoding never drops a column
//! it does not know about.

mod delimited;
mod json;
mod xml;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::conventions::EntityMetadata;
use crate::error::{ModelError, ModelResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Json,
    Xml,
    Csv,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Json => "json",
            FileFormat::Xml => "xml",
            FileFormat::Csv => "csv",
        }
    }

    pub fn encode(&self, metadata: &EntityMetadata, rows: &[Value]) -> ModelResult<Vec<u8>> {
        match self {
            FileFormat::Json => json::encode(rows),
            FileFormat::Xml => xml::encode(&metadata.table_name, rows),
            FileFormat::Csv => delimited::encode(&columns_of(metadata, rows), rows),
        }
    }

    /// Blank input decodes to an empty set
    pub fn decode(&self, metadata: &EntityMetadata, bytes: &[u8]) -> ModelResult<Vec<Value>> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        match self {
            FileFormat::Json => json::decode(bytes),
            FileFormat::Xml => xml::decode(bytes),
            FileFormat::Csv => delimited::decode(bytes),
        }
        .map_err(|e| match e {
            ModelError::Serialization(message) => ModelError::Serialization(format!(
                "{} set '{}': {}",
                self, metadata.table_name, message
            )),
            other => other,
        })
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for FileFormat {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(FileFormat::Json),
            "xml" => Ok(FileFormat::Xml),
            "csv" => Ok(FileFormat::Csv),
            other => Err(ModelError::Configuration(format!(
                "unknown file format '{}'; expected json, xml or csv",
                other
            ))),
        }
    }
}

/// Declared columns first, then any extra columns carried by the rows
fn columns_of(metadata: &EntityMetadata, rows: &[Value]) -> Vec<String> {
    let mut columns: Vec<String> = metadata.columns().into_iter().map(String::from).collect();
    for row in rows {
        if let Value::Object(map) = row {
            for key in map.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }
    columns
}

/// Type tag written next to values in XML and CSV
fn type_tag(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "bool",
        Value::Null => "null",
        Value::Array(_) | Value::Object(_) => "json",
    }
}

/// Rebuild a value from its text form and type tag
fn parse_typed(text: &str, tag: &str) -> ModelResult<Value> {
    let invalid =
        |kind: &str| ModelError::Serialization(format!("invalid {} value '{}'", kind, text));
    match tag {
        "string" => Ok(Value::String(text.to_string())),
        "number" => serde_json::Number::from_str(text.trim())
            .map(Value::Number)
            .map_err(|_| invalid("number")),
        "bool" => match text.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid("bool")),
        },
        "null" => Ok(Value::Null),
        "json" => serde_json::from_str(text).map_err(|_| invalid("json")),
        other => Err(ModelError::Serialization(format!("unknown value type '{}'", other))),
    }
}

fn expect_object(row: Value) -> ModelResult<serde_json::Map<String, Value>> {
    match row {
        Value::Object(map) => Ok(map),
        other => Err(ModelError::Serialization(format!(
            "expected a row object, found {}",
            type_tag(&other)
        ))),
    }
}
