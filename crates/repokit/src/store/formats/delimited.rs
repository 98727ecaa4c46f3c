//! CSV: header of `column:type` cells, one record per row
//!
//! A column is typed from all of its values. Empty cells are null in
//! `number` and `bool` columns; `string` columns hold no nulls, and anything
//! mixed is written as JSON text so it reads back unchanged.

use csv::{ReaderBuilder, WriterBuilder};
use serde_json::{Map, Value};

use super::{expect_object, parse_typed};
use crate::error::{ModelError, ModelResult};

fn column_type<'a>(values: impl Iterator<Item = &'a Value>) -> &'static str {
    let values: Vec<&Value> = values.collect();
    let non_null: Vec<&&Value> = values.iter().filter(|v| !v.is_null()).collect();

    if values.is_empty() {
        "json"
    } else if values.iter().all(|v| v.is_string()) {
        "string"
    } else if non_null.is_empty() {
        "null"
    } else if non_null.iter().all(|v| v.is_number()) {
        "number"
    } else if non_null.iter().all(|v| v.is_boolean()) {
        "bool"
    } else {
        "json"
    }
}

fn cell(value: &Value, tag: &str) -> String {
    match (tag, value) {
        (_, Value::Null) if tag != "json" => String::new(),
        ("string", Value::String(s)) => s.clone(),
        (_, other) => other.to_string(),
    }
}

pub(super) fn encode(columns: &[String], rows: &[Value]) -> ModelResult<Vec<u8>> {
    let rows: Vec<Map<String, Value>> = rows
        .iter()
        .map(|row| expect_object(row.clone()))
        .collect::<ModelResult<_>>()?;

    let tags: Vec<&'static str> = columns
        .iter()
        .map(|column| column_type(rows.iter().map(|row| row.get(column).unwrap_or(&Value::Null))))
        .collect();

    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(
        columns
            .iter()
            .zip(&tags)
            .map(|(column, tag)| format!("{}:{}", column, tag)),
    )?;

    for row in &rows {
        writer.write_record(
            columns
                .iter()
                .zip(&tags)
                .map(|(column, tag)| cell(row.get(column).unwrap_or(&Value::Null), tag)),
        )?;
    }

    writer
        .into_inner()
        .map_err(|e| ModelError::from(e.into_error()))
}

pub(super) fn decode(bytes: &[u8]) -> ModelResult<Vec<Value>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(bytes);

    let header: Vec<(String, String)> = reader
        .headers()?
        .iter()
        .map(|cell| match cell.rsplit_once(':') {
            Some((column, tag)) => (column.to_string(), tag.to_string()),
            None => (cell.to_string(), "string".to_string()),
        })
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = Map::new();
        for ((column, tag), text) in header.iter().zip(record.iter()) {
            let value = match tag.as_str() {
                "number" | "bool" | "null" if text.is_empty() => Value::Null,
                _ => parse_typed(text, tag)?,
            };
            row.insert(column.clone(), value);
        }
        rows.push(Value::Object(row));
    }
    Ok(rows)
}
