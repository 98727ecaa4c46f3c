//! XML: `<ArrayOf{Table}>` holding one `<{Table}>` element per row
//!
//! Every column is a child element carrying a `type` attribute so values come
//! back with their JSON kind. Text between rows is ignored when reading;
//! text inside a column element is kept verbatim.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};

use super::{expect_object, parse_typed, type_tag};
use crate::error::{ModelError, ModelResult};

pub(super) fn encode(table: &str, rows: &[Value]) -> ModelResult<Vec<u8>> {
    let root = format!("ArrayOf{}", table);
    let mut writer = Writer::new(Vec::new());

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Text(BytesText::new("\n")))?;
    writer.write_event(Event::Start(BytesStart::new(root.as_str())))?;
    writer.write_event(Event::Text(BytesText::new("\n")))?;

    for row in rows {
        let row = expect_object(row.clone())?;
        writer.write_event(Event::Start(BytesStart::new(table)))?;
        for (column, value) in &row {
            let mut element = BytesStart::new(column.as_str());
            element.push_attribute(("type", type_tag(value)));
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            writer.write_event(Event::Start(element))?;
            writer.write_event(Event::Text(BytesText::new(&text)))?;
            writer.write_event(Event::End(BytesEnd::new(column.as_str())))?;
        }
        writer.write_event(Event::End(BytesEnd::new(table)))?;
        writer.write_event(Event::Text(BytesText::new("\n")))?;
    }

    writer.write_event(Event::End(BytesEnd::new(root.as_str())))?;
    writer.write_event(Event::Text(BytesText::new("\n")))?;
    Ok(writer.into_inner())
}

/// Column element being read
struct OpenColumn {
    name: String,
    tag: String,
    text: String,
}

fn element_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

fn type_attribute(element: &BytesStart<'_>) -> ModelResult<String> {
    match element.try_get_attribute("type")? {
        Some(attribute) => Ok(attribute.unescape_value()?.into_owned()),
        None => Ok("string".to_string()),
    }
}

pub(super) fn decode(bytes: &[u8]) -> ModelResult<Vec<Value>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ModelError::Serialization(format!("xml is not utf-8: {}", e)))?;
    let mut reader = Reader::from_str(text);

    let mut rows = Vec::new();
    let mut depth = 0usize;
    let mut row: Option<Map<String, Value>> = None;
    let mut column: Option<OpenColumn> = None;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                depth += 1;
                match depth {
                    1 => {}
                    2 => row = Some(Map::new()),
                    3 => {
                        column = Some(OpenColumn {
                            name: element_name(element.name().as_ref()),
                            tag: type_attribute(&element)?,
                            text: String::new(),
                        })
                    }
                    _ => {
                        return Err(ModelError::Serialization(format!(
                            "unexpected nested element <{}>",
                            element_name(element.name().as_ref())
                        )))
                    }
                }
            }
            Event::Empty(element) => match (depth, row.as_mut()) {
                (1, _) => rows.push(Value::Object(Map::new())),
                (2, Some(current)) => {
                    let tag = type_attribute(&element)?;
                    current.insert(element_name(element.name().as_ref()), parse_typed("", &tag)?);
                }
                _ => {
                    return Err(ModelError::Serialization(format!(
                        "unexpected element <{}/>",
                        element_name(element.name().as_ref())
                    )))
                }
            },
            Event::Text(content) => {
                if let Some(open) = column.as_mut() {
                    open.text.push_str(&content.unescape()?);
                }
            }
            Event::CData(content) => {
                if let Some(open) = column.as_mut() {
                    open.text.push_str(&String::from_utf8_lossy(&content.into_inner()));
                }
            }
            Event::End(_) => {
                match depth {
                    3 => {
                        if let (Some(open), Some(current)) = (column.take(), row.as_mut()) {
                            let value = parse_typed(&open.text, &open.tag)?;
                            current.insert(open.name, value);
                        }
                    }
                    2 => {
                        if let Some(finished) = row.take() {
                            rows.push(Value::Object(finished));
                        }
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_shape() {
        let bytes = encode("Customer", &[json!({"id": 1, "name": "Ada"})]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(text.contains(
            "<ArrayOfCustomer>\n<Customer><id type=\"number\">1</id><name type=\"string\">Ada</name></Customer>\n</ArrayOfCustomer>"
        ));
    }

    #[test]
    fn test_reads_hand_written_documents() {
        let xml = r#"<?xml version="1.0"?>
            <ArrayOfCustomer>
              <Customer>
                <id type="number">7</id>
                <name>Grace</name>
                <manager type="null"/>
              </Customer>
            </ArrayOfCustomer>"#;
        let rows = decode(xml.as_bytes()).unwrap();
        assert_eq!(rows, vec![json!({"id": 7, "name": "Grace", "manager": null})]);
    }

    #[test]
    fn test_rejects_bad_values() {
        let xml = "<ArrayOfA><A><id type=\"number\">x</id></A></ArrayOfA>";
        assert!(decode(xml.as_bytes()).is_err());
    }
}
