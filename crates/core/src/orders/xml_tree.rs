//! Generic XML to JSON tree conversion.
//!
//! Leaf elements become strings, elements with children become objects and
//! a child name that occurs more than once becomes an array. That last rule
//! is what makes a one-order response look different from a two-order one,
//! which `OneOrMany` then normalises. Attributes are ignored.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlTreeError {
    #[error("malformed XML: {0}")]
    Malformed(String),

    #[error("document has no root element")]
    Empty,
}

struct Frame {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Map::new(),
            text: String::new(),
        }
    }

    fn into_value(self) -> (String, Value) {
        let value = if self.children.is_empty() {
            Value::String(self.text)
        } else {
            Value::Object(self.children)
        };
        (self.name, value)
    }
}

fn insert_child(parent: &mut Map<String, Value>, name: String, value: Value) {
    match parent.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            parent.insert(name, value);
        }
    }
}

/// Parses `xml` into a tree rooted at an object holding the document element.
pub fn xml_to_value(xml: &str) -> Result<Value, XmlTreeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = vec![Frame::new(String::new())];

    loop {
        let event = reader
            .read_event()
            .map_err(|e| XmlTreeError::Malformed(e.to_string()))?;

        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                stack.push(Frame::new(name));
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if let Some(parent) = stack.last_mut() {
                    insert_child(&mut parent.children, name, Value::String(String::new()));
                }
            }
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| XmlTreeError::Malformed(e.to_string()))?;
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text);
                }
            }
            Event::CData(c) => {
                let bytes = c.into_inner();
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&bytes));
                }
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    return Err(XmlTreeError::Malformed("unbalanced end tag".to_string()));
                }
                let (name, value) = stack.pop().map(Frame::into_value).ok_or(XmlTreeError::Empty)?;
                if let Some(parent) = stack.last_mut() {
                    insert_child(&mut parent.children, name, value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(XmlTreeError::Malformed("unclosed element".to_string()));
    }
    let root = stack.pop().ok_or(XmlTreeError::Empty)?;
    if root.children.is_empty() {
        return Err(XmlTreeError::Empty);
    }
    Ok(Value::Object(root.children))
}
