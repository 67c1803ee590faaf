//! Interop with plain JSON and serde types
//!
//! Plain JSON cannot carry dates, patterns, sets, non-finite numbers or
//! shared references. Going from JSON to a [`Document`] is lossless; going
//! back flattens those into their nearest JSON shape and rejects cycles.

use crate::document::{Document, Node, NodeId, Value};
use chrono::SecondsFormat;
use keystone_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

impl From<JsonValue> for Document {
    fn from(json: JsonValue) -> Self {
        let mut doc = Document::new();
        let root = import(&mut doc, json);
        doc.root = root;
        doc
    }
}

fn import(doc: &mut Document, json: JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(b),
        JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        JsonValue::String(s) => Value::String(s),
        JsonValue::Array(items) => {
            let id = doc.alloc(Node::array());
            let values = items.into_iter().map(|item| import(doc, item)).collect();
            doc.nodes[id.0] = Node::Array(values);
            Value::Node(id)
        }
        JsonValue::Object(fields) => {
            let id = doc.alloc(Node::object());
            let values = fields
                .into_iter()
                .map(|(key, item)| (key, import(doc, item)))
                .collect();
            doc.nodes[id.0] = Node::Object(values);
            Value::Node(id)
        }
    }
}

impl Document {
    /// Build a document from any serializable value
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(serde_json::to_value(value)?.into())
    }

    /// Deserialize the document into a concrete type through its JSON shape
    pub fn to_deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_json()?)?)
    }

    /// Plain JSON view of the document
    ///
    /// Dates become RFC 3339 strings, patterns become `/source/flags`,
    /// sets become arrays and non-finite numbers become `null`. Fails with
    /// [`Error::Cycle`] when the graph loops back on itself.
    pub fn to_json(&self) -> Result<JsonValue> {
        let mut stack = Vec::new();
        export(self, &self.root, &mut stack)
    }
}

/// Largest magnitude below which every integral f64 is exactly an i64
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// JSON number for a finite value, written as an integer when it is one
pub(crate) fn finite_number(n: f64) -> Option<JsonValue> {
    if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER && !(n == 0.0 && n.is_sign_negative()) {
        return Some(JsonValue::from(n as i64));
    }
    serde_json::Number::from_f64(n).map(JsonValue::Number)
}

fn export(doc: &Document, value: &Value, stack: &mut Vec<NodeId>) -> Result<JsonValue> {
    Ok(match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Number(n) => finite_number(*n).unwrap_or(JsonValue::Null),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Date(at) => JsonValue::String(at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Value::Regex(pattern) => JsonValue::String(pattern.to_string()),
        Value::Node(id) => {
            if stack.contains(id) {
                return Err(Error::cycle(format!("node {id}")));
            }
            let node = doc
                .node(*id)
                .ok_or_else(|| Error::serialization("json", format!("dangling node {id}")))?;

            stack.push(*id);
            let json = match node {
                Node::Array(items) | Node::Set(items) => JsonValue::Array(
                    items
                        .iter()
                        .map(|item| export(doc, item, stack))
                        .collect::<Result<_>>()?,
                ),
                Node::Object(fields) => {
                    let mut map = Map::with_capacity(fields.len());
                    for (key, item) in fields {
                        map.insert(key.clone(), export(doc, item, stack)?);
                    }
                    JsonValue::Object(map)
                }
            };
            stack.pop();
            json
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Job {
        name: String,
        retries: u32,
        tags: Vec<String>,
    }

    #[test]
    fn test_serde_round_trip() {
        let job = Job {
            name: "nightly".to_string(),
            retries: 2,
            tags: vec!["a".to_string(), "b".to_string()],
        };

        let doc = Document::from_serialize(&job).unwrap();
        assert_eq!(doc.to_deserialize::<Job>().unwrap(), job);
    }

    #[test]
    fn test_json_keeps_dollar_keys_as_data() {
        let doc = Document::from(json!({"$type": "date", "value": 5}));
        assert_eq!(doc.to_json().unwrap(), json!({"$type": "date", "value": 5}));
    }

    #[test]
    fn test_shared_nodes_are_duplicated() {
        let mut doc = Document::new();
        let shared = doc.alloc(Node::Array(vec![Value::from(1)]));
        let root = doc.alloc(Node::object());
        doc.insert(root, "a", shared.into());
        doc.insert(root, "b", shared.into());
        doc.set_root(root.into());

        assert_eq!(doc.to_json().unwrap(), json!({"a": [1], "b": [1]}));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut doc = Document::new();
        let root = doc.alloc(Node::array());
        doc.push(root, root.into());
        doc.set_root(root.into());

        assert!(matches!(doc.to_json(), Err(Error::Cycle { .. })));
    }
}
