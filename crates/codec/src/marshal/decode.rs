use super::{TYPE_KEY, VALUE_KEY};
use crate::document::{Document, Node, NodeId, Pattern, Value};
use chrono::{DateTime, Utc};
use keystone_core::{Error, Result};
use serde_json::{Map, Value as JsonValue};

#[derive(Default)]
pub(super) struct Decoder {
    doc: Document,
    /// Compound nodes in the order they were first read
    refs: Vec<NodeId>,
}

impl Decoder {
    pub(super) fn decode(mut self, json: JsonValue) -> Result<Document> {
        let root = self.value(json)?;
        self.doc.root = root;
        Ok(self.doc)
    }

    fn value(&mut self, json: JsonValue) -> Result<Value> {
        Ok(match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => Value::Number(
                n.as_f64()
                    .ok_or_else(|| malformed(format!("number {n} out of range")))?,
            ),
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => {
                let id = self.register(Node::array());
                let values = self.sequence(items)?;
                self.doc.nodes[id.0] = Node::Array(values);
                Value::Node(id)
            }
            JsonValue::Object(map) if map.contains_key(TYPE_KEY) => self.tagged(map)?,
            JsonValue::Object(map) => self.object(map)?,
        })
    }

    fn tagged(&mut self, mut map: Map<String, JsonValue>) -> Result<Value> {
        let kind = match map.remove(TYPE_KEY) {
            Some(JsonValue::String(kind)) => kind,
            other => return Err(malformed(format!("non-string type tag {other:?}"))),
        };
        let inner = map.remove(VALUE_KEY);

        Ok(match (kind.as_str(), inner) {
            ("nan", _) => Value::Number(f64::NAN),
            ("inf", _) => Value::Number(f64::INFINITY),
            ("-inf", _) => Value::Number(f64::NEG_INFINITY),
            ("date", Some(JsonValue::String(text))) => {
                let at = DateTime::parse_from_rfc3339(&text)
                    .map_err(|e| malformed(format!("date '{text}': {e}")))?;
                Value::Date(at.with_timezone(&Utc))
            }
            ("regex", Some(JsonValue::Object(fields))) => {
                let text = |name: &str| match fields.get(name) {
                    Some(JsonValue::String(s)) => Ok(s.clone()),
                    _ => Err(malformed(format!("regex without {name}"))),
                };
                Value::Regex(Pattern::new(text("source")?, text("flags")?))
            }
            ("set", Some(JsonValue::Array(items))) => {
                let id = self.register(Node::set());
                let values = self.sequence(items)?;
                self.doc.nodes[id.0] = Node::Set(values);
                Value::Node(id)
            }
            ("ref", Some(JsonValue::Number(index))) => {
                let id = index
                    .as_u64()
                    .and_then(|i| usize::try_from(i).ok())
                    .and_then(|i| self.refs.get(i).copied())
                    .ok_or_else(|| malformed(format!("unknown back-reference {index}")))?;
                Value::Node(id)
            }
            ("object", Some(JsonValue::Object(fields))) => self.object(fields)?,
            (kind, inner) => {
                return Err(malformed(format!(
                    "unknown or malformed '{kind}' value {inner:?}"
                )))
            }
        })
    }

    fn object(&mut self, map: Map<String, JsonValue>) -> Result<Value> {
        let id = self.register(Node::object());
        let mut fields = indexmap::IndexMap::with_capacity(map.len());
        for (key, item) in map {
            let value = self.value(item)?;
            fields.insert(key, value);
        }
        self.doc.nodes[id.0] = Node::Object(fields);
        Ok(Value::Node(id))
    }

    fn sequence(&mut self, items: Vec<JsonValue>) -> Result<Vec<Value>> {
        items.into_iter().map(|item| self.value(item)).collect()
    }

    fn register(&mut self, placeholder: Node) -> NodeId {
        let id = self.doc.alloc(placeholder);
        self.refs.push(id);
        id
    }
}

fn malformed(message: String) -> Error {
    Error::serialization("unmarshal", message)
}
