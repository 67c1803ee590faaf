use super::{MarshalOptions, TYPE_KEY, VALUE_KEY};
use crate::document::{Document, Node, NodeId, Value};
use crate::json::finite_number;
use chrono::SecondsFormat;
use keystone_core::{Error, Result};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

pub(super) struct Encoder<'a> {
    doc: &'a Document,
    options: MarshalOptions,
    /// First-seen index of every compound node written so far
    seen: HashMap<NodeId, usize>,
    /// Nodes currently being written, outermost first
    stack: Vec<NodeId>,
    /// Location of the value being written, for cycle errors
    path: Vec<String>,
}

impl<'a> Encoder<'a> {
    pub(super) fn new(doc: &'a Document, options: MarshalOptions) -> Self {
        Self {
            doc,
            options,
            seen: HashMap::new(),
            stack: Vec::new(),
            path: Vec::new(),
        }
    }

    pub(super) fn encode(mut self) -> Result<JsonValue> {
        let root = self.doc.root();
        self.value(root)
    }

    fn value(&mut self, value: &Value) -> Result<JsonValue> {
        Ok(match value {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => match finite_number(*n) {
                Some(json) => json,
                None if n.is_nan() => tagged("nan", None),
                None if *n > 0.0 => tagged("inf", None),
                None => tagged("-inf", None),
            },
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Date(at) => tagged(
                "date",
                Some(JsonValue::String(
                    at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                )),
            ),
            Value::Regex(pattern) => {
                let mut fields = Map::new();
                if self.options.symmetric {
                    fields.insert("flags".into(), pattern.flags.clone().into());
                    fields.insert("source".into(), pattern.source.clone().into());
                } else {
                    fields.insert("source".into(), pattern.source.clone().into());
                    fields.insert("flags".into(), pattern.flags.clone().into());
                }
                tagged("regex", Some(JsonValue::Object(fields)))
            }
            Value::Node(id) => self.node(*id)?,
        })
    }

    fn node(&mut self, id: NodeId) -> Result<JsonValue> {
        if self.options.circular {
            if let Some(index) = self.seen.get(&id) {
                return Ok(tagged("ref", Some(JsonValue::from(*index))));
            }
            let index = self.seen.len();
            self.seen.insert(id, index);
        } else if self.stack.contains(&id) {
            return Err(Error::cycle(self.location()));
        }

        let doc = self.doc;
        let node = doc
            .node(id)
            .ok_or_else(|| Error::serialization("marshal", format!("dangling node {id}")))?;

        self.stack.push(id);
        let json = match node {
            Node::Array(items) => JsonValue::Array(self.sequence(items)?),
            Node::Set(items) if self.options.symmetric => {
                let ordered = self.canonical_order(items);
                tagged("set", Some(JsonValue::Array(self.sequence(&ordered)?)))
            }
            Node::Set(items) => tagged("set", Some(JsonValue::Array(self.sequence(items)?))),
            Node::Object(fields) => {
                let mut entries: Vec<_> = fields.iter().collect();
                if self.options.symmetric {
                    entries.sort_by(|(a, _), (b, _)| a.cmp(b));
                }

                let mut map = Map::with_capacity(entries.len());
                for (key, item) in entries {
                    self.path.push(format!(".{key}"));
                    let encoded = self.value(item)?;
                    self.path.pop();
                    map.insert(key.clone(), encoded);
                }

                if map.contains_key(TYPE_KEY) {
                    tagged("object", Some(JsonValue::Object(map)))
                } else {
                    JsonValue::Object(map)
                }
            }
        };
        self.stack.pop();

        Ok(json)
    }

    fn sequence(&mut self, items: &[Value]) -> Result<Vec<JsonValue>> {
        let mut encoded = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            self.path.push(format!("[{index}]"));
            encoded.push(self.value(item)?);
            self.path.pop();
        }
        Ok(encoded)
    }

    /// Set members sorted by their own standalone encoding
    ///
    /// Members are then written in that order, so back-reference indices
    /// still follow the output.
    fn canonical_order(&self, items: &[Value]) -> Vec<Value> {
        let mut keyed: Vec<(String, &Value)> = items
            .iter()
            .map(|item| {
                let mut standalone = Encoder::new(self.doc, self.options);
                // A member that fails here fails again when written for real
                let key = standalone
                    .value(item)
                    .map(|json| json.to_string())
                    .unwrap_or_default();
                (key, item)
            })
            .collect();
        keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
        keyed.into_iter().map(|(_, item)| item.clone()).collect()
    }

    fn location(&self) -> String {
        format!("${}", self.path.concat())
    }
}

fn tagged(kind: &str, value: Option<JsonValue>) -> JsonValue {
    let mut map = Map::with_capacity(2);
    map.insert(TYPE_KEY.to_string(), JsonValue::String(kind.to_string()));
    if let Some(value) = value {
        map.insert(VALUE_KEY.to_string(), value);
    }
    JsonValue::Object(map)
}
