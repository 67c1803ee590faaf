//! Arena-backed value graph

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::fmt;

/// Index of a compound node inside its [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A regular-expression pattern, kept as text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    pub source: String,
    pub flags: String,
}

impl Pattern {
    pub fn new(source: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            flags: flags.into(),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

/// A single value; compound values point into the document's arena
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    /// Any number, including NaN and the infinities
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
    Regex(Pattern),
    Node(NodeId),
}

impl Value {
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Value::Node(id) => Some(*id),
            _ => None,
        }
    }
}

/// A compound node
#[derive(Debug, Clone)]
pub enum Node {
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
    /// Insertion-ordered collection of members
    Set(Vec<Value>),
}

impl Node {
    pub fn array() -> Self {
        Node::Array(Vec::new())
    }

    pub fn object() -> Self {
        Node::Object(IndexMap::new())
    }

    pub fn set() -> Self {
        Node::Set(Vec::new())
    }

    pub fn len(&self) -> usize {
        match self {
            Node::Array(items) | Node::Set(items) => items.len(),
            Node::Object(fields) => fields.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A value together with the arena of compound nodes it references
///
/// Shared sub-values and cycles are expressed by several [`Value::Node`]s
/// carrying the same [`NodeId`].
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: Value,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document whose root is `null`
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: Value::Null,
        }
    }

    /// Document holding an array of scalar values
    pub fn array<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Self::with_root_node(Node::Array(items.into_iter().map(Into::into).collect()))
    }

    /// Document holding an object of scalar values
    pub fn object<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::with_root_node(Node::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    /// Document holding a set of scalar values
    pub fn set<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Self::with_root_node(Node::Set(items.into_iter().map(Into::into).collect()))
    }

    fn with_root_node(node: Node) -> Self {
        let mut doc = Self::new();
        let id = doc.alloc(node);
        doc.root = Value::Node(id);
        doc
    }

    /// Add a node to the arena
    pub fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Append to an array or set node; returns false for other nodes
    pub fn push(&mut self, id: NodeId, value: Value) -> bool {
        match self.node_mut(id) {
            Some(Node::Array(items)) | Some(Node::Set(items)) => {
                items.push(value);
                true
            }
            _ => false,
        }
    }

    /// Insert a field into an object node; returns false for other nodes
    pub fn insert(&mut self, id: NodeId, key: impl Into<String>, value: Value) -> bool {
        match self.node_mut(id) {
            Some(Node::Object(fields)) => {
                fields.insert(key.into(), value);
                true
            }
            _ => false,
        }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn set_root(&mut self, root: Value) {
        self.root = root;
    }

    /// Number of compound nodes in the arena
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The node a value points at, if any
    pub fn resolve(&self, value: &Value) -> Option<&Node> {
        value.as_node().and_then(|id| self.node(id))
    }

    pub fn root_node(&self) -> Option<&Node> {
        self.resolve(&self.root)
    }

    /// Field of the root object
    pub fn field(&self, key: &str) -> Option<&Value> {
        match self.root_node()? {
            Node::Object(fields) => fields.get(key),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.root, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.root {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.root {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.root {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self.root {
            Value::Date(at) => Some(at),
            _ => None,
        }
    }

    pub fn as_pattern(&self) -> Option<&Pattern> {
        match &self.root {
            Value::Regex(pattern) => Some(pattern),
            _ => None,
        }
    }
}

macro_rules! scalar_conversions {
    ($($source:ty => |$v:ident| $value:expr;)*) => {
        $(
            impl From<$source> for Value {
                fn from($v: $source) -> Self {
                    $value
                }
            }

            impl From<$source> for Document {
                fn from(v: $source) -> Self {
                    Document {
                        nodes: Vec::new(),
                        root: Value::from(v),
                    }
                }
            }
        )*
    };
}

scalar_conversions! {
    bool => |v| Value::Bool(v);
    f64 => |v| Value::Number(v);
    i32 => |v| Value::Number(f64::from(v));
    i64 => |v| Value::Number(v as f64);
    u32 => |v| Value::Number(f64::from(v));
    &str => |v| Value::String(v.to_string());
    String => |v| Value::String(v);
    DateTime<Utc> => |v| Value::Date(v);
    Pattern => |v| Value::Regex(v);
}

impl From<NodeId> for Value {
    fn from(id: NodeId) -> Self {
        Value::Node(id)
    }
}

impl From<()> for Document {
    fn from(_: ()) -> Self {
        Document::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_builder() {
        let doc = Document::object([("name", Value::from("build")), ("runs", 3.into())]);
        assert_eq!(doc.node_count(), 1);
        assert!(matches!(doc.field("name"), Some(Value::String(s)) if s == "build"));
        assert!(matches!(doc.field("runs"), Some(Value::Number(n)) if *n == 3.0));
        assert!(doc.field("missing").is_none());
    }

    #[test]
    fn test_push_only_into_sequences() {
        let mut doc = Document::new();
        let list = doc.alloc(Node::array());
        let map = doc.alloc(Node::object());

        assert!(doc.push(list, Value::Null));
        assert!(!doc.push(map, Value::Null));
        assert!(doc.insert(map, "k", true.into()));
        assert!(!doc.insert(list, "k", true.into()));
        assert_eq!(doc.node(list).map(Node::len), Some(1));
    }

    #[test]
    fn test_scalar_accessors() {
        assert_eq!(Document::from("x").as_str(), Some("x"));
        assert_eq!(Document::from(2.5).as_f64(), Some(2.5));
        assert_eq!(Document::from(true).as_bool(), Some(true));
        assert!(Document::from(()).is_null());
        assert_eq!(
            Document::from(Pattern::new("^a+$", "i")).as_pattern(),
            Some(&Pattern::new("^a+$", "i"))
        );
    }
}
