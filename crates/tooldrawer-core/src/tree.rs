//! Persistent JSON tree
//!
//! [`Node`] carries the same shapes as `serde_json::Value`, but its
//! containers live behind `Arc`. Cloning a node is O(1), and the update
//! helpers in [`crate::paths`] copy only the containers on the path they
//! modify, so untouched subtrees stay pointer-identical across versions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Map type backing [`Node::Object`]
pub type NodeMap = BTreeMap<String, Node>;

/// An immutable, structurally shared JSON value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Node {
    /// JSON `null`
    #[default]
    Null,
    /// JSON boolean
    Bool(bool),
    /// JSON number
    Number(Number),
    /// JSON string
    String(String),
    /// JSON array
    Array(Arc<Vec<Node>>),
    /// JSON object
    Object(Arc<NodeMap>),
}

impl Node {
    /// Build an object node from key/value pairs
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Node)>,
    {
        Node::Object(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Build an array node
    pub fn array(items: Vec<Node>) -> Self {
        Node::Array(Arc::new(items))
    }

    /// An empty object
    pub fn empty_object() -> Self {
        Node::Object(Arc::default())
    }

    /// Build a number node. Integral values are stored as integers so they
    /// serialize as `3` rather than `3.0`; non-finite values become `null`.
    pub fn from_f64(value: f64) -> Self {
        if !value.is_finite() {
            return Node::Null;
        }
        if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
            return Node::Number(Number::from(value as i64));
        }
        Number::from_f64(value).map_or(Node::Null, Node::Number)
    }

    /// Returns true for `null`
    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    /// Returns true for objects
    pub fn is_object(&self) -> bool {
        matches!(self, Node::Object(_))
    }

    /// Returns true for arrays
    pub fn is_array(&self) -> bool {
        matches!(self, Node::Array(_))
    }

    /// Boolean payload, if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// String payload, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric payload as `f64`, if this is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Node::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Array elements, if this is an array
    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Node::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Object entries, if this is an object
    pub fn as_object(&self) -> Option<&NodeMap> {
        match self {
            Node::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Look up an object member
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Short type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "boolean",
            Node::Number(_) => "number",
            Node::String(_) => "string",
            Node::Array(_) => "array",
            Node::Object(_) => "object",
        }
    }

    /// Identity comparison: containers compare by pointer, scalars by value.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Array(a), Node::Array(b)) => Arc::ptr_eq(a, b),
            (Node::Object(a), Node::Object(b)) => Arc::ptr_eq(a, b),
            (Node::Array(_) | Node::Object(_), _) | (_, Node::Array(_) | Node::Object(_)) => false,
            _ => self == other,
        }
    }

    /// Mutable access to the object map, replacing any non-object value
    /// with an empty object first. Clones the map if it is shared.
    pub fn make_object_mut(&mut self) -> &mut NodeMap {
        if !self.is_object() {
            *self = Node::empty_object();
        }
        match self {
            Node::Object(map) => Arc::make_mut(map),
            _ => unreachable!("non-object values were replaced above"),
        }
    }

    /// Convert into a `serde_json::Value`
    pub fn to_value(&self) -> Value {
        Value::from(self.clone())
    }

    /// Compact JSON with object keys in sorted order
    pub fn to_canonical_json(&self) -> String {
        // Object maps are ordered, so plain serialization is already canonical.
        self.to_value().to_string()
    }

    /// Text used when a node is interpolated into markup
    pub fn to_display_string(&self) -> String {
        match self {
            Node::Null => String::new(),
            Node::Bool(b) => b.to_string(),
            Node::Number(n) => n.to_string(),
            Node::String(s) => s.clone(),
            Node::Array(_) | Node::Object(_) => self.to_canonical_json(),
        }
    }
}

/// Format a number the way it appears in user-facing messages (`3`, `2.5`).
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_json())
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => Node::Number(n),
            Value::String(s) => Node::String(s),
            Value::Array(items) => Node::array(items.into_iter().map(Node::from).collect()),
            Value::Object(map) => Node::object(map.into_iter().map(|(k, v)| (k, Node::from(v)))),
        }
    }
}

impl From<&Value> for Node {
    fn from(value: &Value) -> Self {
        Node::from(value.clone())
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        match node {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(b),
            Node::Number(n) => Value::Number(n),
            Node::String(s) => Value::String(s),
            Node::Array(items) => Value::Array(items.iter().cloned().map(Value::from).collect()),
            Node::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::String(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::String(value)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Number(Number::from(value))
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::from_f64(value)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::array(items)
    }
}
