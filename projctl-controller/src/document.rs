//! Semi-structured resource documents.
//!
//! A [`Document`] wraps a JSON value and exposes the handful of well-known
//! fields the controller reads and writes. Everything else is carried through
//! copies untouched.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A resource document (`apiVersion`, `kind`, `metadata`, `spec`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Value);

impl Document {
    /// Wrap a value. Non-object values are accepted but have no well-known fields.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Build a minimal document with identity fields set.
    pub fn with_identity(api_version: &str, kind: &str, namespace: &str, name: &str) -> Self {
        let mut doc = Self(Value::Object(Map::new()));
        doc.set_str(&["apiVersion"], api_version);
        doc.set_str(&["kind"], kind);
        doc.set_str(&["metadata", "name"], name);
        if !namespace.is_empty() {
            doc.set_str(&["metadata", "namespace"], namespace);
        }
        doc
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn is_object(&self) -> bool {
        self.0.is_object()
    }

    pub fn api_version(&self) -> &str {
        self.str_at(&["apiVersion"])
    }

    pub fn kind(&self) -> &str {
        self.str_at(&["kind"])
    }

    pub fn name(&self) -> &str {
        self.str_at(&["metadata", "name"])
    }

    /// Namespace, empty when unset.
    pub fn namespace(&self) -> &str {
        self.str_at(&["metadata", "namespace"])
    }

    pub fn set_namespace(&mut self, namespace: &str) {
        self.set_str(&["metadata", "namespace"], namespace);
    }

    /// The `spec` sub-tree, if present and a mapping.
    pub fn spec(&self) -> Option<&Map<String, Value>> {
        self.get(&["spec"]).and_then(Value::as_object)
    }

    /// Replace the `spec` sub-tree, creating it if missing.
    pub fn set_spec(&mut self, spec: Map<String, Value>) {
        self.set(&["spec"], Value::Object(spec));
    }

    /// Value at a nested path of mapping keys.
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(&self.0, |node, key| node.get(*key))
    }

    /// Set the value at a nested path, creating intermediate mappings.
    ///
    /// Intermediate nodes that are not mappings are replaced by empty mappings.
    /// Does nothing when the document itself is not a mapping or `path` is empty.
    pub fn set(&mut self, path: &[&str], value: Value) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };
        let Some(mut node) = self.0.as_object_mut() else {
            return;
        };
        for key in parents {
            let child = node
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            node = match child.as_object_mut() {
                Some(map) => map,
                None => return,
            };
        }
        node.insert(last.to_string(), value);
    }

    fn set_str(&mut self, path: &[&str], value: &str) {
        self.set(path, Value::String(value.to_string()));
    }

    fn str_at(&self, path: &[&str]) -> &str {
        self.get(path).and_then(Value::as_str).unwrap_or("")
    }

    /// Semantic equality, see [`semantic_eq`].
    pub fn semantically_equal(&self, other: &Document) -> bool {
        semantic_eq(&self.0, &other.0)
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind(), self.name())
    }
}

/// Structural equality over JSON values.
///
/// Mapping key order is irrelevant and sequences are compared element-wise in
/// order. Numbers compare by numeric value, so `1` equals `1.0`.
pub fn semantic_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return x == y;
            }
            if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                return x == y;
            }
            match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| semantic_eq(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| semantic_eq(v, other)))
        }
        _ => false,
    }
}
