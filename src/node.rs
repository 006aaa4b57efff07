//! In-memory document tree.
//!
//! Every YAML value maps to exactly one of three node kinds. The conversion
//! from [`serde_yaml::Value`] is total except for mapping keys that are not
//! themselves scalars (a YAML mapping or sequence used as a key), which have no
//! sensible key-path representation and are rejected.

use serde_yaml::Value;

/// A node of the imported document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A nesting level. Entries keep document order; keys are unique.
    Mapping(Vec<(String, Node)>),
    /// A list of file paths whose contents are concatenated into one value.
    Sequence(Vec<Node>),
    /// A leaf text value.
    Scalar(String),
}

impl Node {
    /// Shorthand for building a scalar leaf.
    pub fn scalar(value: impl Into<String>) -> Self {
        Node::Scalar(value.into())
    }

    /// Shorthand for building a mapping from `(key, child)` pairs.
    pub fn mapping<K: Into<String>>(entries: impl IntoIterator<Item = (K, Node)>) -> Self {
        Node::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Shorthand for building an include list from file paths.
    pub fn sequence<P: Into<String>>(paths: impl IntoIterator<Item = P>) -> Self {
        Node::Sequence(paths.into_iter().map(|p| Node::Scalar(p.into())).collect())
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Number of leaves (scalars and sequences) under this node.
    pub fn leaf_count(&self) -> usize {
        match self {
            Node::Mapping(entries) => entries.iter().map(|(_, child)| child.leaf_count()).sum(),
            Node::Sequence(_) | Node::Scalar(_) => 1,
        }
    }
}

impl TryFrom<Value> for Node {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Mapping(map) => {
                let mut entries = Vec::with_capacity(map.len());
                for (key, child) in map {
                    let key = scalar_text(key).ok_or("mapping keys must be scalars")?;
                    entries.push((key, Node::try_from(child)?));
                }
                Ok(Node::Mapping(entries))
            }
            Value::Sequence(items) => items
                .into_iter()
                .map(Node::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Node::Sequence),
            Value::Tagged(tagged) => Node::try_from(tagged.value),
            scalar => scalar_text(scalar)
                .map(Node::Scalar)
                .ok_or_else(|| "unsupported value".to_string()),
        }
    }
}

/// Textual form of a scalar YAML value; `None` for collections.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Tagged(tagged) => scalar_text(tagged.value),
        Value::Mapping(_) | Value::Sequence(_) => None,
    }
}
