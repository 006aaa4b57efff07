//! Document loading: read a YAML file and convert it into a [`Node`] tree.

use std::path::Path;

use serde_yaml::Value;

use crate::error::BootstrapError;
use crate::node::Node;

/// Read and parse the document at `path`.
pub fn load_document(path: &Path) -> Result<Node, BootstrapError> {
    let content = std::fs::read_to_string(path).map_err(|e| BootstrapError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_document(&content, path)
}

/// Parse YAML text into a [`Node`] tree. `origin` is only used for error messages.
///
/// An empty (or comment-only) document yields an empty mapping.
pub fn parse_document(content: &str, origin: &Path) -> Result<Node, BootstrapError> {
    if is_blank(content) {
        return Ok(Node::Mapping(Vec::new()));
    }

    let value: Value = serde_yaml::from_str(content).map_err(|e| BootstrapError::Parse {
        path: origin.to_path_buf(),
        source: e,
    })?;

    if value.is_null() {
        return Ok(Node::Mapping(Vec::new()));
    }

    Node::try_from(value).map_err(|reason| BootstrapError::MalformedDocument {
        path: origin.to_path_buf(),
        reason,
    })
}

fn is_blank(content: &str) -> bool {
    content
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#') || line == "---")
}
