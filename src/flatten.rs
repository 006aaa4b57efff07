//! Tree flattener: turns a [`Node`] tree into key/value writes.
//!
//! Walks the tree depth-first and derives a `/`-separated key path for every
//! node. Each leaf produces exactly one [`WriteRecord`]:
//!
//! - a scalar writes its text;
//! - a sequence is an include list: the files it names are read in order and
//!   their raw bytes concatenated into one value.
//!
//! Mappings only recurse. Records go to the [`Sink`] one at a time, and each
//! `put` must return before the walk moves on. The first failure stops the
//! walk; keys written before it stay written.
//!
//! ```text
//! prefix "/p", { a: { b: "x" }, c: [f1, f2] }
//!   → ("/p/a/b", "x")
//!   → ("/p/c", contents(f1) ++ contents(f2))
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::BootstrapError;
use crate::node::Node;
use crate::sink::Sink;

/// One key/value pair destined for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub key: String,
    pub value: Vec<u8>,
}

/// Totals for a completed walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    /// Records produced by scalar leaves.
    pub scalars: usize,
    /// Records produced by include lists.
    pub includes: usize,
    /// Sum of all value lengths written.
    pub bytes: usize,
}

impl ImportReport {
    pub fn records(&self) -> usize {
        self.scalars + self.includes
    }
}

/// Walks document trees and hands every leaf to a sink.
pub struct Flattener<S: Sink> {
    sink: S,
    include_root: Option<PathBuf>,
    report: ImportReport,
}

impl<S: Sink> Flattener<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            include_root: None,
            report: ImportReport::default(),
        }
    }

    /// Resolve relative include paths against `dir` instead of the working directory.
    pub fn include_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_root = Some(dir.into());
        self
    }

    /// Flatten `root` under `prefix`.
    ///
    /// Trailing `/` characters are stripped from `prefix` once, here. Keys below
    /// are joined verbatim, so a mapping key containing `/` adds extra levels.
    pub fn walk(&mut self, prefix: &str, root: &Node) -> Result<ImportReport, BootstrapError> {
        self.report = ImportReport::default();
        self.flatten(prefix.trim_end_matches('/'), root)?;
        Ok(self.report)
    }

    /// Flatten `node`, whose fully-qualified key is `path`.
    pub fn flatten(&mut self, path: &str, node: &Node) -> Result<(), BootstrapError> {
        match node {
            Node::Mapping(entries) => {
                for (key, child) in entries {
                    self.flatten(&format!("{path}/{key}"), child)?;
                }
                Ok(())
            }
            Node::Scalar(value) => {
                self.emit(WriteRecord {
                    key: path.to_string(),
                    value: value.as_bytes().to_vec(),
                })?;
                self.report.scalars += 1;
                info!("Key: \"{}\" Data: \"{}\"", path.trim_start_matches('/'), value);
                Ok(())
            }
            Node::Sequence(items) => {
                let value = self.concat_includes(path, items)?;
                let len = value.len();
                self.emit(WriteRecord {
                    key: path.to_string(),
                    value,
                })?;
                self.report.includes += 1;
                info!(
                    "Key: \"{}\" Data: \"File({} Bytes)\"",
                    path.trim_start_matches('/'),
                    len
                );
                Ok(())
            }
        }
    }

    /// The sink, for inspection after a walk.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn emit(&mut self, record: WriteRecord) -> Result<(), BootstrapError> {
        self.sink.put(&record.key, &record.value)?;
        self.report.bytes += record.value.len();
        Ok(())
    }

    fn concat_includes(&self, key: &str, items: &[Node]) -> Result<Vec<u8>, BootstrapError> {
        let mut buf = Vec::new();
        for item in items {
            let name = item
                .as_scalar()
                .ok_or_else(|| BootstrapError::MalformedInclude {
                    key: key.to_string(),
                    reason: "include list entries must be file paths".into(),
                })?;
            let path = self.resolve_include(name);
            let include_err = |source| BootstrapError::Include {
                key: key.to_string(),
                path: path.clone(),
                source,
            };
            let mut file = std::fs::File::open(&path).map_err(include_err)?;
            let read = file.read_to_end(&mut buf).map_err(include_err)?;
            debug!(key, path = %path.display(), bytes = read, "included file");
        }
        Ok(buf)
    }

    fn resolve_include(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        match &self.include_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// Flatten `root` under `prefix` into `sink` in a single call.
pub fn import<S: Sink>(prefix: &str, root: &Node, sink: S) -> Result<ImportReport, BootstrapError> {
    Flattener::new(sink).walk(prefix, root)
}
