//! The write side of an import: anything that can persist a key/value pair.

use std::collections::BTreeMap;

use crate::error::BootstrapError;

/// Destination for write records.
///
/// A `put` either completes or returns an error; the flattener never retries.
/// Writing the same key twice replaces the earlier value.
pub trait Sink {
    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), BootstrapError>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), BootstrapError> {
        (**self).put(key, value)
    }
}

/// In-memory sink backed by an ordered map. Used for `--dry-run` and tests.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MemorySink {
    entries: BTreeMap<String, Vec<u8>>,
    writes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total `put` calls, including overwrites.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn entries(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.entries
    }
}

impl Sink for MemorySink {
    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), BootstrapError> {
        self.entries.insert(key.to_string(), value.to_vec());
        self.writes += 1;
        Ok(())
    }
}
