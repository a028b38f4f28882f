//! In-memory index of identifiers already present in the output sink.
//!
//! Rebuilt from the sink on every run and never persisted on its own, so the
//! output file stays the single source of truth.

use crate::output::{read_existing_ids, OutputResult};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Set of exported user identifiers
#[derive(Debug, Clone, Default)]
pub struct DedupIndex {
    ids: HashSet<String>,
}

impl DedupIndex {
    /// Empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan the sink at `path`. A missing sink yields an empty index.
    pub fn from_sink<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        let path = path.as_ref();
        let index: Self = read_existing_ids(path)?.into_iter().collect();
        info!(
            path = %path.display(),
            existing = index.len(),
            "Loaded identifiers already exported"
        );
        Ok(index)
    }

    /// Whether `id` was already exported
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Mark `id` as exported. Returns `false` when it was already present.
    pub fn add(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    /// Number of identifiers
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<String> for DedupIndex {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
