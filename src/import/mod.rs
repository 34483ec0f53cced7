//! Import functionality
//!
//! Writes an [`ExportBundle`](crate::export::ExportBundle) into the
//! requester's organization inside one unit of work. Colliding ids are
//! regenerated and every reference to them rewritten; rows whose references
//! cannot be resolved are dropped instead of failing the import.

pub mod importer;
pub mod remap;

use crate::export::BundleCounts;
use serde::{Deserialize, Serialize};

pub use importer::ImportEngine;
pub use remap::{FOREIGN_KEYS, ForeignKey, IdMapping, foreign_keys_into};

/// Summary of a committed import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[must_use = "import results report dropped rows and should be checked"]
pub struct ImportResult {
    /// Rows saved per bundle category
    pub saved: BundleCounts,
    /// Chat messages whose flow could not be resolved
    pub dropped_messages: usize,
    /// Feedback rows whose flow or message could not be resolved
    pub dropped_feedback: usize,
    /// Message execution references cleared because the execution is unknown
    pub cleared_execution_refs: usize,
    /// Ids regenerated because they already existed in the store
    pub remapped_ids: usize,
    pub duration_ms: u64,
}

impl ImportResult {
    pub fn total_saved(&self) -> usize {
        self.saved.values().sum()
    }

    pub fn saved_for(&self, category: &str) -> usize {
        self.saved.get(category).copied().unwrap_or(0)
    }
}
