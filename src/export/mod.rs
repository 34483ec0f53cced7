//! Export functionality
//!
//! Reads the selected entity categories of one organization into an
//! [`ExportBundle`] that can be written to disk or fed straight to the
//! import engine.

pub mod bundle;
pub mod exporter;
pub mod selection;

pub use bundle::{BundleCounts, ExportBundle};
pub use exporter::ExportEngine;
pub use selection::{ExportSelection, SELECTION_KEYS};
