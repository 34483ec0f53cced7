//! Validation functionality
//!
//! Provides input validation for export selections and import bundles.

pub mod input;

pub use input::{ValidationError, ValidationResult, validate_entity_id, validate_flag};
