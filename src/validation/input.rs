//! Input validation utilities.
//!
//! Checks caller-supplied values before the engines touch storage: export
//! selection flags and the ids carried by an import bundle.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Maximum length for entity ids
pub const MAX_ID_LENGTH: usize = 255;

/// Errors that can occur during input validation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    /// Input is empty when a value is required
    #[error("{0} cannot be empty")]
    Empty(String),

    /// Input exceeds maximum allowed length
    #[error("{field} exceeds maximum length (max: {max}, got: {actual})")]
    TooLong {
        field: String,
        max: usize,
        actual: usize,
    },

    /// Input contains invalid characters
    #[error("{field} contains invalid characters: {reason}")]
    InvalidCharacters { field: String, reason: String },

    /// A flag was given a non-boolean value
    #[error("{field} must be a boolean, got {actual}")]
    NotBoolean { field: String, actual: String },

    /// Key not recognized
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// Input has invalid format
    #[error("{0}: {1}")]
    InvalidFormat(String, String),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Read a boolean flag. Anything else, `null` included, is rejected.
pub fn validate_flag(field: &str, value: &Value) -> ValidationResult<bool> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        other => Err(ValidationError::NotBoolean {
            field: field.to_string(),
            actual: json_type_name(other).to_string(),
        }),
    }
}

/// Validate an entity id carried in an import bundle.
///
/// # Rules
///
/// - Must not be empty or whitespace
/// - Must not exceed 255 characters
/// - Must not contain control characters
pub fn validate_entity_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Empty(field.to_string()));
    }

    if id.len() > MAX_ID_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_ID_LENGTH,
            actual: id.len(),
        });
    }

    if let Some(c) = id.chars().find(|c| c.is_control()) {
        return Err(ValidationError::InvalidCharacters {
            field: field.to_string(),
            reason: format!("control character U+{:04X}", c as u32),
        });
    }

    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
