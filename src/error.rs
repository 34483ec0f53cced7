//! Service-level error taxonomy
//!
//! Export and import funnel every failure into [`ServiceError`]. Lower layers
//! keep their own error enums ([`DatabaseError`](crate::database::DatabaseError),
//! [`ValidationError`](crate::validation::ValidationError)) and are wrapped at
//! the engine boundary with [`ServiceError::internal`].

use serde::{Deserialize, Serialize};

/// Error returned by the export and import engines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ServiceError {
    /// Requester identity is missing or incomplete
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller input was rejected before any I/O
    #[error("Validation error: {0}")]
    Validation(String),

    /// Any other failure, prefixed with the failing operation's name
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for engine operations
pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Wrap an error raised while running `operation`.
    ///
    /// Unauthorized and validation errors are passed through untouched so the
    /// caller still sees the original class.
    pub fn internal(operation: &str, err: impl Into<ServiceError>) -> Self {
        match err.into() {
            ServiceError::Internal(message) => {
                ServiceError::Internal(format!("{} - {}", operation, message))
            }
            other => other,
        }
    }

    /// HTTP-style status code for an outer API layer
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Unauthorized(_) => 401,
            ServiceError::Validation(_) => 412,
            ServiceError::Internal(_) => 500,
        }
    }

    /// The message without the variant prefix
    pub fn message(&self) -> &str {
        match self {
            ServiceError::Unauthorized(m) | ServiceError::Validation(m) | ServiceError::Internal(m) => m,
        }
    }
}

impl From<crate::database::DatabaseError> for ServiceError {
    fn from(err: crate::database::DatabaseError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<crate::validation::ValidationError> for ServiceError {
    fn from(err: crate::validation::ValidationError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Internal(format!("Serialization error: {}", err))
    }
}
