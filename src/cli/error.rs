//! CLI-specific error types

use crate::database::DatabaseError;
use crate::error::ServiceError;
use std::path::PathBuf;
use thiserror::Error;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read file {0}: {1}")]
    FileReadError(PathBuf, String),

    #[error("Failed to write file {0}: {1}")]
    FileWriteError(PathBuf, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(PathBuf, String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Backend '{0}' is not persistent; configure postgres with 'db init'")]
    NotPersistent(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("{0}")]
    ServiceError(#[from] ServiceError),
}

impl CliError {
    /// Exit code for the process
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgument(_) => 2,
            CliError::ServiceError(ServiceError::Unauthorized(_)) => 3,
            _ => 1,
        }
    }
}
