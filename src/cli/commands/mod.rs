//! CLI command implementations

pub mod db;
pub mod export;
pub mod import;
pub mod tree;

use crate::cli::error::CliError;
use crate::database::AgentflowConfig;
use std::path::{Path, PathBuf};

/// Read a file to a string
pub(crate) fn read_file(path: &Path) -> Result<String, CliError> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|e| CliError::FileReadError(path.to_path_buf(), e.to_string()))
}

/// Load `.agentflow.toml` from a workspace, with environment overrides
pub(crate) fn load_config(workspace: &Path) -> Result<AgentflowConfig, CliError> {
    AgentflowConfig::load(workspace).map_err(CliError::from)
}

#[cfg(feature = "postgres-backend")]
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::IoError(format!("Failed to create runtime: {}", e)))
}

/// Write to a file, or stdout when no path is given
pub(crate) fn write_output(output: Option<&PathBuf>, content: &str) -> Result<(), CliError> {
    match output {
        Some(path) => std::fs::write(path, content)
            .map_err(|e| CliError::FileWriteError(path.clone(), e.to_string())),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

/// Reject configurations that cannot hold data between invocations
pub(crate) fn require_persistent(config: &AgentflowConfig) -> Result<(), CliError> {
    let backend = config.database.backend;
    if backend.is_persistent() {
        Ok(())
    } else {
        Err(CliError::NotPersistent(backend.to_string()))
    }
}

#[cfg(feature = "postgres-backend")]
pub(crate) async fn connect_postgres(
    config: &AgentflowConfig,
) -> Result<crate::database::PostgresBackend, CliError> {
    let conn_str = config.get_postgres_connection_string().ok_or_else(|| {
        CliError::InvalidArgument("PostgreSQL connection string not configured".to_string())
    })?;
    Ok(crate::database::PostgresBackend::new(conn_str).await?)
}

#[cfg(not(feature = "postgres-backend"))]
pub(crate) fn postgres_disabled() -> CliError {
    CliError::InvalidArgument(
        "PostgreSQL backend not enabled. Build with --features postgres-backend".to_string(),
    )
}
