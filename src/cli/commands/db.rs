//! Database management CLI commands
//!
//! `db init` writes `.agentflow.toml` and creates the schema; `db status`
//! reports the configured backend and whether it answers.

use std::path::PathBuf;

use super::load_config;
use crate::cli::error::CliError;
use crate::database::config::{AgentflowConfig, DatabaseBackendType};

/// Arguments for `db init`
#[derive(Debug, Clone)]
pub struct DbInitArgs {
    pub workspace: PathBuf,
    pub backend: String,
    pub connection_string: Option<String>,
}

/// Arguments for `db status`
#[derive(Debug, Clone)]
pub struct DbStatusArgs {
    pub workspace: PathBuf,
}

/// Build the configuration `db init` would write
pub fn init_config(args: &DbInitArgs) -> Result<AgentflowConfig, CliError> {
    let backend: DatabaseBackendType = args
        .backend
        .parse()
        .map_err(|e: String| CliError::InvalidArgument(e))?;

    match backend {
        DatabaseBackendType::Memory => Ok(AgentflowConfig::memory()),
        DatabaseBackendType::Postgres => {
            let conn_str = args.connection_string.clone().ok_or_else(|| {
                CliError::InvalidArgument(
                    "--connection-string is required for the postgres backend".to_string(),
                )
            })?;
            Ok(AgentflowConfig::postgres(conn_str))
        }
    }
}

pub fn handle_db_init(args: &DbInitArgs) -> Result<(), CliError> {
    if !args.workspace.is_dir() {
        return Err(CliError::FileNotFound(args.workspace.clone()));
    }
    let config = init_config(args)?;

    if config.database.backend == DatabaseBackendType::Postgres {
        initialize_postgres(&config)?;
    }

    config.save(&args.workspace)?;
    println!(
        "Initialized {} backend in {}",
        config.database.backend,
        args.workspace.display()
    );
    Ok(())
}

#[cfg(feature = "postgres-backend")]
fn initialize_postgres(config: &AgentflowConfig) -> Result<(), CliError> {
    use crate::database::DatabaseBackend;

    super::runtime()?.block_on(async {
        let backend = super::connect_postgres(config).await?;
        backend.initialize().await?;
        tracing::info!(
            connection = %backend.connection_string_masked(),
            "schema initialized"
        );
        Ok(())
    })
}

#[cfg(not(feature = "postgres-backend"))]
fn initialize_postgres(_config: &AgentflowConfig) -> Result<(), CliError> {
    Err(super::postgres_disabled())
}

pub fn handle_db_status(args: &DbStatusArgs) -> Result<(), CliError> {
    let config = load_config(&args.workspace)?;
    println!("Backend: {}", config.database.backend);
    println!(
        "Config file: {}",
        if AgentflowConfig::exists(&args.workspace) {
            "present"
        } else {
            "absent (defaults)"
        }
    );
    println!("Credential key: {}", config.execution_tree.credential_key);

    if config.database.backend == DatabaseBackendType::Postgres {
        let healthy = postgres_health(&config)?;
        println!("Healthy: {}", healthy);
    }
    Ok(())
}

#[cfg(feature = "postgres-backend")]
fn postgres_health(config: &AgentflowConfig) -> Result<bool, CliError> {
    use crate::database::DatabaseBackend;

    super::runtime()?.block_on(async {
        let backend = super::connect_postgres(config).await?;
        println!("Connection: {}", backend.connection_string_masked());
        Ok(backend.health_check().await?)
    })
}

#[cfg(not(feature = "postgres-backend"))]
fn postgres_health(_config: &AgentflowConfig) -> Result<bool, CliError> {
    Err(super::postgres_disabled())
}
