//! Import command
//!
//! Loads an export bundle file into the configured store.

use std::path::PathBuf;

use super::{load_config, read_file, require_persistent};
use crate::cli::error::CliError;
use crate::export::ExportBundle;
use crate::import::ImportResult;
use crate::models::Requester;

/// Import command arguments
#[derive(Debug, Clone)]
pub struct ImportArgs {
    pub workspace: PathBuf,
    pub user: String,
    pub organization: String,
    /// Bundle file produced by `export`
    pub input: PathBuf,
}

/// Parse an export bundle file
pub fn read_bundle(path: &PathBuf) -> Result<ExportBundle, CliError> {
    let content = read_file(path)?;
    serde_json::from_str(&content).map_err(|e| CliError::ParseError(path.clone(), e.to_string()))
}

pub fn handle_import(args: &ImportArgs) -> Result<(), CliError> {
    let config = load_config(&args.workspace)?;
    let bundle = read_bundle(&args.input)?;
    require_persistent(&config)?;

    let requester = Requester::new(args.user.clone(), args.organization.clone());
    let result = import_bundle(&config, &requester, bundle)?;

    eprintln!(
        "Imported {} rows ({} ids remapped, {} messages and {} feedback rows dropped)",
        result.total_saved(),
        result.remapped_ids,
        result.dropped_messages,
        result.dropped_feedback
    );
    let summary = serde_json::to_string_pretty(&result)
        .map_err(|e| CliError::IoError(format!("Failed to serialize result: {}", e)))?;
    println!("{}", summary);
    Ok(())
}

#[cfg(feature = "postgres-backend")]
fn import_bundle(
    config: &crate::database::AgentflowConfig,
    requester: &Requester,
    bundle: ExportBundle,
) -> Result<ImportResult, CliError> {
    use crate::import::ImportEngine;

    super::runtime()?.block_on(async {
        let backend = super::connect_postgres(config).await?;
        let engine = ImportEngine::new(backend);
        Ok(engine.import_data(requester, bundle).await?)
    })
}

#[cfg(not(feature = "postgres-backend"))]
fn import_bundle(
    _config: &crate::database::AgentflowConfig,
    _requester: &Requester,
    _bundle: ExportBundle,
) -> Result<ImportResult, CliError> {
    Err(super::postgres_disabled())
}
