//! Export command
//!
//! Writes a tenant's data from the configured store as an export bundle.

use serde_json::Value;
use std::path::PathBuf;

use super::{load_config, read_file, require_persistent, write_output};
use crate::cli::error::CliError;
use crate::error::ServiceError;
use crate::export::ExportSelection;
use crate::models::Requester;

/// Export command arguments
#[derive(Debug, Clone)]
pub struct ExportArgs {
    pub workspace: PathBuf,
    pub user: String,
    pub organization: String,
    /// JSON file holding the category flags; every category when absent
    pub selection: Option<PathBuf>,
    /// Bundle destination; stdout when absent
    pub output: Option<PathBuf>,
    pub pretty: bool,
}

/// Load the selection flags, or select everything
pub fn read_selection(path: Option<&PathBuf>) -> Result<ExportSelection, CliError> {
    let Some(path) = path else {
        return Ok(ExportSelection::all());
    };
    let content = read_file(path)?;
    let value: Value = serde_json::from_str(&content)
        .map_err(|e| CliError::ParseError(path.clone(), e.to_string()))?;
    ExportSelection::from_value(&value).map_err(|e| CliError::from(ServiceError::from(e)))
}

pub fn handle_export(args: &ExportArgs) -> Result<(), CliError> {
    let config = load_config(&args.workspace)?;
    let selection = read_selection(args.selection.as_ref())?;
    require_persistent(&config)?;

    let requester = Requester::new(args.user.clone(), args.organization.clone());
    let bundle = export_bundle(&config, &selection, &requester)?;

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&bundle)
    } else {
        serde_json::to_string(&bundle)
    }
    .map_err(|e| CliError::IoError(format!("Failed to serialize bundle: {}", e)))?;

    write_output(args.output.as_ref(), &rendered)?;
    if let Some(output) = &args.output {
        eprintln!(
            "Exported {} rows to {}",
            bundle.total_rows(),
            output.display()
        );
    }
    Ok(())
}

#[cfg(feature = "postgres-backend")]
fn export_bundle(
    config: &crate::database::AgentflowConfig,
    selection: &ExportSelection,
    requester: &Requester,
) -> Result<crate::export::ExportBundle, CliError> {
    use crate::export::ExportEngine;

    super::runtime()?.block_on(async {
        let backend = super::connect_postgres(config).await?;
        let engine = ExportEngine::new(backend).with_file_name(config.export.file_name.clone());
        Ok(engine.export_data(selection, requester).await?)
    })
}

#[cfg(not(feature = "postgres-backend"))]
fn export_bundle(
    _config: &crate::database::AgentflowConfig,
    _selection: &ExportSelection,
    _requester: &Requester,
) -> Result<crate::export::ExportBundle, CliError> {
    Err(super::postgres_disabled())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_selection_defaults_to_all() {
        assert_eq!(read_selection(None).unwrap(), ExportSelection::all());
    }

    #[test]
    fn test_read_selection_rejects_non_boolean() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selection.json");
        std::fs::write(&path, r#"{"chatflow": "yes"}"#).unwrap();

        let err = read_selection(Some(&path)).unwrap_err();
        assert!(matches!(
            err,
            CliError::ServiceError(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn test_memory_backend_is_not_persistent() {
        let dir = tempfile::tempdir().unwrap();
        let err = handle_export(&ExportArgs {
            workspace: dir.path().to_path_buf(),
            user: "user-1".to_string(),
            organization: "org-1".to_string(),
            selection: None,
            output: None,
            pretty: false,
        })
        .unwrap_err();
        assert!(matches!(err, CliError::NotPersistent(_)));
    }
}
