//! Execution tree command
//!
//! Rebuilds the execution tree of a stored run and prints it as JSON.

use super::{load_config, read_file, write_output};
use crate::cli::error::CliError;
use crate::execution::{ExecutionEvent, ExecutionTreeBuilder, count_nodes, run_status};
use crate::models::Execution;
use serde_json::{Value, json};
use std::path::PathBuf;

/// Arguments for the tree command
#[derive(Debug, Clone)]
pub struct TreeArgs {
    /// JSON event array, or an execution row with `executionData`
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub pretty: bool,
    /// Overrides the configured credential key
    pub credential_key: Option<String>,
    pub workspace: PathBuf,
}

/// Parse either a bare event array or an execution row
pub fn parse_events(input: &PathBuf, content: &str) -> Result<Vec<ExecutionEvent>, CliError> {
    let parse_err = |e: serde_json::Error| CliError::ParseError(input.clone(), e.to_string());
    let value: Value = serde_json::from_str(content).map_err(parse_err)?;
    match value {
        Value::Array(_) => serde_json::from_value(value).map_err(parse_err),
        Value::Object(_) => {
            let execution: Execution = serde_json::from_value(value).map_err(parse_err)?;
            execution.events().map_err(parse_err)
        }
        _ => Err(CliError::ParseError(
            input.clone(),
            "expected an event array or an execution object".to_string(),
        )),
    }
}

pub fn handle_tree(args: &TreeArgs) -> Result<(), CliError> {
    let content = read_file(&args.input)?;
    let events = parse_events(&args.input, &content)?;

    let credential_key = match &args.credential_key {
        Some(key) => key.clone(),
        None => load_config(&args.workspace)?.execution_tree.credential_key,
    };
    let forest = ExecutionTreeBuilder::new()
        .with_credential_key(credential_key)
        .build(&events);

    let report = json!({
        "status": run_status(&forest),
        "events": events.len(),
        "nodes": count_nodes(&forest),
        "tree": forest,
    });
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .map_err(|e| CliError::IoError(format!("Failed to render tree: {}", e)))?;

    write_output(args.output.as_ref(), &rendered)
}
