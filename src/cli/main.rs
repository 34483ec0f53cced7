//! CLI binary entry point for agentflow-cli

#[cfg(feature = "cli")]
use agentflow_sdk::cli::commands::db::{DbInitArgs, DbStatusArgs, handle_db_init, handle_db_status};
#[cfg(feature = "cli")]
use agentflow_sdk::cli::commands::export::{ExportArgs, handle_export};
#[cfg(feature = "cli")]
use agentflow_sdk::cli::commands::import::{ImportArgs, handle_import};
#[cfg(feature = "cli")]
use agentflow_sdk::cli::commands::tree::{TreeArgs, handle_tree};
#[cfg(feature = "cli")]
use agentflow_sdk::cli::error::CliError;
#[cfg(feature = "cli")]
use anyhow::Context;
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "agentflow-cli")]
#[command(about = "Execution trees and tenant data transfer for agent flows")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Rebuild the execution tree of a run log
    Tree {
        /// Event array or execution row (JSON)
        input: PathBuf,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pretty-print the JSON output
        #[arg(short, long)]
        pretty: bool,
        /// Key stripped from node payloads
        #[arg(long)]
        credential_key: Option<String>,
        /// Workspace holding .agentflow.toml
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
    },

    /// Export a tenant's data as a bundle
    Export {
        #[arg(long)]
        user: String,
        #[arg(long)]
        organization: String,
        /// JSON file of category flags (defaults to every category)
        #[arg(short, long)]
        selection: Option<PathBuf>,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        pretty: bool,
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
    },

    /// Import a bundle into a tenant's organization
    Import {
        /// Bundle file produced by `export`
        input: PathBuf,
        #[arg(long)]
        user: String,
        #[arg(long)]
        organization: String,
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
    },

    /// Database management commands
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum DbCommands {
    /// Write .agentflow.toml and create the schema
    Init {
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
        /// Backend type (memory, postgres)
        #[arg(short, long, default_value = "memory")]
        backend: String,
        /// PostgreSQL connection string (required for postgres)
        #[arg(long)]
        connection_string: Option<String>,
    },
    /// Show the configured backend and its health
    Status {
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
    },
}

#[cfg(feature = "cli")]
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Tree {
            input,
            output,
            pretty,
            credential_key,
            workspace,
        } => {
            let args = TreeArgs {
                input,
                output,
                pretty,
                credential_key,
                workspace,
            };
            handle_tree(&args).with_context(|| format!("tree {}", args.input.display()))
        }
        Commands::Export {
            user,
            organization,
            selection,
            output,
            pretty,
            workspace,
        } => {
            let args = ExportArgs {
                workspace,
                user,
                organization,
                selection,
                output,
                pretty,
            };
            handle_export(&args).with_context(|| format!("export for {}", args.organization))
        }
        Commands::Import {
            input,
            user,
            organization,
            workspace,
        } => {
            let args = ImportArgs {
                workspace,
                user,
                organization,
                input,
            };
            handle_import(&args).with_context(|| format!("import {}", args.input.display()))
        }
        Commands::Db { command } => match command {
            DbCommands::Init {
                workspace,
                backend,
                connection_string,
            } => {
                let args = DbInitArgs {
                    workspace,
                    backend,
                    connection_string,
                };
                handle_db_init(&args).context("db init")
            }
            DbCommands::Status { workspace } => {
                let args = DbStatusArgs { workspace };
                handle_db_status(&args).context("db status")
            }
        },
    }
}

#[cfg(feature = "cli")]
fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        std::process::exit(code);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature is not enabled. Build with --features cli");
    std::process::exit(1);
}
