// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! Tally - periodic billing/usage export from the lab API to cloud storage.
//!
//! # Examples
//!
//! ```bash
//! # Export the current month of every dataset
//! tally
//!
//! # Export every month since January 2024
//! tally --batch
//!
//! # Usage events only, then refresh the billing masters
//! tally export --dataset usage --masters
//!
//! # Rebuild the 2024 billing master
//! tally master --rebuild --year 2024
//!
//! # Show what has been published
//! tally status --format json
//! ```

mod commands;
mod context;
mod job;
mod master;
mod output;
mod status;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tally_core::{CoreError, JobError, Phase, PhaseExt};
use tally_store::JobConfig;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{export, lookups, master as master_cmd, status as status_cmd};

// ============================================================================
// CLI Definition
// ============================================================================

/// Tally - billing/usage export job.
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Export billing and usage records to cloud storage")]
#[command(long_about = r#"
Tally fetches billing and usage records from the lab management API,
writes them as monthly CSV files and uploads them to a cloud storage
folder organised as <year>/Billing_Data and <year>/Usage_Data.

Configuration is read from the environment (and a .env file):
  TALLY_API_TOKEN         API token (required)
  TALLY_DRIVE_PARENT_ID   destination folder id (required)

Examples:
  tally                          # Current month, all datasets
  tally --batch                  # Every month since January 2024
  tally export --dataset usage   # Usage events only
  tally master --rebuild         # Rebuild this year's billing master
"#)]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Subcommand to run. If none, runs 'export' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Export options used when no subcommand is given.
    #[command(flatten)]
    pub export: export::ExportArgs,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Quiet mode (errors only).
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Environment file to load instead of ./.env.
    #[arg(long, global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, transform and publish (default if no command specified).
    #[command(visible_alias = "e")]
    Export(export::ExportArgs),

    /// Update or rebuild the billing master files.
    #[command(visible_alias = "m")]
    Master(master_cmd::MasterArgs),

    /// Refresh the tool and user lookup tables.
    Lookups,

    /// List the published folder tree.
    #[command(visible_alias = "s")]
    Status(status_cmd::StatusArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    #[allow(dead_code)]
    Success = 0,
    /// General error.
    Error = 1,
    /// Missing or invalid configuration.
    Config = 2,
    /// Credentials rejected.
    Auth = 3,
    /// Connectivity failure or timeout.
    Network = 4,
    /// A file could not be uploaded.
    Upload = 5,
}

impl ExitCode {
    /// Exit code for a failed run.
    pub fn for_error(err: &anyhow::Error) -> Self {
        let core = err
            .downcast_ref::<JobError>()
            .map(|e| &e.source)
            .or_else(|| err.downcast_ref::<CoreError>());
        match core {
            Some(CoreError::Configuration(_)) => ExitCode::Config,
            Some(CoreError::Authentication(_)) => ExitCode::Auth,
            Some(CoreError::Network(_)) => ExitCode::Network,
            Some(CoreError::Upload { .. }) => ExitCode::Upload,
            _ => ExitCode::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    let default = if quiet {
        "tally=error"
    } else if verbose {
        "tally=debug,info"
    } else {
        "tally=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(&cli).await {
        let code = ExitCode::for_error(&e);
        error!(error = %e, "Run failed");
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        std::process::exit(code as i32);
    }

    Ok(())
}

async fn run(cli: &Cli) -> Result<()> {
    let config = JobConfig::from_env(cli.env_file.as_deref()).in_phase(Phase::Config)?;

    match &cli.command {
        Some(Commands::Export(args)) => export::run(args, &config).await,
        Some(Commands::Master(args)) => master_cmd::run(args, &config).await,
        Some(Commands::Lookups) => lookups::run(&config).await,
        Some(Commands::Status(args)) => status_cmd::run(args, &config).await,
        None => export::run(&cli.export, &config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_takes_export_flags() {
        let cli = Cli::parse_from(["tally", "--batch", "--dataset", "usage"]);
        assert!(cli.command.is_none());
        assert!(cli.export.batch);
        assert_eq!(cli.export.dataset, export::DatasetArg::Usage);
    }

    #[test]
    fn test_export_subcommand() {
        let cli = Cli::parse_from(["tally", "export", "--masters", "-v"]);
        let Some(Commands::Export(args)) = cli.command else {
            panic!("expected export");
        };
        assert!(args.masters);
        assert!(!args.batch);
        assert_eq!(args.dataset, export::DatasetArg::All);
        assert!(cli.verbose);
    }

    #[test]
    fn test_master_year_requires_rebuild() {
        assert!(Cli::try_parse_from(["tally", "master", "--year", "2024"]).is_err());
        assert!(Cli::try_parse_from(["tally", "master", "--rebuild", "--year", "2024"]).is_ok());
    }

    #[test]
    fn test_exit_codes() {
        let config: anyhow::Error =
            JobError::new(Phase::Config, CoreError::Configuration("TALLY_API_TOKEN is not set".into()))
                .into();
        assert_eq!(ExitCode::for_error(&config), ExitCode::Config);

        let auth: anyhow::Error =
            JobError::new(Phase::Publish, CoreError::Authentication("401".into())).into();
        assert_eq!(ExitCode::for_error(&auth) as i32, 3);

        let upload: anyhow::Error = CoreError::Upload {
            file: "a.csv".into(),
            message: "500".into(),
        }
        .into();
        assert_eq!(ExitCode::for_error(&upload), ExitCode::Upload);

        assert_eq!(ExitCode::for_error(&anyhow::anyhow!("boom")), ExitCode::Error);
        assert_eq!(ExitCode::Success as i32, 0);
    }
}
