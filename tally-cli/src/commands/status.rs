//! Status command - list what has been published.

use anyhow::Result;
use clap::Args;
use tally_store::JobConfig;

use crate::OutputFormat;
use crate::context;
use crate::output::{JsonFormatter, TextFormatter};
use crate::status::{TREE_DEPTH, list_tree};

/// Arguments for the status command.
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Output format.
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long)]
    pub pretty: bool,
}

/// Runs the status command.
pub async fn run(args: &StatusArgs, config: &JobConfig) -> Result<()> {
    let storage = context::storage(config)?;
    let tree = list_tree(&storage, &config.drive_parent_id, TREE_DEPTH).await?;

    let output = match args.format {
        OutputFormat::Text => TextFormatter::new().format_tree(&tree),
        OutputFormat::Json => JsonFormatter::new(args.pretty).format_tree(&config.drive_parent_id, &tree)?,
    };
    println!("{output}");
    Ok(())
}
