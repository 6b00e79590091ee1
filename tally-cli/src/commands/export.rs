//! Export command - fetch, transform and publish.

use anyhow::Result;
use chrono::Local;
use clap::{Args, ValueEnum};
use tally_core::Dataset;
use tally_store::JobConfig;
use tracing::info;

use crate::context;
use crate::job::{ExportJob, Mode};
use crate::master::MasterJob;
use crate::output::TextFormatter;

/// Dataset selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum DatasetArg {
    /// Billing line items.
    Billing,
    /// Tool usage events.
    Usage,
    /// Billing, then usage.
    #[default]
    All,
}

impl DatasetArg {
    /// Datasets to run, in order.
    pub fn datasets(self) -> Vec<Dataset> {
        match self {
            DatasetArg::Billing => vec![Dataset::Billing],
            DatasetArg::Usage => vec![Dataset::Usage],
            DatasetArg::All => Dataset::ALL.to_vec(),
        }
    }
}

/// Arguments for the export command.
#[derive(Debug, Args, Default)]
pub struct ExportArgs {
    /// Export every month since January 2024 instead of the current one.
    #[arg(long)]
    pub batch: bool,

    /// Dataset to export.
    #[arg(long, short, value_enum, default_value_t = DatasetArg::All)]
    pub dataset: DatasetArg,

    /// Also refresh the billing master files afterwards.
    #[arg(long)]
    pub masters: bool,
}

/// Runs the export command.
pub async fn run(args: &ExportArgs, config: &JobConfig) -> Result<()> {
    let source = context::record_source(config)?;
    let storage = context::storage(config)?;
    let mode = if args.batch { Mode::Batch } else { Mode::Normal };
    let today = Local::now().date_naive();

    let job = ExportJob::new(&source, &storage, &config.work_dir, &config.drive_parent_id);
    let summary = job.run(&args.dataset.datasets(), mode, today).await?;
    let formatter = TextFormatter::new();
    println!("{}", formatter.format_summary(&summary));

    if args.masters {
        info!("Refreshing master files");
        let masters = MasterJob::new(&source, &storage, &config.work_dir, &config.drive_parent_id);
        let reports = masters.update(today).await?;
        println!("{}", formatter.format_masters(&reports));
    }
    Ok(())
}
