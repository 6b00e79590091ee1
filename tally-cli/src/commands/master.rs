//! Master command - maintain the cumulative billing masters.

use anyhow::Result;
use chrono::{Datelike, Local};
use clap::Args;
use tally_store::JobConfig;

use crate::context;
use crate::master::{MasterJob, all_years};
use crate::output::TextFormatter;

/// Arguments for the master command.
#[derive(Debug, Args)]
pub struct MasterArgs {
    /// Replace the masters with a full re-fetch instead of a rolling update.
    #[arg(long)]
    pub rebuild: bool,

    /// Year to rebuild (defaults to the current year).
    #[arg(long, requires = "rebuild", conflicts_with = "all_years")]
    pub year: Option<i32>,

    /// Rebuild every year since 2024 and the all-years master.
    #[arg(long, requires = "rebuild")]
    pub all_years: bool,
}

/// Runs the master command.
pub async fn run(args: &MasterArgs, config: &JobConfig) -> Result<()> {
    let source = context::record_source(config)?;
    let storage = context::storage(config)?;
    let today = Local::now().date_naive();
    let job = MasterJob::new(&source, &storage, &config.work_dir, &config.drive_parent_id);

    let reports = if !args.rebuild {
        job.update(today).await?
    } else if args.all_years {
        job.rebuild(&all_years(today), true, today).await?
    } else {
        let year = args.year.unwrap_or_else(|| today.year());
        job.rebuild(&[year], false, today).await?
    };

    println!("{}", TextFormatter::new().format_masters(&reports));
    Ok(())
}
