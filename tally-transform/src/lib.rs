// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # Tally Transform
//!
//! Turns fetched records into CSV export files.
//!
//! - [`clean`] - Required-field checks, lookup enrichment, column cleanup
//! - [`json_fields`] - Flattening of run data documents
//! - [`partition`] - Grouping and filename rules
//! - [`table`] - CSV tables with deterministic column order
//! - [`master`] - Rolling merge of cumulative master tables

pub mod clean;
pub mod error;
pub mod json_fields;
pub mod master;
pub mod partition;
pub mod table;

use std::path::{Path, PathBuf};

use tally_core::{Dataset, ExportFile, Record, ReferenceTables, YearMonth};
use tracing::{info, instrument};

pub use clean::{Prepared, prepare};
pub use error::TransformError;
pub use master::{MASTER_WINDOW_DAYS, MergeOutcome, merge_rolling};
pub use partition::{Group, file_name, partition, sanitize_name};
pub use table::Table;

/// Files written for one dataset and month.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformOutcome {
    /// Files written, in group encounter order.
    pub files: Vec<ExportFile>,
    /// Records dropped for missing required fields.
    pub dropped: usize,
}

/// Writes export files into a working directory.
#[derive(Debug, Clone)]
pub struct Transformer {
    work_dir: PathBuf,
}

impl Transformer {
    /// Creates a transformer writing into `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    /// Directory files are written to.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Cleans, groups and writes the records of one month.
    ///
    /// Produces one file per group, or one file when the dataset is not
    /// grouped, and none when no record survives cleaning. Writing the
    /// same records twice produces identical bytes.
    #[instrument(skip(self, records, tables), fields(dataset = %dataset, period = %period, records = records.len()))]
    pub fn write_exports(
        &self,
        dataset: Dataset,
        period: YearMonth,
        records: Vec<Record>,
        tables: &ReferenceTables,
    ) -> Result<TransformOutcome, TransformError> {
        let Prepared { records, dropped } = prepare(dataset, records, tables);
        if dropped > 0 {
            info!(dropped, "Dropped records missing required fields");
        }

        std::fs::create_dir_all(&self.work_dir)
            .map_err(|e| TransformError::io(&self.work_dir, e))?;

        let mut files = Vec::new();
        for group in partition(dataset, records) {
            let path = self.work_dir.join(file_name(&group.stem, period));
            let table = Table::from_records(dataset, &group.records);
            table.write(&path)?;
            info!(file = %path.display(), rows = table.len(), "Wrote export file");
            files.push(ExportFile {
                path,
                group: group.key,
                period,
                record_count: table.len(),
            });
        }

        Ok(TransformOutcome { files, dropped })
    }
}
