//! Export orchestration.
//!
//! A run refreshes the reference tables when a selected dataset needs
//! them, then executes fetch, transform and publish once per dataset and
//! month. The first fatal error ends the run.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tally_core::{
    BATCH_EPOCH, CSV_MIME_TYPE, Dataset, DateRange, JobError, Phase, PhaseExt, RecordSource,
    ReferenceSource, ReferenceTables, RemoteStorage, YearMonth,
};
use tally_drive::publish;
use tally_store::{load_reference, save_reference};
use tally_transform::Transformer;
use tracing::{error, info, instrument, warn};

/// Which months a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The current reporting period.
    Normal,
    /// Every month since the batch epoch.
    Batch,
}

impl Mode {
    /// Date ranges covered on `today`.
    pub fn ranges(self, today: NaiveDate) -> Vec<DateRange> {
        match self {
            Mode::Normal => vec![DateRange::reporting_period(today)],
            Mode::Batch => DateRange::batch_months(BATCH_EPOCH, today),
        }
    }
}

/// Outcome of one dataset-month pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthReport {
    /// Dataset exported.
    pub dataset: Dataset,
    /// Month exported.
    pub period: YearMonth,
    /// Records kept after fetching.
    pub fetched: usize,
    /// Records dropped as unparseable or missing required fields.
    pub dropped: usize,
    /// Records removed by the record cap.
    pub truncated: usize,
    /// Files uploaded.
    pub uploaded: usize,
}

/// Totals over a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Dataset-month pipelines executed.
    pub months: usize,
    /// Files uploaded.
    pub files_uploaded: usize,
    /// Records dropped.
    pub dropped: usize,
    /// Records removed by the record cap.
    pub truncated: usize,
    /// Wall-clock duration.
    pub elapsed: Duration,
}

impl RunSummary {
    fn add(&mut self, month: &MonthReport) {
        self.months += 1;
        self.files_uploaded += month.uploaded;
        self.dropped += month.dropped;
        self.truncated += month.truncated;
    }
}

/// Fetches fresh reference tables, caches them in `data_dir` and loads
/// them back from there.
#[instrument(skip(source))]
pub async fn refresh_lookups<F: ReferenceSource>(
    source: &F,
    data_dir: &Path,
) -> Result<ReferenceTables, JobError> {
    let fresh = source.fetch_reference().await.in_phase(Phase::Lookups)?;
    info!(
        tools = fresh.tools.len(),
        users = fresh.users.len(),
        "Fetched reference tables"
    );
    save_reference(data_dir, &fresh).in_phase(Phase::Lookups)?;
    load_reference(data_dir).in_phase(Phase::Lookups)
}

/// Runs exports against a record source and a storage backend.
pub struct ExportJob<'a, R, S> {
    source: &'a R,
    storage: &'a S,
    transformer: Transformer,
    root_id: String,
    data_dir: PathBuf,
}

impl<'a, R, S> ExportJob<'a, R, S>
where
    R: RecordSource + ReferenceSource,
    S: RemoteStorage,
{
    /// Creates a job writing local files into `work_dir` and publishing
    /// below the folder `root_id`.
    pub fn new(source: &'a R, storage: &'a S, work_dir: impl Into<PathBuf>, root_id: &str) -> Self {
        let data_dir = work_dir.into();
        Self {
            source,
            storage,
            transformer: Transformer::new(data_dir.clone()),
            root_id: root_id.to_string(),
            data_dir,
        }
    }

    /// Exports `datasets` for every range of `mode` on `today`.
    pub async fn run(
        &self,
        datasets: &[Dataset],
        mode: Mode,
        today: NaiveDate,
    ) -> Result<RunSummary, JobError> {
        let started = Instant::now();
        let tables = if datasets.iter().any(Dataset::needs_lookups) {
            refresh_lookups(self.source, &self.data_dir).await?
        } else {
            ReferenceTables::default()
        };

        let ranges = mode.ranges(today);
        info!(mode = ?mode, months = ranges.len(), "Starting export");

        let mut summary = RunSummary::default();
        for &dataset in datasets {
            for range in &ranges {
                let month = self.run_month(dataset, range, &tables).await?;
                info!(
                    dataset = %month.dataset,
                    period = %month.period,
                    fetched = month.fetched,
                    uploaded = month.uploaded,
                    "Month complete"
                );
                summary.add(&month);
            }
        }
        summary.elapsed = started.elapsed();
        Ok(summary)
    }

    /// Fetches, writes and publishes one dataset for one range.
    #[instrument(skip(self, tables), fields(dataset = %dataset, range = %range))]
    pub async fn run_month(
        &self,
        dataset: Dataset,
        range: &DateRange,
        tables: &ReferenceTables,
    ) -> Result<MonthReport, JobError> {
        let period = range.year_month();
        let outcome = self
            .source
            .fetch_range(dataset, range)
            .await
            .in_phase(Phase::Fetch)?;

        let mut report = MonthReport {
            dataset,
            period,
            fetched: outcome.records.len(),
            dropped: outcome.dropped,
            truncated: outcome
                .truncated_from
                .map_or(0, |total| total.saturating_sub(outcome.records.len())),
            uploaded: 0,
        };
        if outcome.is_empty() {
            info!("No records in range");
            return Ok(report);
        }

        let exports = self
            .transformer
            .write_exports(dataset, period, outcome.records, tables)
            .in_phase(Phase::Transform)?;
        report.dropped += exports.dropped;
        if exports.files.is_empty() {
            info!("No records left to export");
            return Ok(report);
        }

        let path = dataset.folder_path(period.year);
        let published = publish(self.storage, &self.root_id, &path, exports.files, CSV_MIME_TYPE)
            .await
            .in_phase(Phase::Publish)?;

        report.uploaded = published.uploaded.len();
        let uploaded: Vec<&str> = published.uploaded.iter().map(|u| u.name.as_str()).collect();
        info!(folder = %path.join("/"), files = ?uploaded, "Published");

        if let Some(failure) = published.failure {
            let not_attempted: Vec<String> =
                published.not_attempted.iter().map(|f| f.file_name()).collect();
            error!(
                failed = %failure.file.file_name(),
                uploaded = ?uploaded,
                not_attempted = ?not_attempted,
                "Publish aborted"
            );
            return Err(JobError::new(Phase::Publish, failure.error));
        }
        if published.uploaded.iter().any(|u| !u.local_deleted) {
            warn!("Some local files could not be removed after upload");
        }
        Ok(report)
    }
}
