//! Cumulative billing master files.
//!
//! Each year has `<year>/Master_CSV/billing_data_<year>_master.csv` and
//! the root folder holds `billing_data_master_master.csv` spanning every
//! year.

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use tally_core::{
    BATCH_EPOCH, CSV_MIME_TYPE, CoreError, Dataset, DateRange, ExportFile, JobError, Phase,
    PhaseExt, Record, RecordSource, ReferenceTables, RemoteStorage, YearMonth,
};
use tally_drive::{find_path, publish};
use tally_transform::{MASTER_WINDOW_DAYS, MergeOutcome, Table, merge_rolling, prepare};
use tracing::{info, instrument};

/// Folder under each year holding its master.
pub const MASTER_FOLDER: &str = "Master_CSV";

/// Name of the all-years master in the root folder.
pub const ROOT_MASTER_NAME: &str = "billing_data_master_master.csv";

/// Name of the master for `year`.
pub fn year_master_name(year: i32) -> String {
    format!("billing_data_{year}_master.csv")
}

/// What happened to one master file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterReport {
    /// File name in storage.
    pub name: String,
    /// Rows in the uploaded master.
    pub rows: usize,
    /// Existing rows replaced by fresh ones.
    pub replaced: usize,
    /// Whether a file was uploaded.
    pub uploaded: bool,
}

/// Maintains the master files.
pub struct MasterJob<'a, R, S> {
    source: &'a R,
    storage: &'a S,
    work_dir: PathBuf,
    root_id: String,
}

impl<'a, R: RecordSource, S: RemoteStorage> MasterJob<'a, R, S> {
    /// Creates a job writing temporary files into `work_dir`.
    pub fn new(source: &'a R, storage: &'a S, work_dir: impl Into<PathBuf>, root_id: &str) -> Self {
        Self {
            source,
            storage,
            work_dir: work_dir.into(),
            root_id: root_id.to_string(),
        }
    }

    /// Refreshes the trailing window of every master it touches.
    #[instrument(skip(self))]
    pub async fn update(&self, today: NaiveDate) -> Result<Vec<MasterReport>, JobError> {
        let window = DateRange::trailing_days(today, MASTER_WINDOW_DAYS);
        let records = self.fetch(&[window]).await?;
        info!(records = records.len(), window = %window, "Fetched master window");

        let mut reports = Vec::new();
        for year in window.start.year()..=window.end.year() {
            let Some(part) = DateRange::trailing_days_in_year(today, MASTER_WINDOW_DAYS, year) else {
                continue;
            };
            let in_year: Vec<Record> = records
                .iter()
                .filter(|r| part.contains(r.timestamp()))
                .cloned()
                .collect();
            let fresh = Table::from_records(Dataset::Billing, &in_year);
            reports.push(
                self.store(&year_path(year), &year_master_name(year), fresh, Some(part.start), today)
                    .await?,
            );
        }

        let fresh = Table::from_records(Dataset::Billing, &records);
        reports.push(
            self.store(&[], ROOT_MASTER_NAME, fresh, Some(window.start), today)
                .await?,
        );
        Ok(reports)
    }

    /// Replaces the masters of `years` with a full re-fetch.
    ///
    /// With `include_root` the all-years master is rebuilt from the same
    /// records.
    #[instrument(skip(self))]
    pub async fn rebuild(
        &self,
        years: &[i32],
        include_root: bool,
        today: NaiveDate,
    ) -> Result<Vec<MasterReport>, JobError> {
        let mut reports = Vec::new();
        let mut all = Vec::new();

        for &year in years {
            if year > today.year() {
                return Err(JobError::new(
                    Phase::Config,
                    CoreError::Configuration(format!("year {year} is in the future")),
                ));
            }
            let records = self.fetch(&year_ranges(year, today)).await?;
            info!(year, records = records.len(), "Fetched year for rebuild");
            let table = Table::from_records(Dataset::Billing, &records);
            reports.push(
                self.store(&year_path(year), &year_master_name(year), table, None, today)
                    .await?,
            );
            all.extend(records);
        }

        if include_root {
            let table = Table::from_records(Dataset::Billing, &all);
            reports.push(self.store(&[], ROOT_MASTER_NAME, table, None, today).await?);
        }
        Ok(reports)
    }

    async fn fetch(&self, ranges: &[DateRange]) -> Result<Vec<Record>, JobError> {
        let mut records = Vec::new();
        for range in ranges {
            let outcome = self
                .source
                .fetch_range(Dataset::Billing, range)
                .await
                .in_phase(Phase::Fetch)?;
            records.extend(outcome.records);
        }
        Ok(prepare(Dataset::Billing, records, &ReferenceTables::default()).records)
    }

    /// Merges `fresh` into the stored master (or replaces it when
    /// `cutoff` is `None`) and uploads the result.
    ///
    /// A merge with no fresh rows leaves the stored master untouched.
    async fn store(
        &self,
        path: &[String],
        name: &str,
        fresh: Table,
        cutoff: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<MasterReport, JobError> {
        if cutoff.is_some() && fresh.is_empty() {
            info!(name, "No new rows for master");
            return Ok(MasterReport {
                name: name.to_string(),
                rows: 0,
                replaced: 0,
                uploaded: false,
            });
        }

        let existing = match cutoff {
            Some(_) => self.download(path, name).await?,
            None => None,
        };

        let MergeOutcome { table, replaced, .. } = match (existing, cutoff) {
            (Some(existing), Some(cutoff)) => merge_rolling(existing, fresh, cutoff),
            _ => {
                let mut table = fresh;
                let duplicates = table.dedupe();
                MergeOutcome {
                    table,
                    replaced: 0,
                    duplicates,
                }
            }
        };

        if table.headers.is_empty() {
            info!(name, "Nothing to write for master");
            return Ok(MasterReport {
                name: name.to_string(),
                rows: 0,
                replaced,
                uploaded: false,
            });
        }

        std::fs::create_dir_all(&self.work_dir).in_phase(Phase::Transform)?;
        let local = self.work_dir.join(name);
        table.write(&local).in_phase(Phase::Transform)?;

        let file = ExportFile {
            path: local,
            group: None,
            period: YearMonth::of(today),
            record_count: table.len(),
        };
        publish(self.storage, &self.root_id, path, vec![file], CSV_MIME_TYPE)
            .await
            .in_phase(Phase::Publish)?
            .into_result()
            .in_phase(Phase::Publish)?;

        info!(name, rows = table.len(), replaced, "Uploaded master");
        Ok(MasterReport {
            name: name.to_string(),
            rows: table.len(),
            replaced,
            uploaded: true,
        })
    }

    async fn download(&self, path: &[String], name: &str) -> Result<Option<Table>, JobError> {
        let Some(folder) = find_path(self.storage, &self.root_id, path)
            .await
            .in_phase(Phase::Publish)?
        else {
            return Ok(None);
        };
        let Some(file) = self
            .storage
            .find_file(&folder.id, name)
            .await
            .in_phase(Phase::Publish)?
        else {
            return Ok(None);
        };
        let bytes = self
            .storage
            .download_file(&file.id)
            .await
            .in_phase(Phase::Publish)?;
        Table::from_csv(&bytes).map(Some).in_phase(Phase::Transform)
    }
}

fn year_path(year: i32) -> Vec<String> {
    vec![year.to_string(), MASTER_FOLDER.to_string()]
}

/// Monthly ranges covering `year` up to `today`.
fn year_ranges(year: i32, today: NaiveDate) -> Vec<DateRange> {
    let current = YearMonth::of(today);
    let (Ok(first), Ok(december)) = (YearMonth::new(year, 1), YearMonth::new(year, 12)) else {
        return Vec::new();
    };
    YearMonth::range_inclusive(first, december.min(current))
        .into_iter()
        .map(|m| {
            if m == current {
                DateRange::month_to_date(today)
            } else {
                DateRange::month(m)
            }
        })
        .collect()
}

/// Years a full rebuild covers.
pub fn all_years(today: NaiveDate) -> Vec<i32> {
    (BATCH_EPOCH.year..=today.year()).collect()
}
