//! Domain models for Tally.
//!
//! - Calendar periods: [`YearMonth`], [`DateRange`]
//! - Fetched records and their schema: [`Record`], [`RecordSchema`]
//! - Export datasets and their layout rules: [`Dataset`]
//! - Pipeline artefacts: [`FetchOutcome`], [`ExportFile`], [`RemoteFolder`], [`RemoteFile`]
//! - Reference tables: [`ReferenceTables`], [`UserInfo`]

mod dataset;
mod export;
mod lookup;
mod range;
mod record;

pub use dataset::{Dataset, RequiredFields};
pub use export::{
    CSV_MIME_TYPE, ExportFile, FOLDER_MIME_TYPE, FetchOutcome, RemoteFile, RemoteFolder,
};
pub use lookup::{ReferenceTables, UNKNOWN_EMAIL, UNKNOWN_TOOL, UNKNOWN_USER, UserInfo};
pub use range::{API_DATE_FORMAT, BATCH_EPOCH, DateRange, YearMonth};
pub use record::{Record, RecordSchema, parse_timestamp, render_cell};
