// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # Tally Core
//!
//! Core types, models, and traits shared by every Tally crate.
//!
//! ## Key Types
//!
//! ### Periods
//! - [`YearMonth`] - A calendar month
//! - [`DateRange`] - Inclusive date range an export covers
//!
//! ### Records
//! - [`Record`] - One fetched billing/usage event
//! - [`Dataset`] - Which endpoint a record comes from and how it is laid out
//! - [`ReferenceTables`] - Tool and user lookups used for enrichment
//!
//! ### Pipeline
//! - [`FetchOutcome`] - Records for a range plus drop/truncation counts
//! - [`ExportFile`] - A local file waiting to be published
//! - [`RemoteFolder`], [`RemoteFile`] - Objects in remote storage
//!
//! ### Errors
//! - [`CoreError`] - Shared failure taxonomy
//! - [`JobError`] - A fatal error tagged with its [`Phase`]

pub mod error;
pub mod models;
pub mod traits;

// Re-export error types
pub use error::{CoreError, JobError, Phase, PhaseExt};

// Re-export all model types
pub use models::{
    // Periods
    API_DATE_FORMAT,
    BATCH_EPOCH,
    DateRange,
    YearMonth,
    // Records
    Dataset,
    Record,
    RecordSchema,
    ReferenceTables,
    RequiredFields,
    UNKNOWN_EMAIL,
    UNKNOWN_TOOL,
    UNKNOWN_USER,
    UserInfo,
    parse_timestamp,
    render_cell,
    // Pipeline
    CSV_MIME_TYPE,
    ExportFile,
    FOLDER_MIME_TYPE,
    FetchOutcome,
    RemoteFile,
    RemoteFolder,
};

// Re-export traits
pub use traits::{RecordSource, ReferenceSource, RemoteStorage};
