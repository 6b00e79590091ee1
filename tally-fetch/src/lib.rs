// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # Tally Fetch
//!
//! Record fetching from the lab management API.
//!
//! - [`client::HttpClient`] - Authenticated JSON GET with status mapping
//! - [`api::LabApi`] - Endpoint resolution and pagination
//! - [`parser`] - Page envelopes, records and reference tables
//! - [`source::ApiRecordSource`] - Range filtering and truncation

pub mod api;
pub mod client;
pub mod error;
pub mod parser;
pub mod source;

pub use api::{DEFAULT_AUTH_SCHEME, LabApi};
pub use client::{DEFAULT_TIMEOUT_SECS, HttpClient};
pub use error::FetchError;
pub use source::{ApiRecordSource, DEFAULT_MAX_RECORDS, retain_most_recent};
