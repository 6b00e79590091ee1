// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # Tally Drive
//!
//! Cloud storage side of the export job.
//!
//! - [`Credentials`] and [`TokenProvider`]: service account or authorized
//!   user credentials exchanged for a cached access token
//! - [`DriveClient`]: the storage REST API behind [`tally_core::RemoteStorage`]
//! - [`resolve_path`]: top-down lookup-then-create of folder paths
//! - [`publish`]: upload files, removing local copies as they are confirmed

pub mod auth;
pub mod client;
pub mod credentials;
pub mod error;
pub mod folders;
pub mod jwt;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod publish;

pub use auth::TokenProvider;
pub use client::{DEFAULT_API_BASE, DriveClient};
pub use credentials::Credentials;
pub use error::DriveError;
pub use folders::{find_path, resolve_or_create, resolve_path};
pub use publish::{PublishReport, UploadFailure, UploadedFile, publish, upsert_bytes};
