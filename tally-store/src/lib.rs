// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # Tally Store
//!
//! Local state for the export job.
//!
//! - **JobConfig**: settings from the environment and `.env`
//! - **TokenCache**: storage access token persisted between runs
//! - **Reference tables**: `tool_list.csv` / `user_list.csv`
//! - **Persistence**: JSON file helpers with owner-only permissions

pub mod config;
pub mod error;
pub mod persistence;
pub mod reference;
pub mod token_cache;

pub use config::JobConfig;
pub use error::StoreError;
pub use persistence::{default_cache_dir, default_token_cache_path, load_json, save_json};
pub use reference::{TOOL_LIST_FILE, USER_LIST_FILE, load_reference, save_reference};
pub use token_cache::{CachedToken, TokenCache};
