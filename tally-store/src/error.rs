//! Store error types.

use tally_core::CoreError;
use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Config(msg) => CoreError::Configuration(msg),
            StoreError::Io(e) => CoreError::Io(e),
            StoreError::Serialization(e) => CoreError::Serialization(e),
            e @ StoreError::Csv(_) => CoreError::InvalidData(e.to_string()),
        }
    }
}
