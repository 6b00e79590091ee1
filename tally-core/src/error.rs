//! Core error types for Tally.

use std::fmt;

use thiserror::Error;

/// Core error type shared by every phase of an export run.
///
/// The variants mirror the failure taxonomy of the job: configuration
/// problems are caught before any network call, authentication and
/// network failures abort the run, invalid data is recovered by dropping
/// the offending record, and upload failures abort the remaining uploads.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Credentials were rejected by the remote API or the storage service.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Connectivity failure or timeout.
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed or incomplete record data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The storage service rejected a file.
    #[error("Upload of {file} failed: {message}")]
    Upload {
        /// Name of the file that could not be uploaded.
        file: String,
        /// Underlying error message.
        message: String,
    },

    /// Any other storage API failure (folder lookup, listing, download).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Local filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// Returns true if the error comes from rejected credentials.
    pub fn is_authentication(&self) -> bool {
        matches!(self, CoreError::Authentication(_))
    }

    /// Returns true for failures the next scheduled run may not hit again.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::Network(_) | CoreError::Storage(_))
    }
}

// ============================================================================
// Phase-tagged job error
// ============================================================================

/// The phase of an export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Reading environment and credentials.
    Config,
    /// Refreshing reference lookup tables.
    Lookups,
    /// Fetching records from the remote API.
    Fetch,
    /// Converting records into export files.
    Transform,
    /// Uploading export files to storage.
    Publish,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Config => "config",
            Phase::Lookups => "lookups",
            Phase::Fetch => "fetch",
            Phase::Transform => "transform",
            Phase::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// A fatal error annotated with the phase it happened in.
#[derive(Debug, Error)]
#[error("{phase} phase failed: {source}")]
pub struct JobError {
    /// Phase that failed.
    pub phase: Phase,
    /// Underlying error.
    #[source]
    pub source: CoreError,
}

impl JobError {
    /// Creates a new job error.
    pub fn new(phase: Phase, source: impl Into<CoreError>) -> Self {
        Self {
            phase,
            source: source.into(),
        }
    }
}

/// Extension for tagging results with the phase they belong to.
pub trait PhaseExt<T> {
    /// Wraps the error in a [`JobError`] for `phase`.
    fn in_phase(self, phase: Phase) -> Result<T, JobError>;
}

impl<T, E: Into<CoreError>> PhaseExt<T> for Result<T, E> {
    fn in_phase(self, phase: Phase) -> Result<T, JobError> {
        self.map_err(|e| JobError::new(phase, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_error_display_includes_phase() {
        let err = JobError::new(Phase::Fetch, CoreError::Network("connection refused".into()));
        assert_eq!(
            err.to_string(),
            "fetch phase failed: Network error: connection refused"
        );
    }

    #[test]
    fn test_in_phase_wraps_error() {
        let result: Result<(), CoreError> =
            Err(CoreError::Authentication("token rejected".into()));
        let err = result.in_phase(Phase::Publish).unwrap_err();
        assert_eq!(err.phase, Phase::Publish);
        assert!(err.source.is_authentication());
    }

    #[test]
    fn test_upload_error_names_file() {
        let err = CoreError::Upload {
            file: "billing_data_2025_10.csv".into(),
            message: "403 Forbidden".into(),
        };
        assert!(err.to_string().contains("billing_data_2025_10.csv"));
    }
}
