//! Storage error types.

use tally_core::CoreError;
use tally_store::StoreError;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Debug, Error)]
pub enum DriveError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Credentials file missing or malformed.
    #[error("Invalid credentials: {0}")]
    Credentials(String),

    /// Signing the service account assertion failed.
    #[error("JWT signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// The token endpoint or the storage API rejected the credentials.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The storage API throttled the request.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Non-success response from the storage API.
    #[error("Storage API returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or summary.
        message: String,
    },

    /// Response body could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Local file error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Token cache error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DriveError {
    /// Maps a reqwest error, separating timeouts.
    pub(crate) fn from_request(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DriveError::Timeout
        } else {
            DriveError::Http(err)
        }
    }
}

impl From<DriveError> for CoreError {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::Credentials(msg) => CoreError::Configuration(msg),
            DriveError::Jwt(e) => CoreError::Configuration(format!("service account key: {e}")),
            DriveError::AuthenticationFailed(msg) => CoreError::Authentication(msg),
            e @ (DriveError::Http(_) | DriveError::Timeout | DriveError::RateLimited(_)) => {
                CoreError::Network(e.to_string())
            }
            e @ (DriveError::Api { .. } | DriveError::Parse(_)) => CoreError::Storage(e.to_string()),
            DriveError::Io(e) => CoreError::Io(e),
            DriveError::Store(e) => e.into(),
        }
    }
}
