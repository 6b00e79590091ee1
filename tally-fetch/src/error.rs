//! Fetch error types.

use tally_core::CoreError;
use thiserror::Error;

/// Error type for fetch operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The API rejected the token.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Non-success status other than 401/403.
    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Response body had an unexpected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base URL or pagination link could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<FetchError> for CoreError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::AuthenticationFailed(msg) => CoreError::Authentication(msg),
            FetchError::Http(e) => CoreError::Network(e.to_string()),
            e @ (FetchError::Timeout(_) | FetchError::UnexpectedStatus { .. }) => {
                CoreError::Network(e.to_string())
            }
            FetchError::InvalidUrl(msg) => CoreError::Configuration(format!("invalid URL: {msg}")),
            e @ (FetchError::InvalidResponse(_) | FetchError::Json(_)) => {
                CoreError::InvalidData(e.to_string())
            }
        }
    }
}
