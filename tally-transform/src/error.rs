//! Transform error types.

use std::path::PathBuf;

use tally_core::CoreError;
use thiserror::Error;

/// Error type for transform operations.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Writing or reading a local file failed.
    #[error("IO error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// CSV encoding or decoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A CSV table could not be interpreted.
    #[error("Invalid table: {0}")]
    InvalidTable(String),
}

impl TransformError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<TransformError> for CoreError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::Io { source, .. } => CoreError::Io(source),
            e @ (TransformError::Csv(_) | TransformError::InvalidTable(_)) => {
                CoreError::InvalidData(e.to_string())
            }
        }
    }
}
