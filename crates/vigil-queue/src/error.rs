//! Queue error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the command queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// A queue directory could not be created or listed.
    #[error("queue I/O error at {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An envelope could not be serialized.
    #[error("envelope serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;
