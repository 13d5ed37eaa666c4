//! Audit log error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the audit log.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The log file could not be opened or written.
    #[error("audit write failed for {path}: {source}")]
    Write {
        /// Log file that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The event could not be serialized.
    #[error("audit serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;
