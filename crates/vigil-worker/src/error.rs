//! Worker error types.

use thiserror::Error;

use vigil_approval::ApprovalError;
use vigil_audit::AuditError;
use vigil_capability::CapabilityError;
use vigil_core::PlanHash;
use vigil_queue::QueueError;

/// Errors from driving one request through the orchestrator.
///
/// Every variant converts to a `{code, message}` result row; nothing here
/// crosses the orchestrator boundary as a panic.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// An execute-phase envelope arrived without a token.
    #[error("execute request carries no approval token")]
    TokenRequired,

    /// The plan recomputed at execute time no longer matches the one that
    /// was approved.
    #[error("plan drifted since approval: expected {expected}, recomputed {actual}")]
    PlanMismatch {
        /// Hash recorded at approval time.
        expected: PlanHash,
        /// Hash of the recomputed plan.
        actual: PlanHash,
    },

    /// Capability plan or execute failure.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// Approval token or grant failure.
    #[error(transparent)]
    Approval(#[from] ApprovalError),

    /// Audit append failure. Fail closed: a decision that cannot be
    /// recorded does not proceed.
    #[error(transparent)]
    Audit(#[from] AuditError),

    /// Queue storage failure.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl WorkerError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::TokenRequired => "TOKEN_REQUIRED",
            Self::PlanMismatch { .. } => "PLAN_MISMATCH",
            Self::Capability(e) => e.code(),
            Self::Approval(e) => e.code(),
            Self::Audit(_) => "AUDIT_WRITE_FAILED",
            Self::Queue(_) => "QUEUE_IO_ERROR",
        }
    }

    /// Steps that completed before a partial failure, if any.
    #[must_use]
    pub fn executed_steps(&self) -> Vec<String> {
        match self {
            Self::Capability(e) => e.executed_steps().to_vec(),
            _ => Vec::new(),
        }
    }
}

/// Result type for worker operations.
pub type WorkerResult<T> = Result<T, WorkerError>;
