//! Error types and results for the approval stores.

use vigil_core::TokenId;

/// Errors raised by the approval token lifecycle.
///
/// Every variant maps to a stable code surfaced verbatim to the requester;
/// none of them is ever thrown across the orchestrator boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    /// The token exists in neither the pending nor the terminal store.
    #[error("approval token {token_id} not found")]
    TokenNotFound {
        /// The unknown token.
        token_id: TokenId,
    },

    /// The token passed its TTL.
    #[error("approval token {token_id} expired")]
    TokenExpired {
        /// The expired token.
        token_id: TokenId,
    },

    /// The token was denied by the approver.
    #[error("approval token {token_id} was denied")]
    TokenDenied {
        /// The denied token.
        token_id: TokenId,
    },

    /// The token was already consumed once.
    #[error("approval token {token_id} was already consumed")]
    TokenConsumed {
        /// The consumed token.
        token_id: TokenId,
    },

    /// The executing requester does not match the token's requester.
    #[error("requester '{attempted}' does not match token requester '{expected}'")]
    RequesterMismatch {
        /// Requester on the token.
        expected: String,
        /// Requester on the execute attempt.
        attempted: String,
    },

    /// Strict identity mode and the acting bot differs from the token's.
    #[error("acting bot '{attempted}' does not match token bot '{expected}'")]
    BotMismatch {
        /// Bot recorded on the token.
        expected: String,
        /// Bot on the execute attempt.
        attempted: String,
    },

    /// The execute attempt's flags do not superset the token's required flags.
    #[error("approval flags required: missing {missing:?}")]
    ApprovalFlagsRequired {
        /// Required flags the attempt did not provide.
        missing: Vec<String>,
    },

    /// Storage backend failure (I/O or serialization).
    #[error("approval storage error: {0}")]
    Storage(String),
}

impl ApprovalError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::TokenNotFound { .. } => "TOKEN_NOT_FOUND",
            Self::TokenExpired { .. } => "TOKEN_EXPIRED",
            Self::TokenDenied { .. } => "TOKEN_DENIED",
            Self::TokenConsumed { .. } => "TOKEN_CONSUMED",
            Self::RequesterMismatch { .. } => "REQUESTER_MISMATCH",
            Self::BotMismatch { .. } => "BOT_MISMATCH",
            Self::ApprovalFlagsRequired { .. } => "APPROVAL_FLAGS_REQUIRED",
            Self::Storage(_) => "APPROVAL_STORAGE_ERROR",
        }
    }
}

impl From<std::io::Error> for ApprovalError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for ApprovalError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

/// Result type for approval operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;
