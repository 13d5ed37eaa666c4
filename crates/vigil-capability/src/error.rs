//! Capability error types.

use thiserror::Error;

use vigil_core::Blocker;
use vigil_policy::PolicyError;

/// Errors from capability plan building and execution.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// A payload field the action requires is absent.
    #[error("missing required field `{field}`")]
    MissingField {
        /// Code naming the missing requirement, e.g. `TARGET_REQUIRED`.
        code: &'static str,
        /// The absent payload field.
        field: &'static str,
    },

    /// The capability or action is not in the registry.
    #[error("unsupported action: {capability}:{action}")]
    UnsupportedAction {
        /// Requested capability name.
        capability: String,
        /// Requested action name.
        action: String,
    },

    /// Plan building tripped a hard policy check.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Execution was attempted on a plan with unresolved blockers.
    #[error("plan has {} unresolved blocker(s)", blockers.len())]
    PlanBlocked {
        /// The blockers still standing.
        blockers: Vec<Blocker>,
    },

    /// The executor or connector backing this capability is unreachable.
    #[error("connector `{name}` unavailable")]
    ConnectorUnavailable {
        /// Connector name.
        name: String,
    },

    /// The side effect itself failed.
    #[error("execution failed: {detail}")]
    ExecuteFailed {
        /// What went wrong.
        detail: String,
        /// Steps that completed before the failure.
        executed_steps: Vec<String>,
    },
}

impl CapabilityError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField { code, .. } => code,
            Self::UnsupportedAction { .. } => "UNSUPPORTED_ACTION",
            Self::Policy(e) => e.code(),
            Self::PlanBlocked { .. } => "PLAN_BLOCKED",
            Self::ConnectorUnavailable { .. } => "CONNECTOR_UNAVAILABLE",
            Self::ExecuteFailed { .. } => "CAPABILITY_EXECUTE_FAILED",
        }
    }

    /// Steps that completed before a partial failure, if any.
    #[must_use]
    pub fn executed_steps(&self) -> &[String] {
        match self {
            Self::ExecuteFailed { executed_steps, .. } => executed_steps,
            _ => &[],
        }
    }
}

/// Result type for capability operations.
pub type CapabilityResult<T> = Result<T, CapabilityError>;
