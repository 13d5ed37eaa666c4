//! The plan/execute contract and the capability registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use vigil_config::PolicyConfig;
use vigil_core::{Plan, RequestContext};

use crate::error::{CapabilityError, CapabilityResult};

/// Inputs to a capability's plan builder.
///
/// Exactly the fields a plan is re-derived from at execute time, so a
/// request reconstructed from an approved plan produces the same hash when
/// nothing underneath has changed.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    /// Action within the capability.
    pub action: String,
    /// Action payload.
    pub payload: Value,
    /// Who asked.
    pub requester: String,
    /// Provider identity context.
    pub context: RequestContext,
}

impl PlanRequest {
    /// Build a request.
    #[must_use]
    pub fn new(action: &str, payload: Value, requester: &str) -> Self {
        Self {
            action: action.to_string(),
            payload,
            requester: requester.to_string(),
            context: RequestContext::default(),
        }
    }

    /// Reconstruct the request an approved plan was built from.
    #[must_use]
    pub fn from_plan(plan: &Plan) -> Self {
        Self {
            action: plan.action.clone(),
            payload: plan.payload.clone(),
            requester: plan.requester.clone(),
            context: RequestContext::default(),
        }
    }
}

/// What an execution produced.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    /// Human-readable description of each step that ran, in order.
    pub executed_steps: Vec<String>,
    /// Capability-specific result document (listing, command output, ...).
    pub detail: Value,
}

impl ExecutionOutcome {
    /// An outcome with steps and no detail document.
    #[must_use]
    pub fn steps(executed_steps: Vec<String>) -> Self {
        Self {
            executed_steps,
            detail: Value::Null,
        }
    }

    /// Attach a detail document.
    #[must_use]
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }
}

/// The two-function contract every capability implements.
///
/// `plan` is side-effect free: it validates the payload, probes executor
/// availability, collects blockers, and resolves risk. `execute` performs
/// the side effect described by an unblocked plan's operations.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Registry name, e.g. `file_control`.
    fn name(&self) -> &str;

    /// Build a reviewable plan for one action. No side effects.
    ///
    /// # Errors
    ///
    /// Returns a typed error for an unknown action, a missing required
    /// payload field, or a hard policy rejection (e.g. a git repo outside
    /// the git allowlist). Recoverable findings land in the plan's blocker
    /// list instead.
    async fn plan(&self, request: &PlanRequest, config: &PolicyConfig)
        -> CapabilityResult<Plan>;

    /// Perform the side effect an authorized plan describes.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::PlanBlocked`] for a plan with unresolved
    /// blockers, or an execution error carrying the steps that completed
    /// before a partial failure.
    async fn execute(&self, plan: &Plan, config: &PolicyConfig)
        -> CapabilityResult<ExecutionOutcome>;
}

/// Name → handler map, enumerated at startup.
#[derive(Default)]
pub struct CapabilityRegistry {
    handlers: BTreeMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability under its own name.
    #[must_use]
    pub fn with(mut self, capability: Arc<dyn Capability>) -> Self {
        debug!(capability = %capability.name(), "capability registered");
        self.handlers.insert(capability.name().to_string(), capability);
        self
    }

    /// Look up a handler. An unknown name is a typed result, never a panic.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::UnsupportedAction`] when no handler is
    /// registered under `capability`.
    pub fn get(&self, capability: &str, action: &str) -> CapabilityResult<Arc<dyn Capability>> {
        self.handlers
            .get(capability)
            .cloned()
            .ok_or_else(|| CapabilityError::UnsupportedAction {
                capability: capability.to_string(),
                action: action.to_string(),
            })
    }

    /// Registered capability names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("capabilities", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl Capability for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        async fn plan(
            &self,
            _request: &PlanRequest,
            _config: &PolicyConfig,
        ) -> CapabilityResult<Plan> {
            unreachable!("not exercised")
        }

        async fn execute(
            &self,
            _plan: &Plan,
            _config: &PolicyConfig,
        ) -> CapabilityResult<ExecutionOutcome> {
            unreachable!("not exercised")
        }
    }

    #[test]
    fn test_unknown_capability_is_typed() {
        let registry = CapabilityRegistry::new().with(Arc::new(Noop));
        let err = match registry.get("mystery", "go") {
            Err(e) => e,
            Ok(_) => panic!("unknown capability resolved"),
        };
        assert_eq!(err.code(), "UNSUPPORTED_ACTION");
        assert!(registry.get("noop", "go").is_ok());
    }

    #[test]
    fn test_names_sorted() {
        let registry = CapabilityRegistry::new().with(Arc::new(Noop));
        assert_eq!(registry.names(), vec!["noop"]);
    }
}
