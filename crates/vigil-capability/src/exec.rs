//! Shell execution through an external command runner.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use vigil_config::PolicyConfig;
use vigil_core::{Blocker, Plan, PlanOperation, RiskTier};
use vigil_policy::{resolve_action, Resolution};

use crate::error::{CapabilityError, CapabilityResult};
use crate::executor::CommandRunner;
use crate::registry::{Capability, ExecutionOutcome, PlanRequest};

/// Output longer than this is truncated in the result document.
const MAX_OUTPUT_CHARS: usize = 4096;

/// Shell execution: every `run` is mutating and high risk by default.
pub struct Exec {
    runner: Arc<dyn CommandRunner>,
}

impl Exec {
    /// Build over a concrete runner.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl std::fmt::Debug for Exec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exec").finish_non_exhaustive()
    }
}

#[async_trait]
impl Capability for Exec {
    fn name(&self) -> &str {
        "exec"
    }

    async fn plan(
        &self,
        request: &PlanRequest,
        config: &PolicyConfig,
    ) -> CapabilityResult<Plan> {
        if request.action != "run" {
            return Err(CapabilityError::UnsupportedAction {
                capability: self.name().to_string(),
                action: request.action.clone(),
            });
        }
        let Some(command) = request.payload.get("command").and_then(Value::as_str) else {
            return Err(CapabilityError::MissingField {
                code: "COMMAND_REQUIRED",
                field: "command",
            });
        };

        let mut blockers = Vec::new();
        if !self.runner.available() {
            blockers.push(Blocker::new(
                "CONNECTOR_UNAVAILABLE",
                "command runner is not available",
            ));
        }

        let resolution = resolve_action(
            config,
            "capability:exec",
            "run",
            Resolution::fallback(RiskTier::High, true),
        );

        Ok(Plan {
            capability: self.name().to_string(),
            action: request.action.clone(),
            requester: request.requester.clone(),
            payload: request.payload.clone(),
            candidate_paths: Vec::new(),
            operations: vec![PlanOperation::new("run", command)],
            risk_tier: resolution.risk_tier,
            mutating: true,
            approval_required: resolution.requires_approval,
            required_flags: resolution.required_flags,
            blockers,
            warnings: Vec::new(),
            rollback: vec!["shell effects are not automatically reversible".to_string()],
            summary: format!("run `{command}`"),
            grant_id: None,
        })
    }

    async fn execute(
        &self,
        plan: &Plan,
        _config: &PolicyConfig,
    ) -> CapabilityResult<ExecutionOutcome> {
        if plan.is_blocked() {
            return Err(CapabilityError::PlanBlocked {
                blockers: plan.blockers.clone(),
            });
        }
        let command = plan
            .operations
            .first()
            .map(|op| op.target.clone())
            .unwrap_or_default();

        let output = self.runner.run(&command).await.map_err(|e| {
            CapabilityError::ExecuteFailed {
                detail: e.to_string(),
                executed_steps: Vec::new(),
            }
        })?;
        info!(command = %command, status = output.status, "command finished");

        Ok(ExecutionOutcome::steps(vec![format!("ran `{command}`")]).with_detail(json!({
            "status": output.status,
            "stdout": truncate(&output.stdout),
            "stderr": truncate(&output.stderr),
        })))
    }
}

fn truncate(text: &str) -> String {
    if text.len() <= MAX_OUTPUT_CHARS {
        return text.to_string();
    }
    let cut = text
        .char_indices()
        .take_while(|(i, _)| *i < MAX_OUTPUT_CHARS)
        .last()
        .map_or(0, |(i, c)| i.saturating_add(c.len_utf8()));
    format!("{}... [truncated]", &text[..cut])
}
