//! The batch orchestrator.
//!
//! One `run_once` call drains the queue to empty: no long-running process
//! is assumed, an external scheduler re-invokes the worker. Requests are
//! handled strictly one at a time; a failure in one request becomes a
//! structured result row and a notification, never a crash, and the pass
//! moves on to the next item.

use std::sync::Arc;

use tracing::{error, info, warn};

use vigil_approval::{CreateToken, GrantDecision, GrantStore, TokenStore, ValidationAttempt};
use vigil_audit::{AuditEvent, AuditEventType, AuditLog};
use vigil_capability::{CapabilityRegistry, PlanRequest};
use vigil_config::PolicyConfig;
use vigil_core::Plan;
use vigil_queue::{CommandEnvelope, CommandQueue, ExecuteDecision, Phase, RequestResult};

use crate::error::{WorkerError, WorkerResult};
use crate::notify::{render_failure, render_preview, render_result, Notifier};

/// Drives queued requests through plan, approval, revalidation, and
/// execution.
pub struct Orchestrator {
    config: PolicyConfig,
    queue: CommandQueue,
    registry: CapabilityRegistry,
    tokens: TokenStore,
    grants: GrantStore,
    audit: AuditLog,
    notifier: Arc<dyn Notifier>,
}

impl Orchestrator {
    /// Assemble an orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        config: PolicyConfig,
        queue: CommandQueue,
        registry: CapabilityRegistry,
        tokens: TokenStore,
        grants: GrantStore,
        audit: AuditLog,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            queue,
            registry,
            tokens,
            grants,
            audit,
            notifier,
        }
    }

    /// Drain the queue to empty. Returns how many requests were handled.
    pub async fn run_once(&self) -> usize {
        let mut processed: usize = 0;
        loop {
            let claim = match self.queue.claim_next() {
                Ok(Some(claim)) => claim,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "queue claim failed; ending pass");
                    break;
                },
            };
            processed = processed.saturating_add(1);

            let envelope = claim.envelope.clone();
            let result = match self.handle(&envelope).await {
                Ok(result) => result,
                Err(e) => self.report_failure(&envelope, &e).await,
            };
            if let Err(e) = self.queue.complete(claim, &result) {
                error!(request = %envelope.request_id, error = %e, "completing claim failed");
            }
        }
        info!(processed, "worker pass complete");
        processed
    }

    async fn handle(&self, envelope: &CommandEnvelope) -> WorkerResult<RequestResult> {
        match envelope.phase {
            Phase::Plan => self.handle_plan(envelope).await,
            Phase::Execute => self.handle_execute(envelope).await,
        }
    }

    // -- plan phase --

    async fn handle_plan(&self, envelope: &CommandEnvelope) -> WorkerResult<RequestResult> {
        let capability = self.registry.get(&envelope.capability, &envelope.action)?;
        let request = PlanRequest {
            action: envelope.action.clone(),
            payload: envelope.payload.clone(),
            requester: envelope.requested_by.clone(),
            context: envelope.context.clone(),
        };
        let plan = capability.plan(&request, &self.config).await?;

        // The decision is recorded before anything can mutate.
        let decision = if plan.requires_approval() {
            "approval_required"
        } else {
            "auto_execute"
        };
        self.audit.append(
            &AuditEvent::new(
                AuditEventType::PlanReviewed,
                envelope.request_id.clone(),
                &envelope.requested_by,
                &envelope.action_type(),
                decision,
                &envelope.payload,
            )
            .with_actor_bot(envelope.actor_bot_id.as_deref())
            .with_risk(plan.risk_tier),
        )?;

        if !plan.requires_approval() {
            let outcome = capability.execute(&plan, &self.config).await?;
            self.record_execution(envelope, &plan, AuditEventType::AutoExecuted, None)?;
            self.notifier
                .notify(&envelope.requested_by, &render_result(&plan, &outcome))
                .await;
            return Ok(RequestResult::ok(
                envelope.request_id.clone(),
                &plan.summary,
                outcome.executed_steps,
            ));
        }

        // An active grant bypasses the token round-trip, with attribution.
        if let GrantDecision::Covered(grant_id) =
            self.grants.check(Some(&envelope.requested_by), plan.mutating)?
        {
            let mut granted = plan.clone();
            granted.grant_id = Some(grant_id);
            granted.required_flags.clear();

            let outcome = capability.execute(&granted, &self.config).await?;
            self.record_execution(envelope, &granted, AuditEventType::Executed, None)?;
            self.notifier
                .notify(&envelope.requested_by, &render_result(&granted, &outcome))
                .await;
            return Ok(RequestResult::ok(
                envelope.request_id.clone(),
                &granted.summary,
                outcome.executed_steps,
            ));
        }

        let token = self.tokens.create(CreateToken {
            requester: envelope.requested_by.clone(),
            actor_bot_id: envelope.actor_bot_id.clone(),
            action_type: envelope.action_type(),
            plan: plan.clone(),
            request_id: envelope.request_id.clone(),
            requested_ttl_secs: envelope.requested_ttl_secs,
        })?;
        self.notifier
            .notify(&envelope.requested_by, &render_preview(&plan, &token))
            .await;

        Ok(RequestResult::ok(
            envelope.request_id.clone(),
            &plan.summary,
            vec![format!("awaiting approval, token {}", token.token_id)],
        ))
    }

    // -- execute phase --

    async fn handle_execute(&self, envelope: &CommandEnvelope) -> WorkerResult<RequestResult> {
        let token_id = envelope.token_id.clone().ok_or(WorkerError::TokenRequired)?;

        if envelope.decision == Some(ExecuteDecision::Deny) {
            let reason = envelope.deny_reason.as_deref().unwrap_or("denied by requester");
            let token = self.tokens.deny(&token_id, reason)?;
            self.audit.append(
                &AuditEvent::new(
                    AuditEventType::Denied,
                    envelope.request_id.clone(),
                    &envelope.requested_by,
                    &token.action_type,
                    "denied",
                    &token.plan.payload,
                )
                .with_risk(token.risk_level)
                .with_token(&token_id),
            )?;
            self.notifier
                .notify(
                    &envelope.requested_by,
                    &format!("Denied: {} ({reason})", token.plan.summary),
                )
                .await;
            return Ok(RequestResult::ok(
                envelope.request_id.clone(),
                &token.plan.summary,
                vec!["denied".to_string()],
            ));
        }

        let attempt = ValidationAttempt {
            requester: envelope.requested_by.clone(),
            actor_bot_id: envelope.actor_bot_id.clone(),
            provided_flags: envelope.provided_flags.clone(),
            identity_mode: self.config.identity_mode,
        };
        let token = self.tokens.validate(&token_id, &attempt)?;

        // Mandatory revalidation: rebuild the plan from the token's stored
        // inputs and compare hashes. The resource may have changed between
        // review and execution; drift short-circuits before any side
        // effect.
        let capability = self
            .registry
            .get(&token.plan.capability, &token.plan.action)?;
        let recomputed = capability
            .plan(&PlanRequest::from_plan(&token.plan), &self.config)
            .await?;
        let actual = recomputed.content_hash();
        if actual != token.plan_hash {
            warn!(token = %token_id, expected = %token.plan_hash.short(),
                  actual = %actual.short(), "plan drift detected");
            return Err(WorkerError::PlanMismatch {
                expected: token.plan_hash.clone(),
                actual,
            });
        }

        self.tokens.consume(&token_id, &envelope.requested_by)?;
        let outcome = capability.execute(&recomputed, &self.config).await?;
        self.record_execution(envelope, &recomputed, AuditEventType::Executed, Some(&token_id))?;
        self.notifier
            .notify(&envelope.requested_by, &render_result(&recomputed, &outcome))
            .await;

        Ok(RequestResult::ok(
            envelope.request_id.clone(),
            &recomputed.summary,
            outcome.executed_steps,
        ))
    }

    // -- shared --

    fn record_execution(
        &self,
        envelope: &CommandEnvelope,
        plan: &Plan,
        event_type: AuditEventType,
        token_id: Option<&vigil_core::TokenId>,
    ) -> WorkerResult<()> {
        let decision = match (&plan.grant_id, event_type) {
            (Some(_), _) => "grant_authorized",
            (None, AuditEventType::AutoExecuted) => "auto_execute",
            _ => "executed",
        };
        let mut event = AuditEvent::new(
            event_type,
            envelope.request_id.clone(),
            &envelope.requested_by,
            &envelope.action_type(),
            decision,
            &plan.payload,
        )
        .with_actor_bot(envelope.actor_bot_id.as_deref())
        .with_risk(plan.risk_tier);
        if let Some(token_id) = token_id {
            event = event.with_token(token_id);
        }
        Ok(self.audit.append(&event)?)
    }

    /// Convert an error into a result row and a notification. Execute-phase
    /// rejections are additionally audited; nothing has mutated at this
    /// point unless the error itself reports partial steps.
    async fn report_failure(&self, envelope: &CommandEnvelope, e: &WorkerError) -> RequestResult {
        warn!(request = %envelope.request_id, code = e.code(), error = %e, "request failed");

        if envelope.phase == Phase::Execute {
            let audit = AuditEvent::new(
                AuditEventType::Rejected,
                envelope.request_id.clone(),
                &envelope.requested_by,
                &envelope.action_type(),
                e.code(),
                &envelope.payload,
            )
            .with_actor_bot(envelope.actor_bot_id.as_deref());
            if let Err(audit_err) = self.audit.append(&audit) {
                warn!(error = %audit_err, "audit append failed for rejection");
            }
        }

        self.notifier
            .notify(
                &envelope.requested_by,
                &render_failure(&envelope.action_type(), e.code(), &e.to_string()),
            )
            .await;

        RequestResult::err(envelope.request_id.clone(), e.code(), &e.to_string())
            .with_steps(e.executed_steps())
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("capabilities", &self.registry.names())
            .finish_non_exhaustive()
    }
}
