//! Outbound notification boundary.
//!
//! The plain-text messages rendered here are the only output surface an
//! end user sees: plan previews, execution results, and failures. No raw
//! stack traces, no secrets, and error details are truncated.

use async_trait::async_trait;
use tracing::info;

use vigil_approval::ApprovalToken;
use vigil_capability::ExecutionOutcome;
use vigil_core::Plan;

/// Detail strings longer than this are cut in notifications.
const MAX_DETAIL_CHARS: usize = 240;

/// Delivery seam for human-readable messages. The transport (chat bot,
/// terminal, test collector) lives outside this crate.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message to a requester.
    async fn notify(&self, requester: &str, message: &str);
}

/// A notifier that writes messages to the log. Used by the CLI runner.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, requester: &str, message: &str) {
        info!(requester = %requester, "{message}");
    }
}

/// Render a plan preview awaiting approval.
#[must_use]
pub fn render_preview(plan: &Plan, token: &ApprovalToken) -> String {
    let mut lines = vec![
        format!("Approval needed: {}", plan.summary),
        format!("Risk: {}", plan.risk_tier),
    ];
    if !plan.required_flags.is_empty() {
        lines.push(format!("Required flags: {}", plan.required_flags.join(", ")));
    }
    for blocker in &plan.blockers {
        lines.push(format!("Blocker: {blocker}"));
    }
    for warning in &plan.warnings {
        lines.push(format!("Warning: {warning}"));
    }
    for step in &plan.rollback {
        lines.push(format!("Rollback: {step}"));
    }
    lines.push(format!("Token: {} (expires {})", token.token_id, token.expires_at));
    lines.join("\n")
}

/// Render a completed execution.
#[must_use]
pub fn render_result(plan: &Plan, outcome: &ExecutionOutcome) -> String {
    let mut lines = vec![format!("Done: {}", plan.summary)];
    for step in &outcome.executed_steps {
        lines.push(format!("  - {step}"));
    }
    if let Some(grant) = &plan.grant_id {
        lines.push(format!("Authorized by grant {grant}"));
    }
    lines.join("\n")
}

/// Render a structured failure: code plus truncated detail.
#[must_use]
pub fn render_failure(summary: &str, code: &str, detail: &str) -> String {
    format!("Failed: {summary}\n[{code}] {}", truncate(detail))
}

fn truncate(text: &str) -> String {
    if text.len() <= MAX_DETAIL_CHARS {
        return text.to_string();
    }
    let cut = text
        .char_indices()
        .take_while(|(i, _)| *i < MAX_DETAIL_CHARS)
        .last()
        .map_or(0, |(i, c)| i.saturating_add(c.len_utf8()));
    format!("{}...", &text[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vigil_approval::CreateToken;
    use vigil_config::TokenPolicy;
    use vigil_core::{PlanOperation, RequestId, RiskTier};

    fn plan() -> Plan {
        Plan {
            capability: "file_control".to_string(),
            action: "delete".to_string(),
            requester: "u1".to_string(),
            payload: json!({"target": "/docs/a"}),
            candidate_paths: vec!["/docs/a".to_string()],
            operations: vec![PlanOperation::new("delete", "/docs/a")],
            risk_tier: RiskTier::High,
            mutating: true,
            approval_required: true,
            required_flags: vec!["force".to_string()],
            blockers: vec![],
            warnings: vec!["heads up".to_string()],
            rollback: vec!["restore from backup".to_string()],
            summary: "delete /docs/a".to_string(),
            grant_id: None,
        }
    }

    #[test]
    fn test_preview_contains_essentials() {
        let plan = plan();
        let token = vigil_approval::ApprovalToken::create(
            CreateToken {
                requester: "u1".to_string(),
                actor_bot_id: None,
                action_type: "file_control:delete".to_string(),
                plan: plan.clone(),
                request_id: RequestId::new(),
                requested_ttl_secs: None,
            },
            &TokenPolicy {
                default_ttl_secs: 300,
                min_ttl_secs: 60,
                max_ttl_secs: 3600,
            },
        );

        let text = render_preview(&plan, &token);
        assert!(text.contains("Risk: HIGH"));
        assert!(text.contains("force"));
        assert!(text.contains("Rollback"));
        assert!(text.contains(&token.token_id.to_string()));
    }

    #[test]
    fn test_failure_truncates_detail() {
        let text = render_failure("delete /docs/a", "TOKEN_EXPIRED", &"x".repeat(1000));
        assert!(text.contains("[TOKEN_EXPIRED]"));
        assert!(text.len() < 400);
    }
}
