//! Outbound mail: `send` (mutating) and `draft` (preview only).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use vigil_config::PolicyConfig;
use vigil_core::{Blocker, Plan, PlanOperation, RiskTier};
use vigil_policy::{resolve_action, Resolution};

use crate::error::{CapabilityError, CapabilityResult};
use crate::executor::MailConnector;
use crate::registry::{Capability, ExecutionOutcome, PlanRequest};

/// Mail capability over an external delivery connector.
pub struct Mail {
    connector: Arc<dyn MailConnector>,
}

impl Mail {
    /// Build over a concrete connector.
    #[must_use]
    pub fn new(connector: Arc<dyn MailConnector>) -> Self {
        Self { connector }
    }
}

impl std::fmt::Debug for Mail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mail").finish_non_exhaustive()
    }
}

fn field<'a>(payload: &'a Value, name: &str) -> &'a str {
    payload.get(name).and_then(Value::as_str).unwrap_or_default()
}

#[async_trait]
impl Capability for Mail {
    fn name(&self) -> &str {
        "mail"
    }

    async fn plan(
        &self,
        request: &PlanRequest,
        config: &PolicyConfig,
    ) -> CapabilityResult<Plan> {
        let mutating = match request.action.as_str() {
            "send" => true,
            "draft" => false,
            _ => {
                return Err(CapabilityError::UnsupportedAction {
                    capability: self.name().to_string(),
                    action: request.action.clone(),
                })
            },
        };

        let to = field(&request.payload, "to");
        if mutating && to.is_empty() {
            return Err(CapabilityError::MissingField {
                code: "RECIPIENT_REQUIRED",
                field: "to",
            });
        }

        let mut blockers = Vec::new();
        if mutating && !self.connector.available() {
            blockers.push(Blocker::new(
                "CONNECTOR_UNAVAILABLE",
                "mail connector is not available",
            ));
        }

        let resolution = if mutating {
            resolve_action(
                config,
                "capability:mail",
                "send",
                Resolution::fallback(RiskTier::High, true),
            )
        } else {
            Resolution::fallback(RiskTier::Medium, false)
        };

        let subject = field(&request.payload, "subject");
        let operation = if mutating {
            PlanOperation::with_dest("send", to, subject)
        } else {
            PlanOperation::new("draft", subject)
        };

        Ok(Plan {
            capability: self.name().to_string(),
            action: request.action.clone(),
            requester: request.requester.clone(),
            payload: request.payload.clone(),
            candidate_paths: Vec::new(),
            operations: vec![operation],
            risk_tier: resolution.risk_tier,
            mutating,
            approval_required: mutating && resolution.requires_approval,
            required_flags: if mutating { resolution.required_flags } else { Vec::new() },
            blockers,
            warnings: Vec::new(),
            rollback: if mutating {
                vec!["a sent message cannot be recalled".to_string()]
            } else {
                Vec::new()
            },
            summary: if mutating {
                format!("send mail to {to}: {subject}")
            } else {
                format!("draft mail: {subject}")
            },
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

        let to = field(&plan.payload, "to");
        let subject = field(&plan.payload, "subject");
        let body = field(&plan.payload, "body");

        match plan.action.as_str() {
            "send" => {
                self.connector.send(to, subject, body).await.map_err(|e| {
                    CapabilityError::ExecuteFailed {
                        detail: e.to_string(),
                        executed_steps: Vec::new(),
                    }
                })?;
                info!(to = %to, "mail sent");
                Ok(ExecutionOutcome::steps(vec![format!("sent mail to {to}")]))
            },
            // Draft never touches the connector.
            _ => Ok(ExecutionOutcome::steps(vec!["drafted mail".to_string()])
                .with_detail(json!({"to": to, "subject": subject, "body": body}))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorResult;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeMail {
        sent: Mutex<Vec<String>>,
        offline: bool,
    }

    #[async_trait]
    impl MailConnector for FakeMail {
        fn available(&self) -> bool {
            !self.offline
        }

        async fn send(&self, to: &str, subject: &str, _body: &str) -> ExecutorResult<()> {
            self.sent
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(format!("{to}: {subject}"));
            Ok(())
        }
    }

    fn config() -> PolicyConfig {
        PolicyConfig::defaults().unwrap()
    }

    #[tokio::test]
    async fn test_send_requires_recipient() {
        let err = Mail::new(Arc::new(FakeMail::default()))
            .plan(&PlanRequest::new("send", json!({"subject": "hi"}), "u1"), &config())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "RECIPIENT_REQUIRED");
    }

    #[tokio::test]
    async fn test_send_is_gated_draft_is_not() {
        let cap = Mail::new(Arc::new(FakeMail::default()));
        let send = cap
            .plan(
                &PlanRequest::new("send", json!({"to": "a@b.c", "subject": "hi"}), "u1"),
                &config(),
            )
            .await
            .unwrap();
        assert!(send.requires_approval());
        assert_eq!(send.required_flags, vec!["force"]);

        let draft = cap
            .plan(&PlanRequest::new("draft", json!({"subject": "hi"}), "u1"), &config())
            .await
            .unwrap();
        assert!(!draft.requires_approval());
        assert!(!draft.mutating);
    }

    #[tokio::test]
    async fn test_offline_connector_blocks_send() {
        let cap = Mail::new(Arc::new(FakeMail {
            offline: true,
            ..Default::default()
        }));
        let plan = cap
            .plan(
                &PlanRequest::new("send", json!({"to": "a@b.c"}), "u1"),
                &config(),
            )
            .await
            .unwrap();
        assert!(plan.blockers.iter().any(|b| b.code == "CONNECTOR_UNAVAILABLE"));
        let err = cap.execute(&plan, &config()).await.unwrap_err();
        assert_eq!(err.code(), "PLAN_BLOCKED");
    }

    #[tokio::test]
    async fn test_draft_executes_inline() {
        let connector = Arc::new(FakeMail::default());
        let cap = Mail::new(connector.clone());
        let plan = cap
            .plan(
                &PlanRequest::new("draft", json!({"subject": "hi", "body": "text"}), "u1"),
                &config(),
            )
            .await
            .unwrap();
        let outcome = cap.execute(&plan, &config()).await.unwrap();
        assert_eq!(outcome.detail["subject"], "hi");
        // Draft never reaches the connector.
        assert!(connector.sent.lock().unwrap().is_empty());
    }
}
