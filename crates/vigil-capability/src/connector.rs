//! Connector-backed capabilities: photo, schedule, browser, bot dispatch.
//!
//! These four share a shape — validate one required field, probe the
//! connector, resolve risk from the rule table, and hand the payload to
//! the connector on execute — so one adapter parameterized by an action
//! table covers them all.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use vigil_config::PolicyConfig;
use vigil_core::{Blocker, Plan, PlanOperation, RiskTier};
use vigil_policy::{resolve_action, Resolution};

use crate::error::{CapabilityError, CapabilityResult};
use crate::executor::Connector;
use crate::registry::{Capability, ExecutionOutcome, PlanRequest};

/// One action a connector capability supports.
#[derive(Debug, Clone, Copy)]
struct ActionSpec {
    name: &'static str,
    mutating: bool,
    /// Payload field that must be present, with the code reported when it
    /// is not.
    required: Option<(&'static str, &'static str)>,
}

/// A capability whose side effect is one connector call.
pub struct ConnectorCapability {
    name: &'static str,
    actions: Vec<ActionSpec>,
    connector: Arc<dyn Connector>,
}

impl ConnectorCapability {
    fn new(name: &'static str, actions: Vec<ActionSpec>, connector: Arc<dyn Connector>) -> Self {
        Self {
            name,
            actions,
            connector,
        }
    }

    /// Camera captures through a photo connector.
    #[must_use]
    pub fn photo(connector: Arc<dyn Connector>) -> Self {
        Self::new(
            "photo",
            vec![ActionSpec {
                name: "capture",
                mutating: true,
                required: None,
            }],
            connector,
        )
    }

    /// Calendar events through a scheduling connector.
    #[must_use]
    pub fn schedule(connector: Arc<dyn Connector>) -> Self {
        Self::new(
            "schedule",
            vec![
                ActionSpec {
                    name: "create_event",
                    mutating: true,
                    required: Some(("title", "TITLE_REQUIRED")),
                },
                ActionSpec {
                    name: "list_events",
                    mutating: false,
                    required: None,
                },
            ],
            connector,
        )
    }

    /// Page navigation and actions through a browser connector.
    #[must_use]
    pub fn browser(connector: Arc<dyn Connector>) -> Self {
        Self::new(
            "browser",
            vec![
                ActionSpec {
                    name: "open",
                    mutating: false,
                    required: Some(("url", "URL_REQUIRED")),
                },
                ActionSpec {
                    name: "act",
                    mutating: true,
                    required: Some(("url", "URL_REQUIRED")),
                },
            ],
            connector,
        )
    }

    /// Task hand-off to another bot.
    #[must_use]
    pub fn bot_dispatch(connector: Arc<dyn Connector>) -> Self {
        Self::new(
            "bot_dispatch",
            vec![ActionSpec {
                name: "dispatch",
                mutating: true,
                required: Some(("task", "TASK_REQUIRED")),
            }],
            connector,
        )
    }

    fn spec(&self, action: &str) -> CapabilityResult<ActionSpec> {
        self.actions
            .iter()
            .find(|spec| spec.name == action)
            .copied()
            .ok_or_else(|| CapabilityError::UnsupportedAction {
                capability: self.name.to_string(),
                action: action.to_string(),
            })
    }
}

impl std::fmt::Debug for ConnectorCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorCapability")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Capability for ConnectorCapability {
    fn name(&self) -> &str {
        self.name
    }

    async fn plan(
        &self,
        request: &PlanRequest,
        config: &PolicyConfig,
    ) -> CapabilityResult<Plan> {
        let spec = self.spec(&request.action)?;

        let target = match spec.required {
            Some((field, code)) => match request.payload.get(field).and_then(Value::as_str) {
                Some(value) => value.to_string(),
                None => return Err(CapabilityError::MissingField { code, field }),
            },
            None => String::new(),
        };

        let mut blockers = Vec::new();
        if !self.connector.available() {
            blockers.push(Blocker::new(
                "CONNECTOR_UNAVAILABLE",
                format!("connector `{}` is not available", self.connector.name()),
            ));
        }

        // Exact rule under `capability:<name>`, else the generic
        // `capability` default.
        let fallback = resolve_action(
            config,
            "capability",
            spec.name,
            Resolution::fallback(RiskTier::High, spec.mutating),
        );
        let domain = format!("capability:{}", self.name);
        let mut resolution = resolve_action(config, &domain, spec.name, fallback);
        if !spec.mutating {
            resolution = Resolution::fallback(RiskTier::Medium, false);
        }

        Ok(Plan {
            capability: self.name.to_string(),
            action: request.action.clone(),
            requester: request.requester.clone(),
            payload: request.payload.clone(),
            candidate_paths: Vec::new(),
            operations: vec![PlanOperation::new(spec.name, target)],
            risk_tier: resolution.risk_tier,
            mutating: spec.mutating,
            approval_required: resolution.requires_approval,
            required_flags: resolution.required_flags,
            blockers,
            warnings: Vec::new(),
            rollback: Vec::new(),
            summary: format!("{}:{}", self.name, spec.name),
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
        if !self.connector.available() {
            return Err(CapabilityError::ConnectorUnavailable {
                name: self.connector.name().to_string(),
            });
        }

        let detail = self
            .connector
            .invoke(&plan.action, &plan.payload)
            .await
            .map_err(|e| CapabilityError::ExecuteFailed {
                detail: e.to_string(),
                executed_steps: Vec::new(),
            })?;
        info!(capability = %self.name, action = %plan.action, "connector call complete");

        Ok(ExecutionOutcome::steps(vec![format!("{}:{} via {}", self.name, plan.action,
            self.connector.name())])
        .with_detail(detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorResult;
    use serde_json::json;

    struct FakeConnector {
        offline: bool,
    }

    #[async_trait]
    impl Connector for FakeConnector {
        fn name(&self) -> &str {
            "fake"
        }

        fn available(&self) -> bool {
            !self.offline
        }

        async fn invoke(&self, action: &str, _payload: &Value) -> ExecutorResult<Value> {
            Ok(json!({"did": action}))
        }
    }

    fn online() -> Arc<dyn Connector> {
        Arc::new(FakeConnector { offline: false })
    }

    fn config() -> PolicyConfig {
        PolicyConfig::defaults().unwrap()
    }

    #[tokio::test]
    async fn test_browser_act_requires_url_and_force() {
        let cap = ConnectorCapability::browser(online());
        let err = cap
            .plan(&PlanRequest::new("act", json!({}), "u1"), &config())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "URL_REQUIRED");

        let plan = cap
            .plan(
                &PlanRequest::new("act", json!({"url": "https://example.com"}), "u1"),
                &config(),
            )
            .await
            .unwrap();
        assert_eq!(plan.risk_tier, RiskTier::High);
        assert_eq!(plan.required_flags, vec!["force"]);
        assert!(plan.requires_approval());
    }

    #[tokio::test]
    async fn test_browser_open_is_non_mutating() {
        let plan = ConnectorCapability::browser(online())
            .plan(
                &PlanRequest::new("open", json!({"url": "https://example.com"}), "u1"),
                &config(),
            )
            .await
            .unwrap();
        assert!(!plan.mutating);
        assert!(!plan.requires_approval());
        assert!(plan.required_flags.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_requires_task() {
        let err = ConnectorCapability::bot_dispatch(online())
            .plan(&PlanRequest::new("dispatch", json!({}), "u1"), &config())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TASK_REQUIRED");
    }

    #[tokio::test]
    async fn test_unknown_action_is_typed() {
        let err = ConnectorCapability::photo(online())
            .plan(&PlanRequest::new("selfie", json!({}), "u1"), &config())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_ACTION");
    }

    #[tokio::test]
    async fn test_execute_invokes_connector() {
        let cap = ConnectorCapability::schedule(online());
        let plan = cap
            .plan(
                &PlanRequest::new("create_event", json!({"title": "standup"}), "u1"),
                &config(),
            )
            .await
            .unwrap();
        let outcome = cap.execute(&plan, &config()).await.unwrap();
        assert_eq!(outcome.detail["did"], "create_event");
    }

    #[tokio::test]
    async fn test_offline_connector_blocks_and_refuses() {
        let offline: Arc<dyn Connector> = Arc::new(FakeConnector { offline: true });
        let cap = ConnectorCapability::photo(offline);
        let plan = cap
            .plan(&PlanRequest::new("capture", json!({}), "u1"), &config())
            .await
            .unwrap();
        assert!(plan.blockers.iter().any(|b| b.code == "CONNECTOR_UNAVAILABLE"));
    }
}
