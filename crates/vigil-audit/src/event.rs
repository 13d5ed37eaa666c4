//! Audit event types and payload redaction.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use vigil_core::{RequestId, RiskTier, Timestamp, TokenId};

/// Marker substituted for any secret-shaped value in a logged payload.
pub const REDACTED: &str = "[REDACTED]";

/// Payload keys whose values are never written to the log.
const SECRET_KEYS: [&str; 5] = ["token", "authorization", "password", "secret", "cookie"];

/// What kind of event is being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A plan was built and reviewed.
    PlanReviewed,
    /// A plan was approved and executed.
    Executed,
    /// A plan was executed inline without approval.
    AutoExecuted,
    /// An execute request was denied.
    Denied,
    /// An execute request was rejected before any side effect.
    Rejected,
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlanReviewed => write!(f, "plan_reviewed"),
            Self::Executed => write!(f, "executed"),
            Self::AutoExecuted => write!(f, "auto_executed"),
            Self::Denied => write!(f, "denied"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// One append-only audit record. Write-only from the engine's point of
/// view; only operators and log tooling read these back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// When the event was recorded.
    pub timestamp: Timestamp,
    /// What happened.
    pub event_type: AuditEventType,
    /// Queue request the event belongs to.
    pub request_id: RequestId,
    /// Who asked for the operation.
    pub requester: String,
    /// Bot acting for the requester, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_bot_id: Option<String>,
    /// `capability:action` label.
    pub action_type: String,
    /// Risk tier the plan carried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskTier>,
    /// Decision string, e.g. `approval_required` or an error code.
    pub decision: String,
    /// Short digest of the involved token. Raw token ids never land in
    /// the log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_digest: Option<String>,
    /// Request payload with secret-shaped fields redacted.
    pub payload: Value,
}

impl AuditEvent {
    /// Build an event, redacting the payload and digesting the token.
    #[must_use]
    pub fn new(
        event_type: AuditEventType,
        request_id: RequestId,
        requester: &str,
        action_type: &str,
        decision: &str,
        payload: &Value,
    ) -> Self {
        Self {
            timestamp: Timestamp::now(),
            event_type,
            request_id,
            requester: requester.to_string(),
            actor_bot_id: None,
            action_type: action_type.to_string(),
            risk_level: None,
            decision: decision.to_string(),
            token_digest: None,
            payload: redact(payload),
        }
    }

    /// Attach the acting bot.
    #[must_use]
    pub fn with_actor_bot(mut self, bot_id: Option<&str>) -> Self {
        self.actor_bot_id = bot_id.map(str::to_string);
        self
    }

    /// Attach the plan's risk tier.
    #[must_use]
    pub fn with_risk(mut self, risk: RiskTier) -> Self {
        self.risk_level = Some(risk);
        self
    }

    /// Attach a token by digest.
    #[must_use]
    pub fn with_token(mut self, token_id: &TokenId) -> Self {
        self.token_digest = Some(token_digest(token_id));
        self
    }
}

/// Short hash prefix standing in for a raw token id.
#[must_use]
pub fn token_digest(token_id: &TokenId) -> String {
    let digest = blake3::hash(token_id.0.as_bytes()).to_hex();
    digest.as_str()[..12].to_string()
}

/// Replace every secret-shaped field in `value`, recursively, with the
/// redaction marker. Key matching is case-insensitive substring matching,
/// so `api_token` and `Authorization` are both caught.
#[must_use]
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, val) in map {
                let lowered = key.to_lowercase();
                if SECRET_KEYS.iter().any(|secret| lowered.contains(secret)) {
                    out.insert(key.clone(), Value::String(REDACTED.to_string()));
                } else {
                    out.insert(key.clone(), redact(val));
                }
            }
            Value::Object(out)
        },
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redact_top_level_secret() {
        let redacted = redact(&json!({"target": "/a", "password": "hunter2"}));
        assert_eq!(redacted["password"], REDACTED);
        assert_eq!(redacted["target"], "/a");
    }

    #[test]
    fn test_redact_nested_and_array() {
        let redacted = redact(&json!({
            "headers": {"Authorization": "Bearer x", "Accept": "json"},
            "batch": [{"cookie": "sid=1"}, {"path": "/b"}],
        }));
        assert_eq!(redacted["headers"]["Authorization"], REDACTED);
        assert_eq!(redacted["headers"]["Accept"], "json");
        assert_eq!(redacted["batch"][0]["cookie"], REDACTED);
        assert_eq!(redacted["batch"][1]["path"], "/b");
    }

    #[test]
    fn test_redact_substring_keys() {
        let redacted = redact(&json!({"api_token": "t", "client_secret": "s"}));
        assert_eq!(redacted["api_token"], REDACTED);
        assert_eq!(redacted["client_secret"], REDACTED);
    }

    #[test]
    fn test_token_digest_is_short_and_stable() {
        let id = TokenId::new();
        let a = token_digest(&id);
        let b = token_digest(&id);
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
        assert!(!a.contains(&id.0.to_string()));
    }

    #[test]
    fn test_event_never_carries_raw_token() {
        let id = TokenId::new();
        let event = AuditEvent::new(
            AuditEventType::Executed,
            RequestId::new(),
            "u1",
            "file_control:delete",
            "executed",
            &json!({"target": "/docs/a"}),
        )
        .with_token(&id)
        .with_risk(RiskTier::High);

        let line = serde_json::to_string(&event).unwrap();
        assert!(!line.contains(&id.0.to_string()));
        assert!(line.contains(&token_digest(&id)));
    }
}
