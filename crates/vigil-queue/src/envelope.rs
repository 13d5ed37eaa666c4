//! The queued unit of work.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use vigil_core::{RequestContext, RequestId, Timestamp, TokenId};

/// Current envelope schema version. Bumped when the on-disk shape changes
/// incompatibly; claimed records with an unknown version are quarantined
/// rather than guessed at.
pub const SCHEMA_VERSION: u32 = 1;

/// Which trip through the queue this request represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Build and review a plan; no side effect.
    Plan,
    /// Carry back a token (or a deny) against a reviewed plan.
    Execute,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan => write!(f, "plan"),
            Self::Execute => write!(f, "execute"),
        }
    }
}

/// Dispatch family of a queued request.
///
/// Redundant with `(capability, phase)` but carried on disk so a record
/// is classifiable without consulting the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Plan trip for the file-control capability.
    FileControl,
    /// Plan trip for any other capability.
    Capability,
    /// Execute trip carrying a token decision.
    Execute,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileControl => write!(f, "file_control"),
            Self::Capability => write!(f, "capability"),
            Self::Execute => write!(f, "execute"),
        }
    }
}

/// Decision carried on an execute-phase envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteDecision {
    /// Proceed; the envelope must name a token.
    Approve,
    /// Refuse; the named token is denied.
    Deny,
}

/// A queued plan or execute request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// On-disk schema version.
    pub schema_version: u32,
    /// Unique request identifier; the queue file name derives from it.
    pub request_id: RequestId,
    /// Dispatch family.
    pub command_kind: CommandKind,
    /// Capability the request targets, e.g. `file_control`.
    pub capability: String,
    /// Action within the capability, e.g. `trash`.
    pub action: String,
    /// Plan or execute trip.
    pub phase: Phase,
    /// Who asked.
    pub requested_by: String,
    /// Bot relaying the request, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_bot_id: Option<String>,
    /// Chat-provider identity context, when the request came from one.
    #[serde(default)]
    pub context: RequestContext,
    /// Action payload, shape defined by the capability.
    pub payload: Value,
    /// When the envelope was enqueued.
    pub created_at: Timestamp,
    /// Token being consumed or denied. Execute phase only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<TokenId>,
    /// Approve or deny. Execute phase only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<ExecuteDecision>,
    /// Reason accompanying a deny decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny_reason: Option<String>,
    /// Approval flags the requester typed, e.g. `["force"]`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provided_flags: Vec<String>,
    /// Requested token TTL override, seconds. Plan phase only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_ttl_secs: Option<u64>,
}

impl CommandEnvelope {
    /// Build a plan-phase envelope.
    #[must_use]
    pub fn plan(capability: &str, action: &str, requested_by: &str, payload: Value) -> Self {
        let command_kind = if capability == "file_control" {
            CommandKind::FileControl
        } else {
            CommandKind::Capability
        };
        Self {
            schema_version: SCHEMA_VERSION,
            request_id: RequestId::new(),
            command_kind,
            capability: capability.to_string(),
            action: action.to_string(),
            phase: Phase::Plan,
            requested_by: requested_by.to_string(),
            actor_bot_id: None,
            context: RequestContext::default(),
            payload,
            created_at: Timestamp::now(),
            token_id: None,
            decision: None,
            deny_reason: None,
            provided_flags: Vec::new(),
            requested_ttl_secs: None,
        }
    }

    /// Build an approve-and-execute envelope against a minted token.
    #[must_use]
    pub fn approve(
        capability: &str,
        action: &str,
        requested_by: &str,
        payload: Value,
        token_id: TokenId,
        provided_flags: Vec<String>,
    ) -> Self {
        let mut envelope = Self::plan(capability, action, requested_by, payload);
        envelope.command_kind = CommandKind::Execute;
        envelope.phase = Phase::Execute;
        envelope.token_id = Some(token_id);
        envelope.decision = Some(ExecuteDecision::Approve);
        envelope.provided_flags = provided_flags;
        envelope
    }

    /// Build a deny envelope against a minted token.
    #[must_use]
    pub fn deny(
        capability: &str,
        action: &str,
        requested_by: &str,
        token_id: TokenId,
        reason: &str,
    ) -> Self {
        let mut envelope = Self::plan(capability, action, requested_by, Value::Null);
        envelope.command_kind = CommandKind::Execute;
        envelope.phase = Phase::Execute;
        envelope.token_id = Some(token_id);
        envelope.decision = Some(ExecuteDecision::Deny);
        envelope.deny_reason = Some(reason.to_string());
        envelope
    }

    /// Attach the acting bot.
    #[must_use]
    pub fn with_actor_bot(mut self, bot_id: &str) -> Self {
        self.actor_bot_id = Some(bot_id.to_string());
        self
    }

    /// Attach provider identity context.
    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    /// `capability:action` label used in audit records and notifications.
    #[must_use]
    pub fn action_type(&self) -> String {
        format!("{}:{}", self.capability, self.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_envelope_defaults() {
        let env = CommandEnvelope::plan("file_control", "trash", "u1", json!({"target": "/a"}));
        assert_eq!(env.schema_version, SCHEMA_VERSION);
        assert_eq!(env.phase, Phase::Plan);
        assert_eq!(env.command_kind, CommandKind::FileControl);
        assert!(env.token_id.is_none());
        assert_eq!(env.action_type(), "file_control:trash");
    }

    #[test]
    fn test_execute_envelope_roundtrip() {
        let token = TokenId::new();
        let env = CommandEnvelope::approve(
            "file_control",
            "delete",
            "u1",
            json!({"target": "/a"}),
            token.clone(),
            vec!["force".to_string()],
        );
        let json = serde_json::to_string(&env).unwrap();
        let back: CommandEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.phase, Phase::Execute);
        assert_eq!(back.command_kind, CommandKind::Execute);
        assert_eq!(back.decision, Some(ExecuteDecision::Approve));
        assert_eq!(back.token_id, Some(token));
        assert_eq!(back.provided_flags, vec!["force"]);
    }

    #[test]
    fn test_optional_fields_omitted_on_disk() {
        let env = CommandEnvelope::plan("exec", "run", "u1", json!({"command": "ls"}));
        let json = serde_json::to_string(&env).unwrap();
        assert!(!json.contains("token_id"));
        assert!(!json.contains("deny_reason"));
        assert!(!json.contains("provided_flags"));
    }
}
