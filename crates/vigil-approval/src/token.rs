//! Approval token types and the status state machine.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

use vigil_config::TokenPolicy;
use vigil_core::{Plan, PlanHash, RequestId, RiskTier, Timestamp, TokenId};

/// Terminal-or-pending status of an approval token.
///
/// `pending → {consumed | denied | expired}`; every transition out of
/// `pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    /// Awaiting a decision.
    Pending,
    /// Consumed by exactly one matching execute request.
    Consumed,
    /// Denied by the approver.
    Denied,
    /// Passed its TTL before a decision arrived.
    Expired,
}

impl TokenStatus {
    /// Check whether this status is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Consumed => write!(f, "consumed"),
            Self::Denied => write!(f, "denied"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// A time-boxed, non-replayable approval bound to one reviewed plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalToken {
    /// Unique token identifier; the pending/terminal file name derives
    /// from it.
    pub token_id: TokenId,
    /// When the token was minted.
    pub created_at: Timestamp,
    /// When it stops being consumable.
    pub expires_at: Timestamp,
    /// Effective TTL after clamping, in seconds.
    pub ttl_seconds: u64,
    /// Who requested the underlying operation.
    pub requester: String,
    /// Bot acting on behalf of the requester, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_bot_id: Option<String>,
    /// `capability:action` label of the operation.
    pub action_type: String,
    /// Risk tier of the reviewed plan.
    pub risk_level: RiskTier,
    /// Flags a consuming execute request must carry.
    pub required_flags: Vec<String>,
    /// The plan exactly as reviewed.
    pub plan: Plan,
    /// Content hash of the plan at approval time — the anti-drift anchor.
    pub plan_hash: PlanHash,
    /// Queue request that produced this token.
    pub request_id: RequestId,
    /// Lifecycle status.
    pub status: TokenStatus,
    /// When the token was consumed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_at: Option<Timestamp>,
    /// Who consumed it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_by: Option<String>,
    /// Who approved the execution (usually the consumer).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    /// Reason recorded on denial.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denied_reason: Option<String>,
}

/// Parameters for minting a new token.
#[derive(Debug, Clone)]
pub struct CreateToken {
    /// Who requested the operation.
    pub requester: String,
    /// Acting bot, if the request came through one.
    pub actor_bot_id: Option<String>,
    /// `capability:action` label.
    pub action_type: String,
    /// The plan being gated.
    pub plan: Plan,
    /// Originating queue request.
    pub request_id: RequestId,
    /// Requested TTL in seconds; `None` uses the policy default. Clamped
    /// into `[min_ttl, max_ttl]` either way.
    pub requested_ttl_secs: Option<u64>,
}

impl ApprovalToken {
    /// Mint a pending token from a reviewed plan.
    ///
    /// The requested TTL is clamped into the policy's `[min, max]` window;
    /// the plan hash is computed over the plan's security-relevant
    /// projection only.
    #[must_use]
    pub fn create(params: CreateToken, policy: &TokenPolicy) -> Self {
        let ttl_seconds = params
            .requested_ttl_secs
            .unwrap_or(policy.default_ttl_secs)
            .clamp(policy.min_ttl_secs, policy.max_ttl_secs);
        let created_at = Timestamp::now();
        // Safety: chrono Duration addition cannot overflow for clamped TTLs
        #[allow(clippy::arithmetic_side_effects)]
        let expires_at = Timestamp::from_datetime(
            created_at.0 + Duration::seconds(i64::try_from(ttl_seconds).unwrap_or(i64::MAX)),
        );
        let plan_hash = params.plan.content_hash();
        let risk_level = params.plan.risk_tier;
        let required_flags = params.plan.required_flags.clone();

        Self {
            token_id: TokenId::new(),
            created_at,
            expires_at,
            ttl_seconds,
            requester: params.requester,
            actor_bot_id: params.actor_bot_id,
            action_type: params.action_type,
            risk_level,
            required_flags,
            plan: params.plan,
            plan_hash,
            request_id: params.request_id,
            status: TokenStatus::Pending,
            consumed_at: None,
            consumed_by: None,
            approved_by: None,
            denied_reason: None,
        }
    }

    /// Check whether the token is past its expiry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_past()
    }

    /// Check whether terminal stamps are present despite a stale
    /// non-terminal status. The expiry sweep normalizes such records.
    #[must_use]
    pub fn has_stale_status(&self) -> bool {
        self.status == TokenStatus::Pending
            && (self.consumed_at.is_some() || self.denied_reason.is_some())
    }
}

impl fmt::Display for ApprovalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} by {} (expires {})",
            self.token_id, self.status, self.action_type, self.requester, self.expires_at
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vigil_core::PlanOperation;

    fn sample_plan() -> Plan {
        Plan {
            capability: "file_control".to_string(),
            action: "delete".to_string(),
            requester: "u1".to_string(),
            payload: json!({"target": "/docs/old.txt"}),
            candidate_paths: vec!["/docs/old.txt".to_string()],
            operations: vec![PlanOperation::new("delete", "/docs/old.txt")],
            risk_tier: RiskTier::High,
            mutating: true,
            approval_required: true,
            required_flags: vec!["force".to_string()],
            blockers: vec![],
            warnings: vec![],
            rollback: vec![],
            summary: "delete old.txt".to_string(),
            grant_id: None,
        }
    }

    fn policy() -> TokenPolicy {
        TokenPolicy {
            default_ttl_secs: 300,
            min_ttl_secs: 60,
            max_ttl_secs: 3600,
        }
    }

    fn create(requested: Option<u64>) -> ApprovalToken {
        ApprovalToken::create(
            CreateToken {
                requester: "u1".to_string(),
                actor_bot_id: Some("bot-a".to_string()),
                action_type: "file_control:delete".to_string(),
                plan: sample_plan(),
                request_id: RequestId::new(),
                requested_ttl_secs: requested,
            },
            &policy(),
        )
    }

    #[test]
    fn test_ttl_default_and_clamping() {
        assert_eq!(create(None).ttl_seconds, 300);
        assert_eq!(create(Some(5)).ttl_seconds, 60);
        assert_eq!(create(Some(999_999)).ttl_seconds, 3600);
        assert_eq!(create(Some(600)).ttl_seconds, 600);
    }

    #[test]
    fn test_new_token_is_pending() {
        let token = create(None);
        assert_eq!(token.status, TokenStatus::Pending);
        assert!(!token.is_expired());
        assert_eq!(token.plan_hash, token.plan.content_hash());
        assert_eq!(token.risk_level, RiskTier::High);
        assert_eq!(token.required_flags, vec!["force"]);
    }

    #[test]
    fn test_status_terminality() {
        assert!(!TokenStatus::Pending.is_terminal());
        assert!(TokenStatus::Consumed.is_terminal());
        assert!(TokenStatus::Denied.is_terminal());
        assert!(TokenStatus::Expired.is_terminal());
    }

    #[test]
    fn test_stale_status_detection() {
        let mut token = create(None);
        assert!(!token.has_stale_status());
        token.consumed_at = Some(Timestamp::now());
        assert!(token.has_stale_status());
        token.status = TokenStatus::Consumed;
        assert!(!token.has_stale_status());
    }

    #[test]
    fn test_token_roundtrip() {
        let token = create(None);
        let json = serde_json::to_string(&token).unwrap();
        let back: ApprovalToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back.token_id, token.token_id);
        assert_eq!(back.plan_hash, token.plan_hash);
        assert_eq!(back.status, TokenStatus::Pending);
    }
}
