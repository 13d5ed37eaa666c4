//! Common types used throughout Vigil.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a queued request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Create a new random request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a request ID from a UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req:{}", self.0)
    }
}

/// Unique identifier for an approval token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId(pub Uuid);

impl TokenId {
    /// Create a new random token ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a token ID from a UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for TokenId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token:{}", self.0)
    }
}

/// Unique identifier for an approval grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantId(pub Uuid);

impl GrantId {
    /// Create a new random grant ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GrantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "grant:{}", self.0)
    }
}

/// Timestamp wrapper for consistent handling throughout Vigil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Get the current timestamp.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from a `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Check if this timestamp is in the past.
    #[must_use]
    pub fn is_past(&self) -> bool {
        self.0 < Utc::now()
    }

    /// Check if this timestamp is in the future.
    #[must_use]
    pub fn is_future(&self) -> bool {
        self.0 > Utc::now()
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

/// Risk tier classification for planned operations.
///
/// The three path-derived tiers are rank-ordered
/// (`Medium < High < HighPrecheck`); a plan spanning several candidate
/// paths takes the highest rank among them. [`RiskTier::GitAware`] is never
/// produced by path ranking — it is forced onto any git-mutating action
/// regardless of where the repository lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTier {
    /// Mutating but confined to ordinary allowed roots.
    Medium,
    /// Touches sensitive roots; requires explicit approval.
    High,
    /// Touches the external drive; requires approval plus a preflight check.
    HighPrecheck,
    /// Git-mutating action; repo-allowlist rules apply.
    GitAware,
}

impl RiskTier {
    /// Rank used for max-combining candidate path tiers.
    ///
    /// Only the three path-derived tiers participate in ranking; `GitAware`
    /// ranks above all of them so a forced git tier is never downgraded.
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            Self::Medium => 1,
            Self::High => 2,
            Self::HighPrecheck => 3,
            Self::GitAware => 4,
        }
    }

    /// Check if this tier requires human approval for mutating actions.
    #[must_use]
    pub fn requires_approval(&self) -> bool {
        matches!(self, Self::High | Self::HighPrecheck | Self::GitAware)
    }

    /// Take the higher-ranked of two tiers.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        if other.rank() > self.rank() { other } else { self }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::HighPrecheck => write!(f, "HIGH_PRECHECK"),
            Self::GitAware => write!(f, "GIT_AWARE"),
        }
    }
}

/// How strongly an approval token is bound to the identity that obtained it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdentityMode {
    /// Requester and acting bot must both match the token's origin.
    #[default]
    StrictUserBot,
    /// Requester must match; the acting bot may differ (multi-bot hand-off).
    SameUserAnyBot,
    /// Neither binding enforced. Weakest mode; policy-gated.
    AnyUserAnyBot,
}

impl fmt::Display for IdentityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StrictUserBot => write!(f, "strict_user_bot"),
            Self::SameUserAnyBot => write!(f, "same_user_any_bot"),
            Self::AnyUserAnyBot => write!(f, "any_user_any_bot"),
        }
    }
}

/// Identity context carried on queued requests.
///
/// Mirrors the chat-provider context a request originated from. All fields
/// are optional — requests enqueued locally carry none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Originating provider (e.g. `telegram`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Provider-scoped user identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Provider-scoped group/chat identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}
