//! Plans — reviewable, replayable descriptions of proposed operations.
//!
//! A [`Plan`] is what a human reviews before a mutating action runs. It is
//! immutable once built; the execute phase recomputes an equivalent plan from
//! the same inputs and compares content hashes to detect drift between
//! review time and execution time.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

use crate::types::{GrantId, RiskTier};

/// A human-readable blocker preventing a plan from executing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blocker {
    /// Stable machine-readable code (e.g. `PATH_OUTSIDE_ALLOWED_ROOT`).
    pub code: String,
    /// Human-readable detail.
    pub detail: String,
}

impl Blocker {
    /// Create a new blocker.
    #[must_use]
    pub fn new(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.detail)
    }
}

/// One concrete step a plan's execute phase will perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOperation {
    /// Operation kind (e.g. `move`, `trash`, `send`, `push`).
    pub kind: String,
    /// Primary target (path, recipient, command line, ...).
    pub target: String,
    /// Secondary target where the operation has one (e.g. a move destination).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    /// Observed state of the target at plan time (e.g. a size/mtime
    /// fingerprint, or `absent`). Part of the hashed projection, so a
    /// target that changes between plan and execute changes the recomputed
    /// hash and trips drift detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precondition: Option<String>,
}

impl PlanOperation {
    /// Create an operation with a single target.
    #[must_use]
    pub fn new(kind: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            target: target.into(),
            dest: None,
            precondition: None,
        }
    }

    /// Create an operation with a source and destination.
    #[must_use]
    pub fn with_dest(
        kind: impl Into<String>,
        target: impl Into<String>,
        dest: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            target: target.into(),
            dest: Some(dest.into()),
            precondition: None,
        }
    }

    /// Attach the target's observed state at plan time.
    #[must_use]
    pub fn with_precondition(mut self, precondition: impl Into<String>) -> Self {
        self.precondition = Some(precondition.into());
        self
    }
}

/// Stable content hash of a plan's security-relevant projection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanHash(pub String);

impl PlanHash {
    /// Short prefix for display in notifications and logs.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for PlanHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The reviewable description of one proposed operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Capability this plan belongs to (e.g. `file_control`).
    pub capability: String,
    /// Action within the capability (e.g. `move`, `git_push`).
    pub action: String,
    /// Who asked for this operation.
    pub requester: String,
    /// Normalized input payload the plan was built from.
    pub payload: serde_json::Value,
    /// Every filesystem path the operation may touch.
    pub candidate_paths: Vec<String>,
    /// Concrete steps execution will perform, in order.
    pub operations: Vec<PlanOperation>,
    /// Computed risk tier.
    pub risk_tier: RiskTier,
    /// Whether execution mutates anything.
    pub mutating: bool,
    /// Whether the resolved policy rule demands an approval token, even
    /// when the tier alone would not.
    #[serde(default)]
    pub approval_required: bool,
    /// Approval flags that must accompany the execute request.
    pub required_flags: Vec<String>,
    /// Conditions that currently prevent execution.
    pub blockers: Vec<Blocker>,
    /// Non-blocking concerns worth surfacing to the reviewer.
    pub warnings: Vec<String>,
    /// How to undo the operation, step by step (may be empty).
    pub rollback: Vec<String>,
    /// One-line human-readable summary.
    pub summary: String,
    /// Grant that authorized a token-less execution, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_id: Option<GrantId>,
}

impl Plan {
    /// Check whether this plan can execute at all.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        !self.blockers.is_empty()
    }

    /// Check whether this plan needs an approval token before executing.
    ///
    /// Either side can demand it: the risk tier, or a policy rule that
    /// flagged the action regardless of tier.
    #[must_use]
    pub fn requires_approval(&self) -> bool {
        self.mutating && (self.approval_required || self.risk_tier.requires_approval())
    }

    /// Compute the stable content hash of this plan.
    ///
    /// Hashes only the enumerated security-relevant projection — action,
    /// capability, requester, payload, candidate paths, risk tier, required
    /// flags, operations, rollback — not the whole object, so incidental
    /// fields (summary wording, warnings, grant attribution) never cause a
    /// false mismatch. The projection is serialized as canonical JSON:
    /// `serde_json`'s default map is ordered by key, so equivalent plans
    /// hash equal regardless of field insertion order; arrays hash by
    /// content order.
    #[must_use]
    pub fn content_hash(&self) -> PlanHash {
        let projection = json!({
            "action": self.action,
            "capability": self.capability,
            "requester": self.requester,
            "payload": self.payload,
            "candidate_paths": self.candidate_paths,
            "risk_tier": self.risk_tier,
            "required_flags": self.required_flags,
            "operations": self.operations,
            "rollback": self.rollback,
        });
        // Default serde_json maps are BTreeMap-backed, giving sorted keys.
        let canonical = serde_json::to_vec(&projection).unwrap_or_default();
        PlanHash(blake3::hash(&canonical).to_hex().to_string())
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}:{} — {}",
            self.risk_tier, self.capability, self.action, self.summary
        )
    }
}
