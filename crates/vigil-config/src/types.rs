//! Policy configuration struct definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use vigil_core::{IdentityMode, RiskTier};

/// Allowed path roots, grouped by the risk tier they imply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootsConfig {
    /// Roots where mutations classify as `MEDIUM`.
    #[serde(default)]
    pub medium: Vec<PathBuf>,
    /// Roots where mutations classify as `HIGH`.
    #[serde(default)]
    pub high: Vec<PathBuf>,
    /// The external-drive root; everything under it is `HIGH_PRECHECK`.
    #[serde(default)]
    pub external: Option<PathBuf>,
    /// Git allowlist: a repository root must be inside one of these for any
    /// git-mutating action. Separate from the general allowlist.
    #[serde(default)]
    pub git: Vec<PathBuf>,
    /// Trash destination for `file_control:trash`.
    pub trash: PathBuf,
}

impl RootsConfig {
    /// All roots a path may legitimately live under (medium + high +
    /// external + trash). The git allowlist is deliberately excluded; it
    /// gates repositories, not paths.
    #[must_use]
    pub fn allowed(&self) -> Vec<&PathBuf> {
        let mut roots: Vec<&PathBuf> = self.medium.iter().chain(self.high.iter()).collect();
        if let Some(ext) = &self.external {
            roots.push(ext);
        }
        roots.push(&self.trash);
        roots
    }
}

/// Free-space and hashing thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Thresholds {
    /// External-drive preflight fails below this many free bytes.
    pub min_free_space_bytes: u64,
    /// Files larger than this are not content-hashed during planning.
    pub max_hash_file_bytes: u64,
}

/// One `(domain, action)` risk rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskRule {
    /// Risk tier assigned when this rule matches.
    pub risk: RiskTier,
    /// Whether a matching mutating action requires an approval token.
    pub requires_approval: bool,
    /// Flags the execute request must carry.
    #[serde(default)]
    pub required_flags: Vec<String>,
}

/// TTL policy for approval tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TokenPolicy {
    /// TTL used when the requester does not ask for one.
    pub default_ttl_secs: u64,
    /// Requested TTLs are clamped up to this.
    pub min_ttl_secs: u64,
    /// Requested TTLs are clamped down to this.
    pub max_ttl_secs: u64,
}

/// Policy for longer-lived approval grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantPolicy {
    /// Whether grants may authorize executions at all.
    pub enabled: bool,
    /// TTL used when the grant request does not carry one.
    pub default_ttl_secs: u64,
    /// Requested TTLs are clamped up to this.
    pub min_ttl_secs: u64,
    /// Requested TTLs are clamped down to this.
    pub max_ttl_secs: u64,
    /// Scope a grant covers (currently `mutating` — every mutating plan
    /// from the grant's requester).
    pub scope: String,
}

/// The merged policy document threaded through every resolution.
///
/// Immutable per request cycle; loaded once and passed by reference. There
/// is deliberately no process-wide singleton.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Identity-binding mode for approval token validation.
    #[serde(default)]
    pub identity_mode: IdentityMode,
    /// Allowed path roots by tier.
    pub roots: RootsConfig,
    /// Free-space / hash-size thresholds.
    pub thresholds: Thresholds,
    /// Per-domain, per-action risk rules. The action key `"default"` is the
    /// domain-level fallback.
    #[serde(default)]
    pub rules: BTreeMap<String, BTreeMap<String, RiskRule>>,
    /// Approval token TTL policy.
    pub tokens: TokenPolicy,
    /// Approval grant policy.
    pub grants: GrantPolicy,
}

impl PolicyConfig {
    /// Look up the rule for an exact `(domain, action)` pair.
    #[must_use]
    pub fn rule(&self, domain: &str, action: &str) -> Option<&RiskRule> {
        self.rules.get(domain).and_then(|actions| actions.get(action))
    }

    /// Look up the `(domain, "default")` fallback rule.
    #[must_use]
    pub fn default_rule(&self, domain: &str) -> Option<&RiskRule> {
        self.rule(domain, "default")
    }
}
