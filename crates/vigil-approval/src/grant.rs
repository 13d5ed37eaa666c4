//! Standing approval grants.
//!
//! A grant is a short window, opened by one explicit approval, during which
//! further mutating plans from the same requester skip the token round-trip.
//! Grants are disabled by default and every check fails closed: any missing,
//! expired, or mismatched condition means "no grant", reported with a reason
//! code rather than an error.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use vigil_config::GrantPolicy;
use vigil_core::{GrantId, Timestamp, TokenId};

use crate::error::{ApprovalError, ApprovalResult};

/// What a grant covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GrantScope {
    /// All mutating actions from the granting requester.
    #[default]
    Mutating,
    /// All actions, mutating or not, from the granting requester.
    All,
}

/// A standing approval window for one requester.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalGrant {
    /// Unique grant identifier.
    pub grant_id: GrantId,
    /// Requester the grant is bound to.
    pub requester: String,
    /// What the grant covers.
    pub scope: GrantScope,
    /// When the window opened.
    pub created_at: Timestamp,
    /// When the window closes.
    pub expires_at: Timestamp,
    /// The consumed token whose approval opened this window.
    pub source_token: TokenId,
}

impl ApprovalGrant {
    /// Check whether the grant window has closed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_past()
    }
}

/// Outcome of a grant lookup. Always a definite answer; the miss side
/// carries a reason code for the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantDecision {
    /// An active grant covers the request.
    Covered(GrantId),
    /// No grant applies.
    NotCovered {
        /// Why not, e.g. `GRANTS_DISABLED` or `GRANT_EXPIRED`.
        reason: &'static str,
    },
}

impl GrantDecision {
    fn miss(reason: &'static str) -> Self {
        Self::NotCovered { reason }
    }
}

/// File-backed store of at most one active grant per requester.
pub struct GrantStore {
    dir: PathBuf,
    policy: GrantPolicy,
}

impl GrantStore {
    /// Open (creating the directory as needed) a grant store under `root`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>, policy: GrantPolicy) -> ApprovalResult<Self> {
        let dir = root.as_ref().join("grants");
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, policy })
    }

    /// Open a window for `requester`, replacing any prior grant they hold.
    ///
    /// The requested duration is clamped into the policy's `[min, max]`
    /// window, or takes the policy default when absent.
    ///
    /// # Errors
    ///
    /// Returns a storage error if grants are disabled or the grant file
    /// cannot be written.
    pub fn grant(
        &self,
        requester: &str,
        scope: GrantScope,
        source_token: TokenId,
        requested_secs: Option<u64>,
    ) -> ApprovalResult<ApprovalGrant> {
        if !self.policy.enabled {
            return Err(ApprovalError::Storage(
                "approval grants are disabled by policy".to_string(),
            ));
        }

        let secs = requested_secs
            .unwrap_or(self.policy.default_ttl_secs)
            .clamp(self.policy.min_ttl_secs, self.policy.max_ttl_secs);
        let created_at = Timestamp::now();
        // Safety: chrono Duration addition cannot overflow for clamped durations
        #[allow(clippy::arithmetic_side_effects)]
        let expires_at = Timestamp::from_datetime(
            created_at.0 + chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)),
        );

        let path = self.path_for(requester);
        if path.exists() {
            info!(requester = %requester, "replacing existing grant");
        }

        let grant = ApprovalGrant {
            grant_id: GrantId::new(),
            requester: requester.to_string(),
            scope,
            created_at,
            expires_at,
            source_token,
        };
        self.write(&path, &grant)?;
        info!(grant = %grant.grant_id, requester = %requester, secs, "approval grant opened");
        Ok(grant)
    }

    /// Look up an active grant covering a request from `requester`.
    ///
    /// `mutating` describes the request being checked; a `mutating`-scoped
    /// grant does not cover non-mutating requests (those never need
    /// approval anyway, but the caller may still ask). Expired grant files
    /// are removed on sight.
    ///
    /// # Errors
    ///
    /// Returns a storage error on unreadable grant files.
    pub fn check(&self, requester: Option<&str>, mutating: bool) -> ApprovalResult<GrantDecision> {
        if !self.policy.enabled {
            return Ok(GrantDecision::miss("GRANTS_DISABLED"));
        }
        let Some(requester) = requester else {
            return Ok(GrantDecision::miss("REQUESTER_REQUIRED"));
        };
        if requester.is_empty() {
            return Ok(GrantDecision::miss("REQUESTER_REQUIRED"));
        }

        let path = self.path_for(requester);
        if !path.exists() {
            return Ok(GrantDecision::miss("GRANT_NOT_FOUND"));
        }
        let grant: ApprovalGrant = serde_json::from_slice(&fs::read(&path)?)?;

        if grant.is_expired() {
            debug!(grant = %grant.grant_id, requester = %requester, "removing expired grant");
            fs::remove_file(&path)?;
            return Ok(GrantDecision::miss("GRANT_EXPIRED"));
        }

        if grant.scope == GrantScope::Mutating && !mutating {
            return Ok(GrantDecision::miss("GRANT_SCOPE_MISMATCH"));
        }

        Ok(GrantDecision::Covered(grant.grant_id))
    }

    /// Close `requester`'s window, if any. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the grant file cannot be removed.
    pub fn revoke(&self, requester: &str) -> ApprovalResult<bool> {
        let path = self.path_for(requester);
        if path.exists() {
            fs::remove_file(&path)?;
            info!(requester = %requester, "approval grant revoked");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Grant file names are a short content hash of the requester, keeping
    /// arbitrary requester strings filesystem-safe.
    fn path_for(&self, requester: &str) -> PathBuf {
        let digest = blake3::hash(requester.as_bytes()).to_hex();
        self.dir.join(format!("{}.json", &digest.as_str()[..16]))
    }

    fn write(&self, path: &Path, grant: &ApprovalGrant) -> ApprovalResult<()> {
        let tmp = self.dir.join(format!(".{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, serde_json::to_vec_pretty(grant)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl std::fmt::Debug for GrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantStore")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}
