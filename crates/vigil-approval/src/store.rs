//! File-backed approval token store.
//!
//! One JSON file per token. Pending tokens live under `pending/`, terminal
//! ones (consumed, denied, expired) under `terminal/`, distinguished by the
//! `status` field. All writes are write-temp-then-rename; the pending →
//! terminal transition is a single atomic rename, which is what makes the
//! lazy expiry sweep idempotent under concurrent invocation.
//!
//! Token file names derive from randomly generated token ids, so two
//! workers never contend for the same pending file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use vigil_config::TokenPolicy;
use vigil_core::{IdentityMode, Timestamp, TokenId};

use crate::error::{ApprovalError, ApprovalResult};
use crate::token::{ApprovalToken, CreateToken, TokenStatus};

/// An execute request's claim against a pending token.
#[derive(Debug, Clone)]
pub struct ValidationAttempt {
    /// Requester on the execute request.
    pub requester: String,
    /// Acting bot on the execute request, if any.
    pub actor_bot_id: Option<String>,
    /// Approval flags the execute request carries.
    pub provided_flags: Vec<String>,
    /// Identity-binding mode in force.
    pub identity_mode: IdentityMode,
}

/// File-backed store for approval tokens.
pub struct TokenStore {
    pending_dir: PathBuf,
    terminal_dir: PathBuf,
    policy: TokenPolicy,
}

impl TokenStore {
    /// Open (creating directories as needed) a token store under `root`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the directories cannot be created.
    pub fn open(root: impl AsRef<Path>, policy: TokenPolicy) -> ApprovalResult<Self> {
        let root = root.as_ref();
        let pending_dir = root.join("pending");
        let terminal_dir = root.join("terminal");
        fs::create_dir_all(&pending_dir)?;
        fs::create_dir_all(&terminal_dir)?;
        Ok(Self {
            pending_dir,
            terminal_dir,
            policy,
        })
    }

    /// Mint and persist a new pending token.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the token file cannot be written.
    pub fn create(&self, params: CreateToken) -> ApprovalResult<ApprovalToken> {
        self.sweep_expired()?;
        let token = ApprovalToken::create(params, &self.policy);
        self.write(&self.pending_path(&token.token_id), &token)?;
        info!(token = %token.token_id, action = %token.action_type, ttl = token.ttl_seconds,
              "approval token minted");
        Ok(token)
    }

    /// Fetch a token from either store, pending first.
    ///
    /// # Errors
    ///
    /// Returns a storage error on unreadable or unparseable token files.
    pub fn get(&self, token_id: &TokenId) -> ApprovalResult<Option<ApprovalToken>> {
        for path in [self.pending_path(token_id), self.terminal_path(token_id)] {
            if path.exists() {
                return Ok(Some(self.read(&path)?));
            }
        }
        Ok(None)
    }

    /// Validate a token against an execute attempt without consuming it.
    ///
    /// Runs the lazy expiry sweep first, then checks, in order: existence,
    /// terminal status, expiry (expiring the record as a side effect),
    /// identity binding per the attempt's [`IdentityMode`], and flag
    /// coverage.
    ///
    /// # Errors
    ///
    /// Returns the corresponding [`ApprovalError`] for the first failed
    /// check.
    pub fn validate(
        &self,
        token_id: &TokenId,
        attempt: &ValidationAttempt,
    ) -> ApprovalResult<ApprovalToken> {
        self.sweep_expired()?;

        let token = self
            .get(token_id)?
            .ok_or_else(|| ApprovalError::TokenNotFound {
                token_id: token_id.clone(),
            })?;

        match token.status {
            TokenStatus::Consumed => {
                return Err(ApprovalError::TokenConsumed {
                    token_id: token_id.clone(),
                })
            },
            TokenStatus::Denied => {
                return Err(ApprovalError::TokenDenied {
                    token_id: token_id.clone(),
                })
            },
            TokenStatus::Expired => {
                return Err(ApprovalError::TokenExpired {
                    token_id: token_id.clone(),
                })
            },
            TokenStatus::Pending => {},
        }

        // The sweep above catches most expiries; this catches a token that
        // expired between the sweep and the read.
        if token.is_expired() {
            self.transition(&token, TokenStatus::Expired, |_| {})?;
            return Err(ApprovalError::TokenExpired {
                token_id: token_id.clone(),
            });
        }

        self.check_identity(&token, attempt)?;
        self.check_flags(&token, attempt)?;

        Ok(token)
    }

    /// Consume a pending token. The only mutation permitted to proceed to
    /// execution; legal exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::TokenConsumed`] (or the other terminal
    /// errors) if the token is no longer pending.
    pub fn consume(&self, token_id: &TokenId, consumed_by: &str) -> ApprovalResult<ApprovalToken> {
        let token = self.require_pending(token_id)?;
        let consumed_by = consumed_by.to_string();
        let updated = self.transition(&token, TokenStatus::Consumed, |t| {
            t.consumed_at = Some(Timestamp::now());
            t.consumed_by = Some(consumed_by.clone());
            t.approved_by = Some(consumed_by.clone());
        })?;
        info!(token = %token_id, by = %updated.consumed_by.as_deref().unwrap_or("?"),
              "approval token consumed");
        Ok(updated)
    }

    /// Deny a pending token.
    ///
    /// # Errors
    ///
    /// Returns the terminal-status error if the token is not pending.
    pub fn deny(&self, token_id: &TokenId, reason: &str) -> ApprovalResult<ApprovalToken> {
        let token = self.require_pending(token_id)?;
        let reason = reason.to_string();
        let updated = self.transition(&token, TokenStatus::Denied, |t| {
            t.denied_reason = Some(reason.clone());
        })?;
        info!(token = %token_id, "approval token denied");
        Ok(updated)
    }

    /// Move every past-due pending token to the terminal store with
    /// `status: expired`, and normalize records carrying terminal stamps
    /// under a stale `pending` status.
    ///
    /// Runs opportunistically on every store access; there is no background
    /// timer. Idempotent: a concurrent sweep losing the terminal-rename race
    /// simply skips the record.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the pending directory cannot be listed.
    pub fn sweep_expired(&self) -> ApprovalResult<usize> {
        let mut swept = 0usize;
        for entry in fs::read_dir(&self.pending_dir)? {
            let path = entry?.path();
            let token: ApprovalToken = match self.read(&path) {
                Ok(t) => t,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "unreadable pending token");
                    continue;
                },
            };

            if token.has_stale_status() {
                let corrected = if token.denied_reason.is_some() {
                    TokenStatus::Denied
                } else {
                    TokenStatus::Consumed
                };
                if self.transition(&token, corrected, |_| {}).is_ok() {
                    swept = swept.saturating_add(1);
                }
                continue;
            }

            if token.is_expired() && self.transition(&token, TokenStatus::Expired, |_| {}).is_ok() {
                debug!(token = %token.token_id, "expired pending token");
                swept = swept.saturating_add(1);
            }
        }
        Ok(swept)
    }

    /// List all pending tokens (after sweeping), oldest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the directory cannot be listed.
    pub fn list_pending(&self) -> ApprovalResult<Vec<ApprovalToken>> {
        self.sweep_expired()?;
        let mut tokens = Vec::new();
        for entry in fs::read_dir(&self.pending_dir)? {
            let path = entry?.path();
            match self.read(&path) {
                Ok(token) => tokens.push(token),
                Err(e) => warn!(path = %path.display(), error = %e, "unreadable pending token"),
            }
        }
        tokens.sort_by_key(|t| t.created_at);
        Ok(tokens)
    }

    // -- internals --

    fn require_pending(&self, token_id: &TokenId) -> ApprovalResult<ApprovalToken> {
        self.sweep_expired()?;
        let token = self
            .get(token_id)?
            .ok_or_else(|| ApprovalError::TokenNotFound {
                token_id: token_id.clone(),
            })?;
        match token.status {
            TokenStatus::Pending if token.is_expired() => {
                self.transition(&token, TokenStatus::Expired, |_| {})?;
                Err(ApprovalError::TokenExpired {
                    token_id: token_id.clone(),
                })
            },
            TokenStatus::Pending => Ok(token),
            TokenStatus::Consumed => Err(ApprovalError::TokenConsumed {
                token_id: token_id.clone(),
            }),
            TokenStatus::Denied => Err(ApprovalError::TokenDenied {
                token_id: token_id.clone(),
            }),
            TokenStatus::Expired => Err(ApprovalError::TokenExpired {
                token_id: token_id.clone(),
            }),
        }
    }

    /// Apply a terminal transition: stamp, write to the terminal store, then
    /// remove the pending file. Writing terminal-first means a crash between
    /// the two steps leaves a record the sweep can normalize, never a lost
    /// token.
    fn transition(
        &self,
        token: &ApprovalToken,
        status: TokenStatus,
        stamp: impl FnOnce(&mut ApprovalToken),
    ) -> ApprovalResult<ApprovalToken> {
        let mut updated = token.clone();
        stamp(&mut updated);
        updated.status = status;
        self.write(&self.terminal_path(&token.token_id), &updated)?;
        let pending = self.pending_path(&token.token_id);
        if pending.exists() {
            fs::remove_file(&pending)?;
        }
        Ok(updated)
    }

    fn check_identity(
        &self,
        token: &ApprovalToken,
        attempt: &ValidationAttempt,
    ) -> ApprovalResult<()> {
        if attempt.identity_mode == IdentityMode::AnyUserAnyBot {
            return Ok(());
        }

        if attempt.requester != token.requester {
            return Err(ApprovalError::RequesterMismatch {
                expected: token.requester.clone(),
                attempted: attempt.requester.clone(),
            });
        }

        if attempt.identity_mode == IdentityMode::StrictUserBot {
            if let Some(expected) = &token.actor_bot_id {
                let attempted = attempt.actor_bot_id.as_deref().unwrap_or("");
                if attempted != expected {
                    return Err(ApprovalError::BotMismatch {
                        expected: expected.clone(),
                        attempted: attempted.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    fn check_flags(&self, token: &ApprovalToken, attempt: &ValidationAttempt) -> ApprovalResult<()> {
        let missing: Vec<String> = token
            .required_flags
            .iter()
            .filter(|flag| !attempt.provided_flags.contains(flag))
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ApprovalError::ApprovalFlagsRequired { missing })
        }
    }

    fn pending_path(&self, token_id: &TokenId) -> PathBuf {
        self.pending_dir.join(format!("{}.json", token_id.0))
    }

    fn terminal_path(&self, token_id: &TokenId) -> PathBuf {
        self.terminal_dir.join(format!("{}.json", token_id.0))
    }

    fn read(&self, path: &Path) -> ApprovalResult<ApprovalToken> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Write-temp-then-rename within the target directory.
    fn write(&self, path: &Path, token: &ApprovalToken) -> ApprovalResult<()> {
        let dir = path.parent().ok_or_else(|| {
            ApprovalError::Storage(format!("token path has no parent: {}", path.display()))
        })?;
        let tmp = dir.join(format!(".{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, serde_json::to_vec_pretty(token)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("pending_dir", &self.pending_dir)
            .finish_non_exhaustive()
    }
}
