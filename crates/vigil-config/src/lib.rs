#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Policy configuration for Vigil.
//!
//! This crate owns the [`PolicyConfig`] document: allowed path roots by risk
//! tier, the per-(domain, action) risk-rule table, approval-token and
//! approval-grant TTL policy, and the identity-binding mode.
//!
//! # Usage
//!
//! ```rust
//! use vigil_config::PolicyConfig;
//!
//! // Embedded defaults only.
//! let policy = PolicyConfig::defaults().unwrap();
//! assert!(policy.tokens.min_ttl_secs <= policy.tokens.max_ttl_secs);
//! ```
//!
//! # Precedence
//!
//! An override file deep-merges over the embedded `defaults.toml`: tables
//! merge per-field, scalars and arrays replace. The merged value is
//! validated before use and then threaded through every call — there is no
//! process-wide policy singleton.

/// Configuration error types.
pub mod error;
/// Policy file discovery and loading.
pub mod loader;
/// Policy struct definitions.
pub mod types;
/// Policy validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::{GrantPolicy, PolicyConfig, RiskRule, RootsConfig, Thresholds, TokenPolicy};

use std::path::Path;

impl PolicyConfig {
    /// Load the policy: embedded defaults with an optional override file
    /// merged on top.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the override is unreadable or malformed,
    /// or the merged document fails validation.
    pub fn load(override_path: Option<&Path>) -> ConfigResult<Self> {
        loader::load(override_path)
    }

    /// Build the policy from the embedded defaults only.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] only if the embedded defaults are broken,
    /// which is a packaging bug.
    pub fn defaults() -> ConfigResult<Self> {
        loader::defaults()
    }
}
