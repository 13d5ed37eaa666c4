//! Vigil Policy - pure risk classification and path safety.
//!
//! This crate turns a [`vigil_config::PolicyConfig`] plus a proposed action
//! into a risk decision. Everything here is a pure function of its inputs:
//! no state, no caching, no singletons.
//!
//! # Check order
//!
//! 1. Path safety ([`check_path_safety`]) — `.git` metadata, allowed roots,
//!    symlink escapes. Failures become plan blockers.
//! 2. For git-mutating actions, repository derivation and allowlisting
//!    ([`git::repo_root`], [`git::check_repo_allowed`]).
//! 3. Risk classification ([`classify_risk_tier`]) — max rank across
//!    candidate paths, external-root escalation, `GIT_AWARE` forcing.
//! 4. Rule resolution ([`resolve_action`]) — exact rule > domain default >
//!    caller fallback.
//! 5. For `HIGH_PRECHECK` plans, the external-drive preflight
//!    ([`check_external_drive`]).

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod drive;
/// Error types for policy checks.
pub mod error;
pub mod git;
pub mod paths;
pub mod resolver;

pub use drive::check_external_drive;
pub use error::{PolicyError, PolicyResult};
pub use paths::{check_path_safety, classify_risk_tier, touches_git_meta};
pub use resolver::{default_flags, resolve_action, Resolution};
