//! Vigil Core - shared types for the mediation engine.
//!
//! This crate defines the vocabulary every other Vigil crate speaks:
//!
//! - Newtype identifiers ([`RequestId`], [`TokenId`], [`GrantId`])
//! - [`Timestamp`] wrapper for consistent time handling
//! - [`RiskTier`] classification with rank-based ordering
//! - [`IdentityMode`] binding strengths for approval validation
//! - [`Plan`] — the reviewable, replayable description of one proposed
//!   operation — and its stable content hash ([`PlanHash`])
//!
//! # The anti-drift invariant
//!
//! A [`Plan`] is immutable once built. Executing it requires recomputing an
//! equivalent plan from the same inputs and comparing [`Plan::content_hash`]
//! against the hash recorded at approval time. If the hashes differ, the plan
//! the human reviewed is not the plan about to run, and execution must fail.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod plan;
pub mod types;

pub use plan::{Blocker, Plan, PlanHash, PlanOperation};
pub use types::{GrantId, IdentityMode, RequestContext, RequestId, RiskTier, Timestamp, TokenId};
