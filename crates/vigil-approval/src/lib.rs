//! Approval tokens and standing grants for Vigil.
//!
//! Mutating plans above the medium risk tier stop here: a plan is shown to
//! a human, a time-boxed [`ApprovalToken`] is minted against its content
//! hash, and execution is permitted only by consuming that token — once.
//! The [`GrantStore`] adds an opt-in shortcut: one approval can open a
//! short standing window during which the same requester skips further
//! token round-trips.
//!
//! Both stores are plain files under the state directory, safe under
//! concurrent workers thanks to write-temp-then-rename persistence.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::arithmetic_side_effects))]

pub mod error;
pub mod grant;
pub mod store;
pub mod token;

pub use error::{ApprovalError, ApprovalResult};
pub use grant::{ApprovalGrant, GrantDecision, GrantScope, GrantStore};
pub use store::{TokenStore, ValidationAttempt};
pub use token::{ApprovalToken, CreateToken, TokenStatus};
