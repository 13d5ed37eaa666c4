//! Durable file-backed command queue for Vigil.
//!
//! Requests travel through three directories (`outbox/`, `processing/`,
//! `completed/`) with a single atomic rename as the claim primitive, and
//! every completion appends one row to `results.jsonl`. Multiple worker
//! processes may poll the same queue; a lost rename race is a skip, not
//! an error.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod envelope;
pub mod error;
pub mod queue;

pub use envelope::{CommandEnvelope, CommandKind, ExecuteDecision, Phase, SCHEMA_VERSION};
pub use error::{QueueError, QueueResult};
pub use queue::{ClaimedRequest, CommandQueue, RequestResult};
