//! The Vigil worker — a stateless batch step over the command queue.
//!
//! Each invocation claims queued requests one at a time and drives them
//! through plan building, the audit decision, grant or token issuance,
//! execute-time revalidation (identity, flags, plan-hash equality), the
//! capability's side effect, and outbound notification. There is no event
//! loop here; an external scheduler re-invokes [`Orchestrator::run_once`].

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod notify;
pub mod orchestrator;

pub use error::{WorkerError, WorkerResult};
pub use notify::{render_failure, render_preview, render_result, LogNotifier, Notifier};
pub use orchestrator::Orchestrator;
