//! Capabilities — the plan/execute surface of Vigil.
//!
//! Every capability implements the same two-function contract: `plan`
//! turns a request into a reviewable [`vigil_core::Plan`] without side
//! effects, and `execute` performs exactly what an authorized plan's
//! operations describe. Concrete side effects stay behind executor and
//! connector traits supplied by the embedding application; this crate
//! decides *whether* and *what*, never *how*.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod connector;
pub mod error;
pub mod exec;
pub mod executor;
pub mod file_control;
pub mod mail;
pub mod registry;

pub use connector::ConnectorCapability;
pub use error::{CapabilityError, CapabilityResult};
pub use exec::Exec;
pub use executor::{
    CommandOutput, CommandRunner, Connector, ExecutorError, ExecutorResult, FileExecutor,
    MailConnector,
};
pub use file_control::FileControl;
pub use mail::Mail;
pub use registry::{Capability, CapabilityRegistry, ExecutionOutcome, PlanRequest};
