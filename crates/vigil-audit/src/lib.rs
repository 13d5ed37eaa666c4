//! Append-only, redacted audit trail for Vigil.
//!
//! Every policy decision and execution outcome is appended as one JSON
//! line to a date-partitioned file. Records are write-only from the
//! engine's point of view; nothing in Vigil reads them back. Secret-shaped
//! payload fields are replaced with a fixed marker before serialization
//! and token ids appear only as short hash digests.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod event;
pub mod log;

pub use error::{AuditError, AuditResult};
pub use event::{redact, token_digest, AuditEvent, AuditEventType, REDACTED};
pub use log::AuditLog;
