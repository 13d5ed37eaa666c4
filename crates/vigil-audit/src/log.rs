//! Date-partitioned append-only log files.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::trace;

use crate::error::{AuditError, AuditResult};
use crate::event::AuditEvent;

/// Appender for line-delimited JSON audit records, one file per calendar
/// date (`audit-YYYY-MM-DD.jsonl`).
#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    /// Open (creating the directory as needed) an audit log under `dir`.
    ///
    /// # Errors
    ///
    /// Returns a write error if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> AuditResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| AuditError::Write {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Append one event to today's partition.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the append fails.
    pub fn append(&self, event: &AuditEvent) -> AuditResult<()> {
        let path = self.current_file();
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::Write {
                path: path.clone(),
                source,
            })?;
        file.write_all(&line).map_err(|source| AuditError::Write {
            path: path.clone(),
            source,
        })?;
        trace!(event = %event.event_type, request = %event.request_id, "audit event appended");
        Ok(())
    }

    /// Path of the partition an append would land in right now.
    #[must_use]
    pub fn current_file(&self) -> PathBuf {
        let date = Utc::now().format("%Y-%m-%d");
        self.dir.join(format!("audit-{date}.jsonl"))
    }
}
