//! File-backed command queue with rename-based claims.
//!
//! Three directories model the lifecycle: `outbox/` (inbound drops),
//! `processing/` (claimed), `completed/` (terminal), plus an append-only
//! `results.jsonl`. Claiming is one atomic rename from outbox to
//! processing; a failed rename means another worker got there first and
//! the candidate is skipped. That gives exactly-once claim semantics
//! across any number of worker processes without locks.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use vigil_core::{RequestId, Timestamp};

use crate::envelope::{CommandEnvelope, SCHEMA_VERSION};
use crate::error::{QueueError, QueueResult};

/// Suffix tagging a successfully completed record.
const SUFFIX_OK: &str = "ok";
/// Suffix tagging a failed record.
const SUFFIX_ERR: &str = "err";
/// Suffix tagging a quarantined unparseable record.
const SUFFIX_INVALID: &str = "invalid";

/// Outcome of one completed claim, appended as a row to `results.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestResult {
    /// When the request finished.
    pub finished_at: Timestamp,
    /// Request the row belongs to.
    pub request_id: RequestId,
    /// Whether the request succeeded.
    pub ok: bool,
    /// Machine-readable error code on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Human-readable error detail on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// One-line summary of the plan involved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_summary: Option<String>,
    /// Steps that actually ran, for partial-failure reporting.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub executed_steps: Vec<String>,
}

impl RequestResult {
    /// A success row.
    #[must_use]
    pub fn ok(request_id: RequestId, plan_summary: &str, executed_steps: Vec<String>) -> Self {
        Self {
            finished_at: Timestamp::now(),
            request_id,
            ok: true,
            error_code: None,
            error: None,
            plan_summary: Some(plan_summary.to_string()),
            executed_steps,
        }
    }

    /// A failure row.
    #[must_use]
    pub fn err(request_id: RequestId, code: &str, detail: &str) -> Self {
        Self {
            finished_at: Timestamp::now(),
            request_id,
            ok: false,
            error_code: Some(code.to_string()),
            error: Some(detail.to_string()),
            plan_summary: None,
            executed_steps: Vec::new(),
        }
    }

    /// Attach the plan summary to a failure row.
    #[must_use]
    pub fn with_summary(mut self, summary: &str) -> Self {
        self.plan_summary = Some(summary.to_string());
        self
    }

    /// Attach the steps that ran before the failure.
    #[must_use]
    pub fn with_steps(mut self, steps: Vec<String>) -> Self {
        self.executed_steps = steps;
        self
    }
}

/// A successfully claimed envelope, holding its processing-file handle
/// until [`CommandQueue::complete`] is called.
#[derive(Debug)]
pub struct ClaimedRequest {
    /// The parsed envelope.
    pub envelope: CommandEnvelope,
    processing_path: PathBuf,
}

/// The durable plan/execute mailbox.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    outbox: PathBuf,
    processing: PathBuf,
    completed: PathBuf,
    results: PathBuf,
}

impl CommandQueue {
    /// Open (creating directories as needed) a queue under `root`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directories cannot be created.
    pub fn open(root: impl AsRef<Path>) -> QueueResult<Self> {
        let root = root.as_ref();
        let queue = Self {
            outbox: root.join("outbox"),
            processing: root.join("processing"),
            completed: root.join("completed"),
            results: root.join("results.jsonl"),
        };
        for dir in [&queue.outbox, &queue.processing, &queue.completed] {
            fs::create_dir_all(dir).map_err(|source| QueueError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(queue)
    }

    /// Drop an envelope into the outbox under a unique name.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn enqueue(&self, envelope: &CommandEnvelope) -> QueueResult<RequestId> {
        let path = self.outbox.join(format!("{}.json", envelope.request_id.0));
        self.write_atomic(&path, &serde_json::to_vec_pretty(envelope)?)?;
        debug!(request = %envelope.request_id, phase = %envelope.phase,
               action = %envelope.action_type(), "request enqueued");
        Ok(envelope.request_id.clone())
    }

    /// Claim the next available envelope, or `None` when the outbox is
    /// drained.
    ///
    /// Candidates another worker renames away first are skipped silently.
    /// A claimed record that fails to parse, or carries an unknown schema
    /// version, is quarantined into `completed/` with an `invalid` tag and
    /// never retried.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the outbox cannot be listed.
    pub fn claim_next(&self) -> QueueResult<Option<ClaimedRequest>> {
        for candidate in self.outbox_candidates()? {
            let Some(name) = candidate.file_name().map(|n| n.to_owned()) else {
                continue;
            };
            let processing_path = self.processing.join(&name);

            // The claim itself. Losing the rename race means another
            // worker owns this record now.
            if fs::rename(&candidate, &processing_path).is_err() {
                debug!(file = %name.to_string_lossy(), "claim lost to another worker");
                continue;
            }

            match self.parse_claimed(&processing_path) {
                Ok(envelope) => {
                    debug!(request = %envelope.request_id, "request claimed");
                    return Ok(Some(ClaimedRequest {
                        envelope,
                        processing_path,
                    }));
                },
                Err(detail) => {
                    warn!(file = %name.to_string_lossy(), error = %detail,
                          "quarantining invalid record");
                    self.quarantine(&processing_path, &detail)?;
                },
            }
        }
        Ok(None)
    }

    /// Finish a claim: append the result row, then move the processing
    /// file into `completed/` tagged by outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the result cannot be appended or the file
    /// cannot be moved.
    pub fn complete(&self, claim: ClaimedRequest, result: &RequestResult) -> QueueResult<()> {
        self.append_result(result)?;
        let suffix = if result.ok { SUFFIX_OK } else { SUFFIX_ERR };
        self.finish_file(&claim.processing_path, suffix)?;
        info!(request = %result.request_id, ok = result.ok,
              code = result.error_code.as_deref().unwrap_or("-"), "request completed");
        Ok(())
    }

    /// Number of envelopes waiting in the outbox.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the outbox cannot be listed.
    pub fn pending_count(&self) -> QueueResult<usize> {
        Ok(self.outbox_candidates()?.len())
    }

    /// Path of the append-only result log.
    #[must_use]
    pub fn results_path(&self) -> &Path {
        &self.results
    }

    // -- internals --

    /// Outbox entries oldest-modified first, so claims roughly follow
    /// enqueue order.
    fn outbox_candidates(&self) -> QueueResult<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.outbox).map_err(|source| QueueError::Io {
            path: self.outbox.clone(),
            source,
        })?;
        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| QueueError::Io {
                path: self.outbox.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let modified = entry.metadata().and_then(|m| m.modified()).ok();
                candidates.push((modified, path));
            }
        }
        candidates.sort_by_key(|(modified, _)| *modified);
        Ok(candidates.into_iter().map(|(_, path)| path).collect())
    }

    fn parse_claimed(&self, path: &Path) -> Result<CommandEnvelope, String> {
        let bytes = fs::read(path).map_err(|e| e.to_string())?;
        let envelope: CommandEnvelope =
            serde_json::from_slice(&bytes).map_err(|e| e.to_string())?;
        if envelope.schema_version != SCHEMA_VERSION {
            return Err(format!(
                "unsupported schema version {}",
                envelope.schema_version
            ));
        }
        Ok(envelope)
    }

    fn quarantine(&self, processing_path: &Path, detail: &str) -> QueueResult<()> {
        // Best effort to recover a request id for the result row.
        let request_id = fs::read(processing_path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).ok())
            .and_then(|v| serde_json::from_value::<RequestId>(v["request_id"].clone()).ok())
            .unwrap_or_default();
        self.append_result(&RequestResult::err(request_id, "INVALID_RECORD", detail))?;
        self.finish_file(processing_path, SUFFIX_INVALID)
    }

    fn finish_file(&self, processing_path: &Path, suffix: &str) -> QueueResult<()> {
        let name = processing_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let dest = self.completed.join(format!("{name}.{suffix}"));
        fs::rename(processing_path, &dest).map_err(|source| QueueError::Io {
            path: dest,
            source,
        })
    }

    fn append_result(&self, result: &RequestResult) -> QueueResult<()> {
        let mut line = serde_json::to_vec(result)?;
        line.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.results)
            .map_err(|source| QueueError::Io {
                path: self.results.clone(),
                source,
            })?;
        file.write_all(&line).map_err(|source| QueueError::Io {
            path: self.results.clone(),
            source,
        })
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> QueueResult<()> {
        let tmp = self.outbox.join(format!(".{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, bytes).map_err(|source| QueueError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| QueueError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Phase;
    use serde_json::json;

    fn envelope() -> CommandEnvelope {
        CommandEnvelope::plan("file_control", "list", "u1", json!({"target": "/docs"}))
    }

    #[test]
    fn test_enqueue_claim_complete() {
        let dir = tempfile::tempdir().unwrap();
        let queue = CommandQueue::open(dir.path()).unwrap();
        let id = queue.enqueue(&envelope()).unwrap();

        let claim = queue.claim_next().unwrap().unwrap();
        assert_eq!(claim.envelope.request_id, id);
        assert_eq!(claim.envelope.phase, Phase::Plan);
        assert_eq!(queue.pending_count().unwrap(), 0);

        queue
            .complete(claim, &RequestResult::ok(id.clone(), "list /docs", vec![]))
            .unwrap();

        let completed: Vec<_> = fs::read_dir(dir.path().join("completed"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(completed, vec![format!("{}.json.ok", id.0)]);

        let results = fs::read_to_string(queue.results_path()).unwrap();
        let row: serde_json::Value = serde_json::from_str(results.lines().next().unwrap()).unwrap();
        assert_eq!(row["ok"], true);
        assert_eq!(row["plan_summary"], "list /docs");
    }

    #[test]
    fn test_failure_tagged_err() {
        let dir = tempfile::tempdir().unwrap();
        let queue = CommandQueue::open(dir.path()).unwrap();
        let id = queue.enqueue(&envelope()).unwrap();
        let claim = queue.claim_next().unwrap().unwrap();
        queue
            .complete(claim, &RequestResult::err(id.clone(), "TOKEN_EXPIRED", "past TTL"))
            .unwrap();

        let completed: Vec<_> = fs::read_dir(dir.path().join("completed"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(completed, vec![format!("{}.json.err", id.0)]);
    }

    #[test]
    fn test_empty_queue_claims_none() {
        let dir = tempfile::tempdir().unwrap();
        let queue = CommandQueue::open(dir.path()).unwrap();
        assert!(queue.claim_next().unwrap().is_none());
    }

    #[test]
    fn test_claim_exclusivity() {
        let dir = tempfile::tempdir().unwrap();
        let first = CommandQueue::open(dir.path()).unwrap();
        let second = CommandQueue::open(dir.path()).unwrap();
        first.enqueue(&envelope()).unwrap();

        let claims = [
            first.claim_next().unwrap().is_some(),
            second.claim_next().unwrap().is_some(),
        ];
        assert_eq!(claims.iter().filter(|claimed| **claimed).count(), 1);
    }

    #[test]
    fn test_concurrent_claimants_exactly_one_wins() {
        use std::sync::{Arc, Barrier};

        let dir = tempfile::tempdir().unwrap();
        CommandQueue::open(dir.path()).unwrap().enqueue(&envelope()).unwrap();

        // Two workers race the rename on the same record; the loser's
        // failed rename must be treated as a skip, not an error.
        let barrier = Arc::new(Barrier::new(2));
        let mut handles = Vec::new();
        for _ in 0..2 {
            let barrier = Arc::clone(&barrier);
            let queue = CommandQueue::open(dir.path()).unwrap();
            handles.push(std::thread::spawn(move || {
                barrier.wait();
                queue.claim_next().unwrap().is_some()
            }));
        }

        let wins: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(wins.iter().filter(|claimed| **claimed).count(), 1);
    }

    #[test]
    fn test_invalid_record_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let queue = CommandQueue::open(dir.path()).unwrap();
        fs::write(dir.path().join("outbox/broken.json"), b"{not json").unwrap();

        assert!(queue.claim_next().unwrap().is_none());

        let completed: Vec<_> = fs::read_dir(dir.path().join("completed"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(completed, vec!["broken.json.invalid".to_string()]);

        // Never retried: the outbox stays empty.
        assert!(queue.claim_next().unwrap().is_none());

        let results = fs::read_to_string(queue.results_path()).unwrap();
        assert!(results.contains("INVALID_RECORD"));
    }

    #[test]
    fn test_unknown_schema_version_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let queue = CommandQueue::open(dir.path()).unwrap();
        let mut env = envelope();
        env.schema_version = 99;
        queue.enqueue(&env).unwrap();

        assert!(queue.claim_next().unwrap().is_none());
        let results = fs::read_to_string(queue.results_path()).unwrap();
        assert!(results.contains("unsupported schema version"));
    }

    #[test]
    fn test_claims_follow_enqueue_order() {
        let dir = tempfile::tempdir().unwrap();
        let queue = CommandQueue::open(dir.path()).unwrap();
        let first = queue.enqueue(&envelope()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        let second = queue.enqueue(&envelope()).unwrap();

        let a = queue.claim_next().unwrap().unwrap();
        let b = queue.claim_next().unwrap().unwrap();
        assert_eq!(a.envelope.request_id, first);
        assert_eq!(b.envelope.request_id, second);
    }
}
