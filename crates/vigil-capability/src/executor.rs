//! External executor and connector seams.
//!
//! Concrete side effects live outside this crate: the filesystem, git, a
//! shell, and the various service connectors are reached through these
//! traits. Capabilities translate an executor's raw failure into the
//! structured `CAPABILITY_EXECUTE_FAILED` error; availability probes feed
//! the `CONNECTOR_UNAVAILABLE` blocker at plan time.

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

/// A raw failure reported by an external executor or connector.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ExecutorError(pub String);

impl ExecutorError {
    /// Build from any displayable cause.
    pub fn new(cause: impl std::fmt::Display) -> Self {
        Self(cause.to_string())
    }
}

/// Result type for executor calls.
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Filesystem and git side effects behind the file-control capability.
#[async_trait]
pub trait FileExecutor: Send + Sync {
    /// Whether the executor can currently perform work.
    fn available(&self) -> bool {
        true
    }

    /// List directory entries at `target`.
    async fn list(&self, target: &Path) -> ExecutorResult<Vec<String>>;

    /// Move `from` to `to`.
    async fn move_path(&self, from: &Path, to: &Path) -> ExecutorResult<()>;

    /// Move `target` into the trash root, preserving its file name.
    async fn trash(&self, target: &Path, trash_root: &Path) -> ExecutorResult<()>;

    /// Permanently delete `target`.
    async fn delete(&self, target: &Path) -> ExecutorResult<()>;

    /// Run a git subcommand in `repo`, returning its output.
    async fn git(&self, repo: &Path, args: &[String]) -> ExecutorResult<String>;
}

/// Output of one shell command run.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Process exit code.
    pub status: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Shell execution behind the exec capability.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Whether the runner can currently execute commands.
    fn available(&self) -> bool {
        true
    }

    /// Run one shell command to completion.
    async fn run(&self, command: &str) -> ExecutorResult<CommandOutput>;
}

/// Mail delivery behind the mail capability.
#[async_trait]
pub trait MailConnector: Send + Sync {
    /// Whether the connector can currently deliver.
    fn available(&self) -> bool {
        true
    }

    /// Send one message.
    async fn send(&self, to: &str, subject: &str, body: &str) -> ExecutorResult<()>;
}

/// Generic service connector behind the photo, schedule, browser, and
/// bot-dispatch capabilities.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connector name, for availability blockers and logs.
    fn name(&self) -> &str;

    /// Whether the connector can currently serve requests.
    fn available(&self) -> bool {
        true
    }

    /// Perform `action` with the given payload, returning a structured
    /// result document.
    async fn invoke(&self, action: &str, payload: &Value) -> ExecutorResult<Value>;
}
