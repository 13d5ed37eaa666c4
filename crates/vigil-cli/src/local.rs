//! Local executors backing the CLI runner.
//!
//! These perform real side effects on the machine the worker runs on. The
//! worker treats each call as synchronous-to-completion; nothing here
//! enforces its own timeout.

use std::path::Path;
use std::process::Command;

use async_trait::async_trait;

use serde_json::Value;
use vigil_capability::{
    CommandOutput, CommandRunner, Connector, ExecutorError, ExecutorResult, FileExecutor,
    MailConnector,
};

/// Filesystem and git operations via `std::fs` and the `git` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileExecutor;

#[async_trait]
impl FileExecutor for LocalFileExecutor {
    async fn list(&self, target: &Path) -> ExecutorResult<Vec<String>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(target).map_err(ExecutorError::new)? {
            let entry = entry.map_err(ExecutorError::new)?;
            entries.push(entry.file_name().to_string_lossy().to_string());
        }
        entries.sort();
        Ok(entries)
    }

    async fn move_path(&self, from: &Path, to: &Path) -> ExecutorResult<()> {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).map_err(ExecutorError::new)?;
        }
        std::fs::rename(from, to).map_err(ExecutorError::new)
    }

    async fn trash(&self, target: &Path, trash_root: &Path) -> ExecutorResult<()> {
        std::fs::create_dir_all(trash_root).map_err(ExecutorError::new)?;
        let name = target
            .file_name()
            .ok_or_else(|| ExecutorError::new("target has no file name"))?;
        std::fs::rename(target, trash_root.join(name)).map_err(ExecutorError::new)
    }

    async fn delete(&self, target: &Path) -> ExecutorResult<()> {
        if target.is_dir() {
            std::fs::remove_dir_all(target).map_err(ExecutorError::new)
        } else {
            std::fs::remove_file(target).map_err(ExecutorError::new)
        }
    }

    async fn git(&self, repo: &Path, args: &[String]) -> ExecutorResult<String> {
        let output = Command::new("git")
            .current_dir(repo)
            .args(args)
            .output()
            .map_err(ExecutorError::new)?;
        if !output.status.success() {
            return Err(ExecutorError::new(String::from_utf8_lossy(&output.stderr)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Shell commands via `sh -c`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalShellRunner;

#[async_trait]
impl CommandRunner for LocalShellRunner {
    async fn run(&self, command: &str) -> ExecutorResult<CommandOutput> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .map_err(ExecutorError::new)?;
        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// A connector that is never available.
///
/// The CLI has no service integrations wired up, so the photo, schedule,
/// browser, bot-dispatch, and mail capabilities plan with a
/// `CONNECTOR_UNAVAILABLE` blocker instead of being absent from the
/// registry entirely.
#[derive(Debug, Clone, Copy)]
pub struct OfflineConnector {
    name: &'static str,
}

impl OfflineConnector {
    /// Build an offline connector reporting `name`.
    #[must_use]
    pub fn named(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Connector for OfflineConnector {
    fn name(&self) -> &str {
        self.name
    }

    fn available(&self) -> bool {
        false
    }

    async fn invoke(&self, _action: &str, _payload: &Value) -> ExecutorResult<Value> {
        Err(ExecutorError::new(format!(
            "connector {} is not configured",
            self.name
        )))
    }
}

#[async_trait]
impl MailConnector for OfflineConnector {
    fn available(&self) -> bool {
        false
    }

    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> ExecutorResult<()> {
        Err(ExecutorError::new("mail connector is not configured"))
    }
}
