//! File and git operations: list, move, trash, delete, and the four git
//! actions (`git_status`, `git_diff`, `git_commit`, `git_push`).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use vigil_config::PolicyConfig;
use vigil_core::{Blocker, Plan, PlanOperation, RiskTier};
use vigil_policy::{
    check_external_drive, check_path_safety, classify_risk_tier, default_flags, git,
    resolve_action, Resolution,
};

use crate::error::{CapabilityError, CapabilityResult};
use crate::executor::FileExecutor;
use crate::registry::{Capability, ExecutionOutcome, PlanRequest};

/// File control: the filesystem and git surface of the engine.
pub struct FileControl {
    executor: Arc<dyn FileExecutor>,
}

impl FileControl {
    /// Build over a concrete executor.
    #[must_use]
    pub fn new(executor: Arc<dyn FileExecutor>) -> Self {
        Self { executor }
    }

    fn is_git_action(action: &str) -> bool {
        action.starts_with("git_")
    }

    fn is_mutating(action: &str) -> bool {
        matches!(action, "move" | "trash" | "delete" | "git_commit" | "git_push")
    }

    /// Enumerate source paths: a `targets` array for batches, else the
    /// single `target`.
    fn source_paths(payload: &Value) -> CapabilityResult<Vec<PathBuf>> {
        if let Some(targets) = payload.get("targets").and_then(Value::as_array) {
            let paths: Vec<PathBuf> = targets
                .iter()
                .filter_map(Value::as_str)
                .map(PathBuf::from)
                .collect();
            if !paths.is_empty() {
                return Ok(paths);
            }
        }
        match payload.get("target").and_then(Value::as_str) {
            Some(target) => Ok(vec![PathBuf::from(target)]),
            None => Err(CapabilityError::MissingField {
                code: "TARGET_REQUIRED",
                field: "target",
            }),
        }
    }

    /// Size/mtime fingerprint of a path, or `absent`. Hashed through the
    /// plan's operations, so the target changing underfoot changes the
    /// recomputed hash. Files at or under `max_hash_bytes` also carry a
    /// content digest, catching a same-length in-place rewrite; larger
    /// files fall back to size/mtime alone.
    fn fingerprint(path: &Path, max_hash_bytes: u64) -> String {
        let Ok(meta) = std::fs::metadata(path) else {
            return "absent".to_string();
        };
        let mtime = meta
            .modified()
            .ok()
            .and_then(|m| m.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_secs());
        let base = format!("{}B@{mtime}", meta.len());
        if meta.is_file() && meta.len() <= max_hash_bytes {
            if let Ok(bytes) = std::fs::read(path) {
                let digest = blake3::hash(&bytes).to_hex();
                return format!("{base}#{}", &digest.as_str()[..16]);
            }
        }
        base
    }

    fn plan_file_action(
        &self,
        request: &PlanRequest,
        config: &PolicyConfig,
    ) -> CapabilityResult<Plan> {
        let action = request.action.as_str();
        let sources = Self::source_paths(&request.payload)?;
        let mutating = Self::is_mutating(action);

        let dest = request
            .payload
            .get("dest")
            .and_then(Value::as_str)
            .map(PathBuf::from);
        if action == "move" && dest.is_none() {
            return Err(CapabilityError::MissingField {
                code: "DEST_REQUIRED",
                field: "dest",
            });
        }

        let mut candidate_paths: Vec<PathBuf> = sources.clone();
        if let Some(dest) = &dest {
            candidate_paths.push(dest.clone());
        }

        let mut blockers = Vec::new();
        let mut warnings = Vec::new();
        for path in &candidate_paths {
            if let Err(e) = check_path_safety(config, path) {
                blockers.push(Blocker::new(e.code(), e.to_string()));
            }
        }
        if !self.executor.available() {
            blockers.push(Blocker::new(
                "CONNECTOR_UNAVAILABLE",
                "file executor is not available",
            ));
        }

        let tier = self.resolve_tier(config, "file", action, &candidate_paths, false, mutating);
        if tier.risk_tier == RiskTier::HighPrecheck {
            for failure in check_external_drive(config) {
                blockers.push(Blocker::new(failure.code(), failure.to_string()));
            }
        }

        let mut operations = Vec::new();
        let mut rollback = Vec::new();
        for source in &sources {
            let display = source.display().to_string();
            match action {
                "list" => operations.push(PlanOperation::new("list", &display)),
                "move" => {
                    let dest = dest.as_ref().map_or_else(PathBuf::new, |d| {
                        move_destination(d, source, sources.len() > 1)
                    });
                    rollback.push(format!("move {} back to {display}", dest.display()));
                    operations.push(
                        PlanOperation::with_dest("move", &display, dest.display().to_string())
                            .with_precondition(Self::fingerprint(source, config.thresholds.max_hash_file_bytes)),
                    );
                },
                "trash" => {
                    rollback.push(format!(
                        "restore {display} from {}",
                        config.roots.trash.display()
                    ));
                    operations.push(
                        PlanOperation::with_dest(
                            "trash",
                            &display,
                            config.roots.trash.display().to_string(),
                        )
                        .with_precondition(Self::fingerprint(source, config.thresholds.max_hash_file_bytes)),
                    );
                },
                "delete" => {
                    rollback.push(format!("no automatic rollback: restore {display} from backup"));
                    operations.push(
                        PlanOperation::new("delete", &display)
                            .with_precondition(Self::fingerprint(source, config.thresholds.max_hash_file_bytes)),
                    );
                },
                other => {
                    return Err(CapabilityError::UnsupportedAction {
                        capability: self.name().to_string(),
                        action: other.to_string(),
                    })
                },
            }
            if mutating && !source.exists() {
                warnings.push(format!("{display} does not currently exist"));
            }
        }

        let summary = match action {
            "list" => format!("list {}", sources[0].display()),
            "move" => format!(
                "move {} item(s) to {}",
                sources.len(),
                dest.as_ref().map_or_else(String::new, |d| d.display().to_string())
            ),
            "trash" => format!("trash {} item(s)", sources.len()),
            _ => format!("delete {} item(s)", sources.len()),
        };

        Ok(Plan {
            capability: self.name().to_string(),
            action: action.to_string(),
            requester: request.requester.clone(),
            payload: request.payload.clone(),
            candidate_paths: candidate_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            operations,
            risk_tier: tier.risk_tier,
            mutating,
            approval_required: tier.requires_approval,
            required_flags: tier.required_flags,
            blockers,
            warnings,
            rollback,
            summary,
            grant_id: None,
        })
    }

    fn plan_git_action(
        &self,
        request: &PlanRequest,
        config: &PolicyConfig,
    ) -> CapabilityResult<Plan> {
        let action = request.action.as_str();
        let working = Self::source_paths(&request.payload)?
            .into_iter()
            .next()
            .unwrap_or_default();
        let mutating = Self::is_mutating(action);

        // Repo derivation and allowlisting are hard failures: a plan over a
        // disallowed repository is never presented for review at all.
        let repo = git::repo_root(&working)?;
        if mutating {
            git::check_repo_allowed(config, &repo)?;
        }

        if action == "git_commit" && request.payload.get("message").and_then(Value::as_str).is_none()
        {
            return Err(CapabilityError::MissingField {
                code: "MESSAGE_REQUIRED",
                field: "message",
            });
        }

        let mut blockers = Vec::new();
        if !self.executor.available() {
            blockers.push(Blocker::new(
                "CONNECTOR_UNAVAILABLE",
                "file executor is not available",
            ));
        }

        let repo_display = repo.display().to_string();
        let candidate_paths = vec![repo.clone()];
        let rule_action = action.trim_start_matches("git_");
        let tier = self.resolve_tier(config, "git", rule_action, &candidate_paths, mutating, mutating);

        let operations = vec![PlanOperation::new(action, &repo_display)];
        let rollback = match action {
            "git_commit" => vec![format!("git reset --soft HEAD~1 in {repo_display}")],
            "git_push" => vec![
                "revert the pushed commits and force-push the previous head".to_string(),
            ],
            _ => Vec::new(),
        };

        Ok(Plan {
            capability: self.name().to_string(),
            action: action.to_string(),
            requester: request.requester.clone(),
            payload: request.payload.clone(),
            candidate_paths: vec![repo_display.clone()],
            operations,
            risk_tier: tier.risk_tier,
            mutating,
            approval_required: tier.requires_approval,
            required_flags: tier.required_flags,
            blockers,
            warnings: Vec::new(),
            rollback,
            summary: format!("{} in {repo_display}", rule_action),
            grant_id: None,
        })
    }

    /// Combine path classification with the rule table: the plan's tier is
    /// the higher of the two, and any approval-requiring result carries a
    /// non-empty flag list.
    fn resolve_tier(
        &self,
        config: &PolicyConfig,
        domain: &str,
        action: &str,
        paths: &[PathBuf],
        git_mutating: bool,
        mutating: bool,
    ) -> Resolution {
        let path_tier = classify_risk_tier(config, paths, git_mutating);
        let fallback = Resolution::fallback(path_tier, mutating && path_tier.requires_approval());
        let rule = resolve_action(config, domain, action, fallback);

        let risk_tier = rule.risk_tier.max(path_tier);
        let requires_approval =
            mutating && (rule.requires_approval || risk_tier.requires_approval());
        let required_flags = if !requires_approval {
            Vec::new()
        } else if rule.required_flags.is_empty() {
            default_flags(risk_tier, true)
        } else {
            rule.required_flags
        };

        Resolution {
            risk_tier,
            requires_approval,
            required_flags,
        }
    }

    fn git_args(&self, plan: &Plan) -> Vec<String> {
        match plan.action.as_str() {
            "git_status" => vec!["status".to_string(), "--short".to_string()],
            "git_diff" => vec!["diff".to_string()],
            "git_commit" => {
                let message = plan
                    .payload
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                vec!["commit".to_string(), "-am".to_string(), message.to_string()]
            },
            _ => vec!["push".to_string()],
        }
    }
}

impl std::fmt::Debug for FileControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileControl").finish_non_exhaustive()
    }
}

/// A batch move lands each source inside `dest` by file name; a single
/// move treats `dest` as the full destination path.
fn move_destination(dest: &Path, source: &Path, batch: bool) -> PathBuf {
    if batch {
        source
            .file_name()
            .map_or_else(|| dest.to_path_buf(), |name| dest.join(name))
    } else {
        dest.to_path_buf()
    }
}

#[async_trait]
impl Capability for FileControl {
    fn name(&self) -> &str {
        "file_control"
    }

    async fn plan(
        &self,
        request: &PlanRequest,
        config: &PolicyConfig,
    ) -> CapabilityResult<Plan> {
        let plan = if Self::is_git_action(&request.action) {
            self.plan_git_action(request, config)?
        } else {
            self.plan_file_action(request, config)?
        };
        debug!(action = %plan.action, tier = %plan.risk_tier, blockers = plan.blockers.len(),
               "file-control plan built");
        Ok(plan)
    }

    async fn execute(
        &self,
        plan: &Plan,
        config: &PolicyConfig,
    ) -> CapabilityResult<ExecutionOutcome> {
        if plan.is_blocked() {
            return Err(CapabilityError::PlanBlocked {
                blockers: plan.blockers.clone(),
            });
        }

        let mut steps: Vec<String> = Vec::new();
        let mut detail = Value::Null;

        for op in &plan.operations {
            let target = PathBuf::from(&op.target);
            let result = match op.kind.as_str() {
                "list" => self.executor.list(&target).await.map(|entries| {
                    detail = json!({ "entries": entries });
                    format!("listed {}", op.target)
                }),
                "move" => {
                    let dest = PathBuf::from(op.dest.as_deref().unwrap_or_default());
                    self.executor
                        .move_path(&target, &dest)
                        .await
                        .map(|()| format!("moved {} to {}", op.target, dest.display()))
                },
                "trash" => self
                    .executor
                    .trash(&target, &config.roots.trash)
                    .await
                    .map(|()| format!("trashed {}", op.target)),
                "delete" => self
                    .executor
                    .delete(&target)
                    .await
                    .map(|()| format!("deleted {}", op.target)),
                git_kind => {
                    let args = self.git_args(plan);
                    self.executor.git(&target, &args).await.map(|output| {
                        detail = json!({ "output": output });
                        format!("{git_kind} in {}", op.target)
                    })
                },
            };

            match result {
                Ok(step) => {
                    info!(step = %step, "file-control step complete");
                    steps.push(step);
                },
                Err(e) => {
                    // Partial-failure aware: report what ran before the
                    // failing item.
                    return Err(CapabilityError::ExecuteFailed {
                        detail: format!("{}: {e}", op.target),
                        executed_steps: steps,
                    });
                },
            }
        }

        Ok(ExecutionOutcome {
            executed_steps: steps,
            detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ExecutorError, ExecutorResult};
    use std::sync::Mutex;

    /// Records calls; fails any target containing `fail`.
    #[derive(Default)]
    struct RecordingExecutor {
        calls: Mutex<Vec<String>>,
        unavailable: bool,
    }

    impl RecordingExecutor {
        fn record(&self, call: String) -> ExecutorResult<()> {
            if call.contains("fail") {
                return Err(ExecutorError::new("simulated failure"));
            }
            self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
            Ok(())
        }
    }

    #[async_trait]
    impl FileExecutor for RecordingExecutor {
        fn available(&self) -> bool {
            !self.unavailable
        }

        async fn list(&self, target: &Path) -> ExecutorResult<Vec<String>> {
            self.record(format!("list {}", target.display()))?;
            Ok(vec!["a.txt".to_string()])
        }

        async fn move_path(&self, from: &Path, to: &Path) -> ExecutorResult<()> {
            self.record(format!("move {} {}", from.display(), to.display()))
        }

        async fn trash(&self, target: &Path, trash_root: &Path) -> ExecutorResult<()> {
            self.record(format!("trash {} {}", target.display(), trash_root.display()))
        }

        async fn delete(&self, target: &Path) -> ExecutorResult<()> {
            self.record(format!("delete {}", target.display()))
        }

        async fn git(&self, repo: &Path, args: &[String]) -> ExecutorResult<String> {
            self.record(format!("git {} {}", args.join(" "), repo.display()))?;
            Ok("ok".to_string())
        }
    }

    fn test_config(root: &Path) -> PolicyConfig {
        let mut config = PolicyConfig::defaults().unwrap();
        config.roots.medium = vec![root.join("docs"), root.join("media")];
        config.roots.high = vec![root.join("vault")];
        config.roots.external = Some(root.join("external"));
        config.roots.git = vec![root.join("repos")];
        config.roots.trash = root.join("trash");
        config
    }

    fn capability() -> FileControl {
        FileControl::new(Arc::new(RecordingExecutor::default()))
    }

    #[tokio::test]
    async fn test_medium_move_needs_no_approval() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/a.txt"), b"x").unwrap();

        let request = PlanRequest::new(
            "move",
            json!({
                "target": dir.path().join("docs/a.txt").display().to_string(),
                "dest": dir.path().join("media/a.txt").display().to_string(),
            }),
            "u1",
        );
        let plan = capability().plan(&request, &config).await.unwrap();

        assert_eq!(plan.risk_tier, RiskTier::Medium);
        assert!(plan.required_flags.is_empty());
        assert!(!plan.requires_approval());
        assert!(!plan.is_blocked());
        assert_eq!(plan.operations.len(), 1);
    }

    #[tokio::test]
    async fn test_external_move_escalates_with_preflight() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/a.txt"), b"x").unwrap();
        // external root left uncreated: the drive is "unmounted"

        let request = PlanRequest::new(
            "move",
            json!({
                "target": dir.path().join("docs/a.txt").display().to_string(),
                "dest": dir.path().join("external/a.txt").display().to_string(),
            }),
            "u1",
        );
        let plan = capability().plan(&request, &config).await.unwrap();

        assert_eq!(plan.risk_tier, RiskTier::HighPrecheck);
        assert!(plan.requires_approval());
        assert_eq!(plan.required_flags, vec!["force"]);
        assert!(plan.blockers.iter().any(|b| b.code == "DRIVE_NOT_MOUNTED"));
    }

    #[test]
    fn test_fingerprint_digests_content_up_to_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        std::fs::write(&a, b"aaaa").unwrap();
        std::fs::write(&b, b"bbbb").unwrap();

        // Same length, different content: the digest still tells them apart.
        let fp_a = FileControl::fingerprint(&a, 1024);
        let fp_b = FileControl::fingerprint(&b, 1024);
        assert!(fp_a.contains('#'));
        assert_ne!(fp_a, fp_b);

        // Above the threshold the fingerprint degrades to size/mtime only.
        assert!(!FileControl::fingerprint(&a, 2).contains('#'));
        assert_eq!(
            FileControl::fingerprint(&dir.path().join("missing"), 1024),
            "absent"
        );
    }

    #[tokio::test]
    async fn test_medium_rule_demanding_approval_gates_the_plan() {
        use vigil_config::RiskRule;

        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.rules.entry("file".to_string()).or_default().insert(
            "trash".to_string(),
            RiskRule {
                risk: RiskTier::Medium,
                requires_approval: true,
                required_flags: Vec::new(),
            },
        );
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/a.txt"), b"x").unwrap();

        let request = PlanRequest::new(
            "trash",
            json!({"target": dir.path().join("docs/a.txt").display().to_string()}),
            "u1",
        );
        let plan = capability().plan(&request, &config).await.unwrap();

        // The tier stays medium, but the rule's approval demand survives
        // into the plan: a token is still required and `force` with it.
        assert_eq!(plan.risk_tier, RiskTier::Medium);
        assert!(plan.requires_approval());
        assert_eq!(plan.required_flags, vec!["force"]);
    }

    #[tokio::test]
    async fn test_delete_is_high_risk() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/a.txt"), b"x").unwrap();

        let request = PlanRequest::new(
            "delete",
            json!({"target": dir.path().join("docs/a.txt").display().to_string()}),
            "u1",
        );
        let plan = capability().plan(&request, &config).await.unwrap();

        assert_eq!(plan.risk_tier, RiskTier::High);
        assert_eq!(plan.required_flags, vec!["force"]);
        assert!(plan.rollback[0].contains("backup"));
    }

    #[tokio::test]
    async fn test_missing_target_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let err = capability()
            .plan(&PlanRequest::new("delete", json!({}), "u1"), &config)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TARGET_REQUIRED");

        let err = capability()
            .plan(&PlanRequest::new("move", json!({"target": "/docs/a"}), "u1"), &config)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "DEST_REQUIRED");
    }

    #[tokio::test]
    async fn test_path_outside_roots_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let request = PlanRequest::new("delete", json!({"target": "/etc/passwd"}), "u1");
        let plan = capability().plan(&request, &config).await.unwrap();
        assert!(plan
            .blockers
            .iter()
            .any(|b| b.code == "PATH_OUTSIDE_ALLOWED_ROOT"));
    }

    #[tokio::test]
    async fn test_git_push_outside_allowlist_fails_at_plan() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        // A real repo, but under docs/ rather than the git allowlist.
        let repo = dir.path().join("docs/proj");
        std::fs::create_dir_all(repo.join(".git")).unwrap();

        let request = PlanRequest::new(
            "git_push",
            json!({"target": repo.display().to_string()}),
            "u1",
        );
        let err = capability().plan(&request, &config).await.unwrap_err();
        assert_eq!(err.code(), "REPO_OUTSIDE_GIT_ALLOWED_ROOTS");
    }

    #[tokio::test]
    async fn test_git_push_in_allowlist_carries_push_flag() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let repo = dir.path().join("repos/proj");
        std::fs::create_dir_all(repo.join(".git")).unwrap();

        let request = PlanRequest::new(
            "git_push",
            json!({"target": repo.display().to_string()}),
            "u1",
        );
        let plan = capability().plan(&request, &config).await.unwrap();
        assert_eq!(plan.risk_tier, RiskTier::GitAware);
        assert_eq!(plan.required_flags, vec!["force", "push"]);
        assert!(plan.requires_approval());
    }

    #[tokio::test]
    async fn test_git_status_skips_approval() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        // Outside the git allowlist, but non-mutating actions are not gated
        // by it.
        let repo = dir.path().join("docs/proj");
        std::fs::create_dir_all(repo.join(".git")).unwrap();

        let request = PlanRequest::new(
            "git_status",
            json!({"target": repo.display().to_string()}),
            "u1",
        );
        let plan = capability().plan(&request, &config).await.unwrap();
        assert!(!plan.mutating);
        assert!(!plan.requires_approval());
    }

    #[tokio::test]
    async fn test_plan_hash_drifts_when_target_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        let target = dir.path().join("docs/a.txt");
        std::fs::write(&target, b"x").unwrap();

        let request = PlanRequest::new(
            "delete",
            json!({"target": target.display().to_string()}),
            "u1",
        );
        let cap = capability();
        let approved = cap.plan(&request, &config).await.unwrap();

        std::fs::remove_file(&target).unwrap();
        let recomputed = cap.plan(&request, &config).await.unwrap();

        assert_ne!(approved.content_hash(), recomputed.content_hash());
        assert_eq!(recomputed.operations[0].precondition.as_deref(), Some("absent"));
    }

    #[tokio::test]
    async fn test_execute_refuses_blocked_plan() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let request = PlanRequest::new("delete", json!({"target": "/etc/passwd"}), "u1");
        let cap = capability();
        let plan = cap.plan(&request, &config).await.unwrap();
        let err = cap.execute(&plan, &config).await.unwrap_err();
        assert_eq!(err.code(), "PLAN_BLOCKED");
    }

    #[tokio::test]
    async fn test_batch_move_reports_partial_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        let good = dir.path().join("docs/good.txt");
        let bad = dir.path().join("docs/fail.txt");
        std::fs::write(&good, b"x").unwrap();
        std::fs::write(&bad, b"x").unwrap();

        let request = PlanRequest::new(
            "move",
            json!({
                "targets": [good.display().to_string(), bad.display().to_string()],
                "dest": dir.path().join("media").display().to_string(),
            }),
            "u1",
        );
        let cap = capability();
        let plan = cap.plan(&request, &config).await.unwrap();
        let err = cap.execute(&plan, &config).await.unwrap_err();

        assert_eq!(err.code(), "CAPABILITY_EXECUTE_FAILED");
        assert_eq!(err.executed_steps().len(), 1);
        assert!(err.executed_steps()[0].contains("good.txt"));
    }

    #[tokio::test]
    async fn test_list_executes_with_detail() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();

        let request = PlanRequest::new(
            "list",
            json!({"target": dir.path().join("docs").display().to_string()}),
            "u1",
        );
        let cap = capability();
        let plan = cap.plan(&request, &config).await.unwrap();
        assert!(!plan.mutating);

        let outcome = cap.execute(&plan, &config).await.unwrap();
        assert_eq!(outcome.detail["entries"][0], "a.txt");
    }

    #[tokio::test]
    async fn test_unavailable_executor_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();

        let cap = FileControl::new(Arc::new(RecordingExecutor {
            unavailable: true,
            ..Default::default()
        }));
        let request = PlanRequest::new(
            "trash",
            json!({"target": dir.path().join("docs/a.txt").display().to_string()}),
            "u1",
        );
        let plan = cap.plan(&request, &config).await.unwrap();
        assert!(plan.blockers.iter().any(|b| b.code == "CONNECTOR_UNAVAILABLE"));
    }
}
