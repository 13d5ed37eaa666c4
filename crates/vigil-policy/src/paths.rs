//! Path-based risk classification and path-safety checks.
//!
//! Path safety runs *before* risk classification: a path that touches git
//! metadata or escapes the allowed roots through a symlink never reaches the
//! tier ranking at all.

use std::path::{Component, Path, PathBuf};

use vigil_config::PolicyConfig;
use vigil_core::RiskTier;

use crate::error::{PolicyError, PolicyResult};

/// Classify the risk tier of a planned operation from its candidate paths.
///
/// Ranks `MEDIUM(1) < HIGH(2) < HIGH_PRECHECK(3)` and takes the maximum
/// rank across all paths. Any path under the external-drive root forces
/// `HIGH_PRECHECK`. A git-mutating action forces `GIT_AWARE` regardless of
/// its paths.
#[must_use]
pub fn classify_risk_tier(
    config: &PolicyConfig,
    paths: &[PathBuf],
    git_mutating: bool,
) -> RiskTier {
    if git_mutating {
        return RiskTier::GitAware;
    }

    let mut tier = RiskTier::Medium;
    for path in paths {
        let path_tier = if is_under_external(config, path) {
            RiskTier::HighPrecheck
        } else if config.roots.high.iter().any(|root| path.starts_with(root)) {
            RiskTier::High
        } else {
            RiskTier::Medium
        };
        tier = tier.max(path_tier);
    }
    tier
}

fn is_under_external(config: &PolicyConfig, path: &Path) -> bool {
    config
        .roots
        .external
        .as_ref()
        .is_some_and(|ext| path.starts_with(ext))
}

/// Check one candidate path against the allowed roots.
///
/// - Any `.git` directory component is [`PolicyError::PathInGitMeta`],
///   regardless of allowed roots.
/// - A path outside every allowed root is
///   [`PolicyError::PathOutsideAllowedRoot`].
/// - A path whose logical form sits inside an allowed root but whose
///   symlink-resolved real form does not is
///   [`PolicyError::PathSymlinkEscape`].
///
/// # Errors
///
/// Returns the corresponding [`PolicyError`]; callers convert these into
/// plan blockers rather than propagating them.
pub fn check_path_safety(config: &PolicyConfig, path: &Path) -> PolicyResult<()> {
    if touches_git_meta(path) {
        return Err(PolicyError::PathInGitMeta {
            path: path.to_path_buf(),
        });
    }

    let logical_inside = config
        .roots
        .allowed()
        .iter()
        .any(|root| path.starts_with(root));
    if !logical_inside {
        return Err(PolicyError::PathOutsideAllowedRoot {
            path: path.to_path_buf(),
        });
    }

    // Follow symlinks on the deepest existing ancestor; the remainder of the
    // path (e.g. a move target that does not exist yet) is appended as-is.
    let resolved = resolve_existing_prefix(path);
    let resolved_inside = config
        .roots
        .allowed()
        .iter()
        .any(|root| resolved.starts_with(resolve_existing_prefix(root)));
    if !resolved_inside {
        return Err(PolicyError::PathSymlinkEscape {
            path: path.to_path_buf(),
            resolved,
        });
    }

    Ok(())
}

/// Check whether any component of the path is a `.git` directory entry.
#[must_use]
pub fn touches_git_meta(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(name) if name == ".git"))
}

/// Canonicalize the deepest existing ancestor of `path` and re-append the
/// non-existing remainder lexically.
///
/// `canonicalize` fails on paths that do not exist yet, but plan targets
/// (move destinations, files to be created) routinely do not. Resolving the
/// existing prefix is enough to catch symlinked directories on the way down.
#[must_use]
pub fn resolve_existing_prefix(path: &Path) -> PathBuf {
    if let Ok(real) = path.canonicalize() {
        return real;
    }

    let mut remainder: Vec<std::ffi::OsString> = Vec::new();
    let mut cursor = path.to_path_buf();
    loop {
        if let Ok(real) = cursor.canonicalize() {
            let mut out = real;
            for part in remainder.iter().rev() {
                out.push(part);
            }
            return out;
        }
        match (cursor.parent(), cursor.file_name()) {
            (Some(parent), Some(name)) => {
                remainder.push(name.to_os_string());
                cursor = parent.to_path_buf();
            },
            // No existing ancestor at all; return the logical path unchanged.
            _ => return path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_config::PolicyConfig;

    fn config_with_roots(medium: &Path, high: &Path, external: &Path) -> PolicyConfig {
        let mut config = PolicyConfig::defaults().unwrap();
        config.roots.medium = vec![medium.to_path_buf()];
        config.roots.high = vec![high.to_path_buf()];
        config.roots.external = Some(external.to_path_buf());
        config
    }

    #[test]
    fn test_tier_takes_max_rank() {
        let tmp = tempfile::tempdir().unwrap();
        let medium = tmp.path().join("m");
        let high = tmp.path().join("h");
        let external = tmp.path().join("x");
        let config = config_with_roots(&medium, &high, &external);

        let tier = classify_risk_tier(
            &config,
            &[medium.join("a.txt"), high.join("b.txt")],
            false,
        );
        assert_eq!(tier, RiskTier::High);

        let tier = classify_risk_tier(
            &config,
            &[medium.join("a.txt"), external.join("c.txt")],
            false,
        );
        assert_eq!(tier, RiskTier::HighPrecheck);
    }

    #[test]
    fn test_git_mutating_forces_git_aware() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_with_roots(tmp.path(), tmp.path(), tmp.path());
        let tier = classify_risk_tier(&config, &[tmp.path().join("repo")], true);
        assert_eq!(tier, RiskTier::GitAware);
    }

    #[test]
    fn test_git_meta_always_blocked() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_with_roots(tmp.path(), tmp.path(), tmp.path());
        let inside = tmp.path().join("repo/.git/config");
        let err = check_path_safety(&config, &inside).unwrap_err();
        assert_eq!(err.code(), "PATH_IN_GIT_META");
    }

    #[test]
    fn test_outside_all_roots() {
        let tmp = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let config = config_with_roots(tmp.path(), tmp.path(), tmp.path());
        let err = check_path_safety(&config, &elsewhere.path().join("f")).unwrap_err();
        assert_eq!(err.code(), "PATH_OUTSIDE_ALLOWED_ROOT");
    }

    #[test]
    fn test_nonexistent_target_inside_root_is_fine() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_with_roots(tmp.path(), tmp.path(), tmp.path());
        assert!(check_path_safety(&config, &tmp.path().join("new/dir/file.txt")).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_detected() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let config = config_with_roots(root.path(), root.path(), root.path());

        std::os::unix::fs::symlink(outside.path(), root.path().join("sneaky")).unwrap();

        let err = check_path_safety(&config, &root.path().join("sneaky/file.txt")).unwrap_err();
        assert_eq!(err.code(), "PATH_SYMLINK_ESCAPE");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_within_root_is_fine() {
        let root = tempfile::tempdir().unwrap();
        let config = config_with_roots(root.path(), root.path(), root.path());

        std::fs::create_dir(root.path().join("real")).unwrap();
        std::os::unix::fs::symlink(root.path().join("real"), root.path().join("alias")).unwrap();

        assert!(check_path_safety(&config, &root.path().join("alias/file.txt")).is_ok());
    }
}
