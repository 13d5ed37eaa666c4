//! Git repository derivation and allowlisting.
//!
//! Git-mutating actions are gated twice: the working path passes the normal
//! path-safety checks, and the repository root is independently re-derived
//! and checked against the *separate* git allowlist.

use std::path::{Path, PathBuf};

use vigil_config::PolicyConfig;

use crate::error::{PolicyError, PolicyResult};
use crate::paths::resolve_existing_prefix;

/// Walk upward from `working_path` to find the enclosing repository root
/// (the first ancestor containing a `.git` directory).
///
/// # Errors
///
/// Returns [`PolicyError::RepoNotFound`] if no ancestor contains `.git`.
pub fn repo_root(working_path: &Path) -> PolicyResult<PathBuf> {
    let start = resolve_existing_prefix(working_path);
    let mut cursor: &Path = &start;
    loop {
        if cursor.join(".git").is_dir() {
            return Ok(cursor.to_path_buf());
        }
        match cursor.parent() {
            Some(parent) => cursor = parent,
            None => {
                return Err(PolicyError::RepoNotFound {
                    path: working_path.to_path_buf(),
                })
            },
        }
    }
}

/// Check a derived repository root against the git allowlist.
///
/// The git allowlist is independent of the general allowed roots: a
/// repository may sit inside a perfectly ordinary medium root and still be
/// off-limits for git mutation.
///
/// # Errors
///
/// Returns [`PolicyError::RepoOutsideGitAllowedRoots`] when the repository
/// root is not under any configured git root.
pub fn check_repo_allowed(config: &PolicyConfig, repo: &Path) -> PolicyResult<()> {
    let resolved = resolve_existing_prefix(repo);
    let allowed = config.roots.git.iter().any(|root| {
        resolved.starts_with(resolve_existing_prefix(root))
    });
    if allowed {
        Ok(())
    } else {
        Err(PolicyError::RepoOutsideGitAllowedRoots {
            repo: repo.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_config::PolicyConfig;

    fn make_repo(dir: &Path) {
        std::fs::create_dir_all(dir.join(".git")).unwrap();
    }

    #[test]
    fn test_repo_root_derivation() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = tmp.path().join("project");
        make_repo(&repo);
        std::fs::create_dir_all(repo.join("src/deep")).unwrap();

        let derived = repo_root(&repo.join("src/deep")).unwrap();
        assert_eq!(derived, repo.canonicalize().unwrap());
    }

    #[test]
    fn test_repo_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = repo_root(&tmp.path().join("plain")).unwrap_err();
        assert_eq!(err.code(), "REPO_NOT_FOUND");
    }

    #[test]
    fn test_repo_allowlist() {
        let tmp = tempfile::tempdir().unwrap();
        let allowed = tmp.path().join("allowed");
        let rogue = tmp.path().join("rogue");
        make_repo(&allowed.join("proj"));
        make_repo(&rogue.join("proj"));

        let mut config = PolicyConfig::defaults().unwrap();
        config.roots.git = vec![allowed.clone()];

        assert!(check_repo_allowed(&config, &allowed.join("proj")).is_ok());
        let err = check_repo_allowed(&config, &rogue.join("proj")).unwrap_err();
        assert_eq!(err.code(), "REPO_OUTSIDE_GIT_ALLOWED_ROOTS");
    }
}
