//! Policy and path-safety error types.

use std::path::PathBuf;

/// Errors raised by path-safety checks and git allowlisting.
///
/// These resolve locally into plan blockers; they are never thrown past the
/// plan builder.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PolicyError {
    /// The path is outside every configured allowed root.
    #[error("path '{path}' is outside all allowed roots")]
    PathOutsideAllowedRoot {
        /// The offending logical path.
        path: PathBuf,
    },

    /// The path contains a `.git` directory component.
    #[error("path '{path}' touches git metadata")]
    PathInGitMeta {
        /// The offending path.
        path: PathBuf,
    },

    /// The logical path sits inside an allowed root but its symlink-resolved
    /// real path does not.
    #[error("path '{path}' escapes allowed roots through a symlink (resolves to '{resolved}')")]
    PathSymlinkEscape {
        /// The logical path.
        path: PathBuf,
        /// Where it actually resolves.
        resolved: PathBuf,
    },

    /// The re-derived repository root is outside the git allowlist.
    #[error("repository '{repo}' is outside the git-allowed roots")]
    RepoOutsideGitAllowedRoots {
        /// The derived repository root.
        repo: PathBuf,
    },

    /// No git repository was found above the working path.
    #[error("no git repository found above '{path}'")]
    RepoNotFound {
        /// The working path searched from.
        path: PathBuf,
    },

    /// The external drive root does not exist or is not a directory.
    #[error("external drive root '{root}' is not mounted")]
    DriveNotMounted {
        /// Configured external root.
        root: PathBuf,
    },

    /// The external drive is mounted but a write probe failed.
    #[error("external drive root '{root}' is not writable")]
    DriveNotWritable {
        /// Configured external root.
        root: PathBuf,
    },

    /// Free space on the external drive is below the configured threshold.
    #[error("external drive has {free} bytes free, below threshold {min}")]
    DriveFreeSpaceLow {
        /// Bytes currently available.
        free: u64,
        /// Configured minimum.
        min: u64,
    },
}

impl PolicyError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::PathOutsideAllowedRoot { .. } => "PATH_OUTSIDE_ALLOWED_ROOT",
            Self::PathInGitMeta { .. } => "PATH_IN_GIT_META",
            Self::PathSymlinkEscape { .. } => "PATH_SYMLINK_ESCAPE",
            Self::RepoOutsideGitAllowedRoots { .. } => "REPO_OUTSIDE_GIT_ALLOWED_ROOTS",
            Self::RepoNotFound { .. } => "REPO_NOT_FOUND",
            Self::DriveNotMounted { .. } => "DRIVE_NOT_MOUNTED",
            Self::DriveNotWritable { .. } => "DRIVE_NOT_WRITABLE",
            Self::DriveFreeSpaceLow { .. } => "DRIVE_FREE_SPACE_LOW",
        }
    }
}

/// Result type for policy checks.
pub type PolicyResult<T> = Result<T, PolicyError>;
