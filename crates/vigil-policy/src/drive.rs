//! External-drive preflight checks.
//!
//! Plans touching the external root (`HIGH_PRECHECK` tier) run these checks
//! at plan time; failures populate the plan's blocker list rather than
//! erroring out.

use tracing::debug;
use vigil_config::PolicyConfig;

use crate::error::PolicyError;

/// Probe the external drive: mounted, writable, and enough free space.
///
/// Returns every failed check, not just the first, so the reviewer sees the
/// full preflight picture. An unconfigured external root yields no failures.
#[must_use]
pub fn check_external_drive(config: &PolicyConfig) -> Vec<PolicyError> {
    let Some(root) = &config.roots.external else {
        return Vec::new();
    };

    let mut failures = Vec::new();

    if !root.is_dir() {
        // Nothing else is checkable on an unmounted drive.
        return vec![PolicyError::DriveNotMounted { root: root.clone() }];
    }

    let probe = root.join(".vigil-write-probe");
    match std::fs::write(&probe, b"probe") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
        },
        Err(e) => {
            debug!(root = %root.display(), error = %e, "write probe failed");
            failures.push(PolicyError::DriveNotWritable { root: root.clone() });
        },
    }

    match fs2::available_space(root) {
        Ok(free) if free < config.thresholds.min_free_space_bytes => {
            failures.push(PolicyError::DriveFreeSpaceLow {
                free,
                min: config.thresholds.min_free_space_bytes,
            });
        },
        Ok(_) => {},
        Err(e) => {
            // A drive whose capacity cannot be read is treated as unmounted.
            debug!(root = %root.display(), error = %e, "free-space probe failed");
            failures.push(PolicyError::DriveNotMounted { root: root.clone() });
        },
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_config::PolicyConfig;

    #[test]
    fn test_unconfigured_external_passes() {
        let mut config = PolicyConfig::defaults().unwrap();
        config.roots.external = None;
        assert!(check_external_drive(&config).is_empty());
    }

    #[test]
    fn test_unmounted_drive() {
        let mut config = PolicyConfig::defaults().unwrap();
        config.roots.external = Some("/definitely/not/mounted".into());
        let failures = check_external_drive(&config);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].code(), "DRIVE_NOT_MOUNTED");
    }

    #[test]
    fn test_mounted_drive_passes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = PolicyConfig::defaults().unwrap();
        config.roots.external = Some(tmp.path().to_path_buf());
        config.thresholds.min_free_space_bytes = 0;
        assert!(check_external_drive(&config).is_empty());
    }

    #[test]
    fn test_free_space_threshold() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = PolicyConfig::defaults().unwrap();
        config.roots.external = Some(tmp.path().to_path_buf());
        config.thresholds.min_free_space_bytes = u64::MAX;
        let failures = check_external_drive(&config);
        assert!(failures.iter().any(|f| f.code() == "DRIVE_FREE_SPACE_LOW"));
    }
}
