//! Policy file loading and defaults/override merging.
//!
//! The load algorithm:
//! 1. Parse the embedded `defaults.toml` → base tree
//! 2. Deep-merge the override file (if any) into the base
//! 3. Deserialize the merged tree → [`PolicyConfig`]
//! 4. Validate

use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::types::PolicyConfig;
use crate::validate;

/// Embedded default policy.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Recursively deep-merge `overlay` into `base`.
///
/// Tables merge recursively per-field; scalars and arrays from the overlay
/// replace the base value.
pub(crate) fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

/// Load the policy from embedded defaults plus an optional override file.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the override file cannot be read or parsed,
/// the merged tree does not match the schema, or validation fails.
pub fn load(override_path: Option<&Path>) -> ConfigResult<PolicyConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::Parse {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    if let Some(path) = override_path {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let overlay: toml::Value = toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;
        deep_merge(&mut merged, &overlay);
        debug!(path = %path.display(), "merged policy override");
    }

    let config: PolicyConfig = merged.try_into().map_err(ConfigError::Schema)?;
    validate::validate(&config)?;
    Ok(config)
}

/// Build a [`PolicyConfig`] from the embedded defaults only.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the embedded defaults fail to parse or
/// validate — which indicates a packaging bug, not a runtime condition.
pub fn defaults() -> ConfigResult<PolicyConfig> {
    load(None)
}
