//! Policy validation rules.

use crate::error::{ConfigError, ConfigResult};
use crate::types::PolicyConfig;

/// Validate internal consistency of a merged policy.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when TTL bounds are inverted, a root
/// is relative, or a rule table names a domain with no entries.
pub fn validate(config: &PolicyConfig) -> ConfigResult<()> {
    validate_ttl("tokens", config.tokens.min_ttl_secs, config.tokens.default_ttl_secs, config.tokens.max_ttl_secs)?;
    validate_ttl("grants", config.grants.min_ttl_secs, config.grants.default_ttl_secs, config.grants.max_ttl_secs)?;

    for root in config.roots.allowed() {
        if root.is_relative() {
            return Err(ConfigError::Validation(format!(
                "root '{}' must be absolute",
                root.display()
            )));
        }
    }
    for root in &config.roots.git {
        if root.is_relative() {
            return Err(ConfigError::Validation(format!(
                "git root '{}' must be absolute",
                root.display()
            )));
        }
    }

    for (domain, actions) in &config.rules {
        if actions.is_empty() {
            return Err(ConfigError::Validation(format!(
                "rule domain '{domain}' has no actions"
            )));
        }
    }

    Ok(())
}

fn validate_ttl(what: &str, min: u64, default: u64, max: u64) -> ConfigResult<()> {
    if min > max {
        return Err(ConfigError::Validation(format!(
            "{what}: min_ttl_secs {min} exceeds max_ttl_secs {max}"
        )));
    }
    if default < min || default > max {
        return Err(ConfigError::Validation(format!(
            "{what}: default_ttl_secs {default} outside [{min}, {max}]"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader;

    #[test]
    fn test_defaults_validate() {
        let config = loader::defaults().unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_inverted_ttl_rejected() {
        let mut config = loader::defaults().unwrap();
        config.tokens.min_ttl_secs = 7200;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_relative_root_rejected() {
        let mut config = loader::defaults().unwrap();
        config.roots.medium.push("relative/path".into());
        assert!(validate(&config).is_err());
    }
}
