//! The pure `(domain, action)` → risk resolution function.
//!
//! Exact rules win over domain defaults win over the caller's fallback.
//! This function is deterministic: same config and key, same answer.

use vigil_config::{PolicyConfig, RiskRule};
use vigil_core::RiskTier;

/// The outcome of resolving a `(domain, action)` key against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Risk tier for the action.
    pub risk_tier: RiskTier,
    /// Whether a mutating action needs an approval token.
    pub requires_approval: bool,
    /// Flags the execute request must carry.
    pub required_flags: Vec<String>,
}

impl Resolution {
    /// Build a caller fallback resolution.
    #[must_use]
    pub fn fallback(risk_tier: RiskTier, requires_approval: bool) -> Self {
        Self {
            risk_tier,
            requires_approval,
            required_flags: default_flags(risk_tier, requires_approval),
        }
    }
}

impl From<&RiskRule> for Resolution {
    fn from(rule: &RiskRule) -> Self {
        let required_flags = if rule.required_flags.is_empty() && rule.requires_approval {
            default_flags(rule.risk, rule.requires_approval)
        } else {
            rule.required_flags.clone()
        };
        Self {
            risk_tier: rule.risk,
            requires_approval: rule.requires_approval,
            required_flags,
        }
    }
}

/// Resolve a `(domain, action)` key to a risk decision.
///
/// Precedence: an exact `(domain, action)` rule wins over the
/// `(domain, "default")` rule, which wins over the caller-provided fallback.
#[must_use]
pub fn resolve_action(
    config: &PolicyConfig,
    domain: &str,
    action: &str,
    fallback: Resolution,
) -> Resolution {
    if let Some(rule) = config.rule(domain, action) {
        return rule.into();
    }
    if let Some(rule) = config.default_rule(domain) {
        return rule.into();
    }
    fallback
}

/// Default required flags for a tier when a rule names none.
///
/// Anything requiring approval requires at least `force`, even when a rule
/// demands approval at `MEDIUM` tier. The extra `push` flag for a remote
/// git push is carried by the rule table (see `defaults.toml`), since it is
/// an action-level property rather than a tier-level one.
#[must_use]
pub fn default_flags(_tier: RiskTier, requires_approval: bool) -> Vec<String> {
    if !requires_approval {
        return Vec::new();
    }
    vec!["force".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_config::PolicyConfig;

    fn config() -> PolicyConfig {
        PolicyConfig::defaults().unwrap()
    }

    #[test]
    fn test_exact_rule_wins() {
        let r = resolve_action(
            &config(),
            "git",
            "push",
            Resolution::fallback(RiskTier::Medium, false),
        );
        assert_eq!(r.risk_tier, RiskTier::GitAware);
        assert!(r.requires_approval);
        assert_eq!(r.required_flags, vec!["force", "push"]);
    }

    #[test]
    fn test_domain_default_applies() {
        // No exact "git:commit" rule in the defaults; the git default holds.
        let r = resolve_action(
            &config(),
            "git",
            "commit",
            Resolution::fallback(RiskTier::Medium, false),
        );
        assert_eq!(r.risk_tier, RiskTier::GitAware);
        assert_eq!(r.required_flags, vec!["force"]);
    }

    #[test]
    fn test_fallback_when_domain_unknown() {
        let fallback = Resolution::fallback(RiskTier::High, true);
        let r = resolve_action(&config(), "nonexistent", "noop", fallback.clone());
        assert_eq!(r, fallback);
    }

    #[test]
    fn test_deterministic() {
        let c = config();
        let a = resolve_action(&c, "file", "delete", Resolution::fallback(RiskTier::Medium, false));
        let b = resolve_action(&c, "file", "delete", Resolution::fallback(RiskTier::Medium, false));
        assert_eq!(a, b);
    }

    #[test]
    fn test_approval_rules_always_carry_flags() {
        // Flag completeness: every requires_approval rule resolves to a
        // non-empty flag list, either its own or the tier default.
        let c = config();
        for (domain, actions) in &c.rules {
            for action in actions.keys() {
                let r = resolve_action(&c, domain, action, Resolution::fallback(RiskTier::Medium, false));
                if r.requires_approval {
                    assert!(
                        !r.required_flags.is_empty(),
                        "rule {domain}:{action} requires approval but has no flags"
                    );
                }
            }
        }
    }

    #[test]
    fn test_medium_rule_demanding_approval_is_gated() {
        // A rule may demand approval below HIGH tier; the resolution still
        // carries a flag set so the plan cannot auto-execute.
        let rule = RiskRule {
            risk: RiskTier::Medium,
            requires_approval: true,
            required_flags: Vec::new(),
        };
        let r = Resolution::from(&rule);
        assert_eq!(r.risk_tier, RiskTier::Medium);
        assert!(r.requires_approval);
        assert_eq!(r.required_flags, vec!["force"]);
    }

    #[test]
    fn test_default_flags() {
        assert!(default_flags(RiskTier::Medium, false).is_empty());
        assert_eq!(default_flags(RiskTier::Medium, true), vec!["force"]);
        assert_eq!(default_flags(RiskTier::High, true), vec!["force"]);
        assert_eq!(default_flags(RiskTier::HighPrecheck, true), vec!["force"]);
    }
}
