//! Building rules from their YAML representation.

use crate::engine::PolicyEngine;
use crate::error::{PolicyError, Result};
use crate::matcher::{KeyMatcher, Matcher};
use crate::rule::{Effect, PolicyRule};
use warden_audit_types::{Operation, ReasonCode, ResourceKey, Role};
use warden_common_config::{PolicyConfig, RuleConfig, RuleEffect};

impl TryFrom<&RuleConfig> for PolicyRule {
    type Error = PolicyError;

    fn try_from(config: &RuleConfig) -> Result<Self> {
        let invalid = |message: &str| PolicyError::InvalidRuleConfig {
            rule: config.name.clone(),
            message: message.to_string(),
        };

        let effect = match config.effect {
            RuleEffect::Allow if config.reason.is_some() => {
                return Err(invalid("reason is only valid on deny rules"));
            }
            RuleEffect::Allow => Effect::Allow,
            RuleEffect::Deny => Effect::Deny {
                reason: ReasonCode::new(config.reason.clone().unwrap_or_else(|| config.name.clone())),
            },
        };

        let resource = match (&config.resource, &config.resource_prefix, &config.resource_glob) {
            (None, None, None) => KeyMatcher::Any,
            (Some(key), None, None) => KeyMatcher::Exact(ResourceKey::new(key.as_str())),
            (None, Some(prefix), None) => KeyMatcher::Prefix(prefix.clone()),
            (None, None, Some(pattern)) => KeyMatcher::Glob(pattern.clone()),
            _ => {
                return Err(invalid(
                    "set at most one of resource, resource_prefix, resource_glob",
                ))
            }
        };

        let roles: Vec<Role> = config.roles.iter().map(|r| Role::new(r.as_str())).collect();
        let operations: Vec<Operation> = config.operations.iter().map(|o| Operation::from(o.as_str())).collect();

        Ok(PolicyRule::new(config.name.clone(), effect)
            .with_roles(Matcher::from(roles))
            .with_operations(Matcher::from(operations))
            .with_resource(resource))
    }
}

impl PolicyEngine {
    /// Build an engine from config rules, in order.
    pub fn from_config(rules: &[RuleConfig]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(PolicyRule::try_from)
            .collect::<Result<Vec<_>>>()?;
        Self::new(rules)
    }
}

impl TryFrom<&PolicyConfig> for PolicyEngine {
    type Error = PolicyError;

    fn try_from(config: &PolicyConfig) -> Result<Self> {
        Self::from_config(&config.rules)
    }
}
