//! Configuration types.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// Audit log configuration.
    pub audit: AuditConfig,
    /// Access policy.
    pub policy: PolicyConfig,
    /// Proxy configuration.
    pub proxy: ProxyConfig,
}

/// Audit log configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Maximum number of retained entries (unbounded when absent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
    /// Sequence number of the first entry.
    pub initial_sequence: u64,
}

/// Ordered access rules. First match wins; no match denies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Rules in evaluation order.
    pub rules: Vec<RuleConfig>,
}

/// Effect of a matching rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleEffect {
    Allow,
    Deny,
}

/// One access rule as written in the config file.
///
/// Empty `roles` or `operations` match anything. At most one of
/// `resource`, `resource_prefix` and `resource_glob` may be set; none
/// matches every key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Unique rule name, recorded in allow decisions.
    pub name: String,
    /// Allow or deny.
    pub effect: RuleEffect,
    /// Roles the rule applies to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    /// Operations the rule applies to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<String>,
    /// Exact resource key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Resource key prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_prefix: Option<String>,
    /// Resource key glob pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_glob: Option<String>,
    /// Reason code for deny rules (defaults to the rule name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RuleConfig {
    /// A rule with the given name and effect that matches everything.
    pub fn new(name: impl Into<String>, effect: RuleEffect) -> Self {
        Self {
            name: name.into(),
            effect,
            roles: Vec::new(),
            operations: Vec::new(),
            resource: None,
            resource_prefix: None,
            resource_glob: None,
            reason: None,
        }
    }

    /// Number of resource matchers set.
    pub fn resource_matcher_count(&self) -> usize {
        [&self.resource, &self.resource_prefix, &self.resource_glob]
            .iter()
            .filter(|m| m.is_some())
            .count()
    }
}

/// Proxy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// How long an async caller waits for an invocation (ms).
    pub deadline_ms: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self { deadline_ms: 5_000 }
    }
}

impl ProxyConfig {
    /// The deadline as a duration.
    pub fn deadline(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.deadline_ms)
    }
}
