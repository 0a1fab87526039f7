//! Access rules.

use crate::matcher::{KeyMatcher, Matcher};
use warden_audit_types::{Operation, ReasonCode, ResourceKey, Role};

/// What a matching rule decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny { reason: ReasonCode },
}

/// One ordered access rule.
///
/// ```
/// use warden_policy::{PolicyRule, ReasonCode};
///
/// let rule = PolicyRule::deny("no-confidential-reads", ReasonCode::from_static("confidential_resource"))
///     .for_role("user")
///     .for_operation("read")
///     .on_prefix("confidential_");
/// assert_eq!(rule.name(), "no-confidential-reads");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRule {
    name: String,
    roles: Matcher<Role>,
    operations: Matcher<Operation>,
    resource: KeyMatcher,
    effect: Effect,
}

impl PolicyRule {
    /// A rule with the given effect that matches every request.
    pub fn new(name: impl Into<String>, effect: Effect) -> Self {
        Self {
            name: name.into(),
            roles: Matcher::Any,
            operations: Matcher::Any,
            resource: KeyMatcher::Any,
            effect,
        }
    }

    pub fn allow(name: impl Into<String>) -> Self {
        Self::new(name, Effect::Allow)
    }

    pub fn deny(name: impl Into<String>, reason: ReasonCode) -> Self {
        Self::new(name, Effect::Deny { reason })
    }

    pub fn for_role(mut self, role: impl Into<Role>) -> Self {
        self.roles = Matcher::Exact(role.into());
        self
    }

    pub fn for_roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        self.roles = Matcher::OneOf(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn for_operation(mut self, operation: impl Into<Operation>) -> Self {
        self.operations = Matcher::Exact(operation.into());
        self
    }

    pub fn for_operations<I, O>(mut self, operations: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<Operation>,
    {
        self.operations = Matcher::OneOf(operations.into_iter().map(Into::into).collect());
        self
    }

    pub fn on_key(mut self, key: impl Into<ResourceKey>) -> Self {
        self.resource = KeyMatcher::Exact(key.into());
        self
    }

    pub fn on_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.resource = KeyMatcher::Prefix(prefix.into());
        self
    }

    pub fn on_glob(mut self, pattern: impl Into<String>) -> Self {
        self.resource = KeyMatcher::Glob(pattern.into());
        self
    }

    /// Replace the role matcher.
    pub fn with_roles(mut self, roles: Matcher<Role>) -> Self {
        self.roles = roles;
        self
    }

    /// Replace the operation matcher.
    pub fn with_operations(mut self, operations: Matcher<Operation>) -> Self {
        self.operations = operations;
        self
    }

    /// Replace the resource matcher.
    pub fn with_resource(mut self, resource: KeyMatcher) -> Self {
        self.resource = resource;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roles(&self) -> &Matcher<Role> {
        &self.roles
    }

    pub fn operations(&self) -> &Matcher<Operation> {
        &self.operations
    }

    pub fn resource(&self) -> &KeyMatcher {
        &self.resource
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rule_matches_everything() {
        let rule = PolicyRule::allow("open");
        assert_eq!(rule.roles(), &Matcher::Any);
        assert_eq!(rule.operations(), &Matcher::Any);
        assert_eq!(rule.resource(), &KeyMatcher::Any);
        assert_eq!(rule.effect(), &Effect::Allow);
    }

    #[test]
    fn test_builder_methods_set_matchers() {
        let rule = PolicyRule::deny("r", ReasonCode::from_static("nope"))
            .for_roles(["user", "guest"])
            .for_operations([Operation::Write, Operation::Delete])
            .on_glob("*.secret");

        assert_eq!(
            rule.roles(),
            &Matcher::OneOf(vec![Role::new("user"), Role::new("guest")])
        );
        assert!(rule.operations().matches(&Operation::Delete));
        assert_eq!(rule.resource(), &KeyMatcher::Glob("*.secret".into()));
        assert_eq!(
            rule.effect(),
            &Effect::Deny { reason: ReasonCode::from_static("nope") }
        );
    }
}
