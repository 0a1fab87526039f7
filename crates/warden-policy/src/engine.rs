//! Ordered, first-match, fail-closed rule evaluation.

use crate::error::{PolicyError, Result};
use crate::matcher::{CompiledKey, KeyMatcher};
use crate::rule::{Effect, PolicyRule};
use std::collections::HashSet;
use tracing::{debug, trace};
use warden_audit_types::{Decision, Operation, ResourceKey, Role};

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: PolicyRule,
    resource: CompiledKey,
}

impl CompiledRule {
    fn matches(&self, role: &Role, operation: &Operation, key: &ResourceKey) -> bool {
        self.rule.roles().matches(role)
            && self.rule.operations().matches(operation)
            && self.resource.matches(key)
    }

    /// Every request this rule's successor `later` could match is provably
    /// matched by this rule first.
    fn shadows(&self, later: &CompiledRule) -> bool {
        self.rule.roles().subsumes(later.rule.roles())
            && self.rule.operations().subsumes(later.rule.operations())
            && self.resource.subsumes(&later.resource)
    }

    fn decision(&self) -> Decision {
        match self.rule.effect() {
            Effect::Allow => Decision::allowed(self.rule.name()),
            Effect::Deny { reason } => Decision::denied(reason.clone()),
        }
    }
}

/// A decision together with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub decision: Decision,
    /// Position of the deciding rule; `None` for the fail-closed default.
    pub rule_index: Option<usize>,
}

/// Evaluates `(role, operation, resource key)` against an ordered rule list.
///
/// Rules are validated when the engine is built and are immutable afterwards,
/// so an engine can be shared across threads behind an `Arc` and evaluated
/// without synchronization. The first matching rule decides; a request no
/// rule matches is denied with [`ReasonCode::NO_MATCHING_RULE`].
///
/// [`ReasonCode::NO_MATCHING_RULE`]: warden_audit_types::ReasonCode::NO_MATCHING_RULE
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    rules: Vec<CompiledRule>,
}

impl PolicyEngine {
    /// Build an engine, rejecting rule lists that contain mistakes.
    ///
    /// Fails on an empty or duplicate rule name, an invalid glob, an empty
    /// one-of list, or a rule provably shadowed by an earlier one.
    pub fn new(rules: Vec<PolicyRule>) -> Result<Self> {
        let mut names = HashSet::new();
        let mut compiled: Vec<CompiledRule> = Vec::with_capacity(rules.len());

        for (index, rule) in rules.into_iter().enumerate() {
            if rule.name().trim().is_empty() {
                return Err(PolicyError::EmptyRuleName { index });
            }
            if !names.insert(rule.name().to_string()) {
                return Err(PolicyError::DuplicateRule {
                    name: rule.name().to_string(),
                });
            }

            let resource = rule.resource().compile().map_err(|e| PolicyError::InvalidPattern {
                rule: rule.name().to_string(),
                pattern: match rule.resource() {
                    KeyMatcher::Glob(pattern) => pattern.clone(),
                    other => format!("{other:?}"),
                },
                message: format!("{} at position {}", e.msg, e.pos),
            })?;

            if !rule.roles().is_satisfiable() || !rule.operations().is_satisfiable() {
                return Err(PolicyError::UnreachableRule {
                    rule: rule.name().to_string(),
                    shadowed_by: None,
                });
            }

            let candidate = CompiledRule { rule, resource };
            if let Some(earlier) = compiled.iter().find(|earlier| earlier.shadows(&candidate)) {
                return Err(PolicyError::UnreachableRule {
                    rule: candidate.rule.name().to_string(),
                    shadowed_by: Some(earlier.rule.name().to_string()),
                });
            }
            compiled.push(candidate);
        }

        debug!(rules = compiled.len(), "Policy engine built");
        Ok(Self { rules: compiled })
    }

    pub fn builder() -> PolicyEngineBuilder {
        PolicyEngineBuilder::default()
    }

    /// Decide whether `role` may perform `operation` on `key`.
    pub fn evaluate(&self, role: &Role, operation: &Operation, key: &ResourceKey) -> Decision {
        self.explain(role, operation, key).decision
    }

    /// Like [`evaluate`](Self::evaluate), also reporting which rule decided.
    pub fn explain(&self, role: &Role, operation: &Operation, key: &ResourceKey) -> Explanation {
        let matched = self
            .rules
            .iter()
            .position(|rule| rule.matches(role, operation, key));

        let explanation = match matched {
            Some(index) => Explanation {
                decision: self.rules[index].decision(),
                rule_index: Some(index),
            },
            None => Explanation {
                decision: Decision::no_matching_rule(),
                rule_index: None,
            },
        };

        trace!(
            role = %role,
            op = %operation,
            key = %key,
            rule = matched.map(|i| self.rules[i].rule.name()).unwrap_or("<default>"),
            allowed = explanation.decision.is_allowed(),
            "Policy evaluated"
        );
        explanation
    }

    /// The rules in evaluation order.
    pub fn rules(&self) -> impl ExactSizeIterator<Item = &PolicyRule> {
        self.rules.iter().map(|c| &c.rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Collects rules in order, then validates them all at once.
#[derive(Debug, Default)]
pub struct PolicyEngineBuilder {
    rules: Vec<PolicyRule>,
}

impl PolicyEngineBuilder {
    pub fn rule(mut self, rule: PolicyRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = PolicyRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn build(self) -> Result<PolicyEngine> {
        PolicyEngine::new(self.rules)
    }
}
