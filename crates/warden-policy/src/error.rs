//! Policy construction errors.

use thiserror::Error;

/// Errors building a policy engine.
///
/// Evaluation itself never fails; every problem is caught here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("rule at position {index} has an empty name")]
    EmptyRuleName { index: usize },

    #[error("duplicate rule name '{name}'")]
    DuplicateRule { name: String },

    #[error("rule '{rule}': invalid glob pattern '{pattern}': {message}")]
    InvalidPattern {
        rule: String,
        pattern: String,
        message: String,
    },

    #[error(
        "rule '{rule}' can never match{}",
        shadowed_by.as_ref().map(|s| format!(" (shadowed by '{s}')")).unwrap_or_default()
    )]
    UnreachableRule {
        rule: String,
        shadowed_by: Option<String>,
    },

    #[error("rule '{rule}': {message}")]
    InvalidRuleConfig { rule: String, message: String },
}

/// Policy result type.
pub type Result<T> = std::result::Result<T, PolicyError>;
