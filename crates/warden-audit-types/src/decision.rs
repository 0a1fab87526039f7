//! Policy decisions.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// A stable reason code attached to a denial.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReasonCode(Cow<'static, str>);

impl ReasonCode {
    /// Returned when no rule matches a request.
    pub const NO_MATCHING_RULE: ReasonCode = ReasonCode::from_static("no_matching_rule");

    /// Create a reason code from a static string.
    pub const fn from_static(code: &'static str) -> Self {
        Self(Cow::Borrowed(code))
    }

    /// Create a reason code from an owned string.
    pub fn new(code: impl Into<String>) -> Self {
        Self(Cow::Owned(code.into()))
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of evaluating the policy for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Access granted by the named rule.
    Allowed { rule: String },
    /// Access refused.
    Denied { reason: ReasonCode },
}

impl Decision {
    /// An allow decision from the given rule.
    pub fn allowed(rule: impl Into<String>) -> Self {
        Self::Allowed { rule: rule.into() }
    }

    /// A deny decision with the given reason.
    pub fn denied(reason: ReasonCode) -> Self {
        Self::Denied { reason }
    }

    /// The fail-closed default.
    pub fn no_matching_rule() -> Self {
        Self::denied(ReasonCode::NO_MATCHING_RULE)
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied { .. })
    }

    /// The denial reason, if denied.
    pub fn reason(&self) -> Option<&ReasonCode> {
        match self {
            Self::Denied { reason } => Some(reason),
            Self::Allowed { .. } => None,
        }
    }
}
