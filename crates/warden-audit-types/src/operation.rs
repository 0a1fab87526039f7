//! Requested operations.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Kind of access requested on a protected resource.
///
/// Serializes as its lowercase name; unknown names parse to [`Operation::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operation {
    Read,
    Write,
    Delete,
    List,
    /// Domain-specific extension.
    Custom(String),
}

impl Operation {
    /// Build an operation from a name, mapping the standard names to their variants.
    pub fn custom(name: impl Into<String>) -> Self {
        Self::from(name.into())
    }

    /// The operation name as written in rules and audit records.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
            Self::List => "list",
            Self::Custom(name) => name,
        }
    }

    /// Operations that leave the resource unchanged.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::Read | Self::List)
    }
}

impl FromStr for Operation {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "read" => Self::Read,
            "write" => Self::Write,
            "delete" => Self::Delete,
            "list" => Self::List,
            _ => Self::Custom(s.to_string()),
        })
    }
}

impl From<String> for Operation {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(op) => op,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for Operation {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Operation> for String {
    fn from(op: Operation) -> Self {
        match op {
            Operation::Custom(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
