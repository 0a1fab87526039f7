//! Rule matchers for roles, operations and resource keys.

use warden_audit_types::ResourceKey;

/// Matches a single value such as a role or an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher<T> {
    /// Matches anything.
    Any,
    /// Matches one value.
    Exact(T),
    /// Matches any listed value. An empty list matches nothing.
    OneOf(Vec<T>),
}

impl<T: PartialEq> Matcher<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == value,
            Self::OneOf(values) => values.contains(value),
        }
    }

    /// Whether at least one value can match.
    pub fn is_satisfiable(&self) -> bool {
        !matches!(self, Self::OneOf(values) if values.is_empty())
    }

    /// True when every value matched by `other` is provably matched by `self`.
    ///
    /// Conservative: `false` means "not proven", not "does not subsume".
    pub fn subsumes(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Any, _) => true,
            (_, Self::Any) => false,
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Exact(a), Self::OneOf(ys)) => !ys.is_empty() && ys.iter().all(|y| y == a),
            (Self::OneOf(xs), Self::Exact(b)) => xs.contains(b),
            (Self::OneOf(xs), Self::OneOf(ys)) => ys.iter().all(|y| xs.contains(y)),
        }
    }
}

impl<T> From<Vec<T>> for Matcher<T> {
    /// Empty means any, one value means exact, more means one-of.
    fn from(mut values: Vec<T>) -> Self {
        match values.len() {
            0 => Self::Any,
            1 => Self::Exact(values.remove(0)),
            _ => Self::OneOf(values),
        }
    }
}

/// Matches resource keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMatcher {
    /// Matches every key.
    Any,
    /// Matches one key.
    Exact(ResourceKey),
    /// Matches keys starting with the prefix.
    Prefix(String),
    /// Matches keys against a glob pattern (`*`, `?`, `[...]`).
    ///
    /// The pattern is compiled when the engine is built.
    Glob(String),
}

impl KeyMatcher {
    pub(crate) fn compile(&self) -> std::result::Result<CompiledKey, glob::PatternError> {
        Ok(match self {
            Self::Any => CompiledKey::Any,
            Self::Exact(key) => CompiledKey::Exact(key.clone()),
            Self::Prefix(prefix) => CompiledKey::Prefix(prefix.clone()),
            Self::Glob(pattern) => CompiledKey::Glob(glob::Pattern::new(pattern)?),
        })
    }
}

/// A key matcher with its glob compiled.
#[derive(Debug, Clone)]
pub(crate) enum CompiledKey {
    Any,
    Exact(ResourceKey),
    Prefix(String),
    Glob(glob::Pattern),
}

impl CompiledKey {
    pub(crate) fn matches(&self, key: &ResourceKey) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == key,
            Self::Prefix(prefix) => key.has_prefix(prefix),
            Self::Glob(pattern) => pattern.matches(key.as_str()),
        }
    }

    /// Conservative subsumption, as for [`Matcher::subsumes`].
    pub(crate) fn subsumes(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Any, _) => true,
            (_, Self::Any) => false,
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Prefix(p), Self::Exact(k)) => k.has_prefix(p),
            (Self::Prefix(p), Self::Prefix(q)) => q.starts_with(p.as_str()),
            (Self::Glob(g), Self::Exact(k)) => g.matches(k.as_str()),
            (Self::Glob(g), Self::Glob(h)) => g.as_str() == h.as_str(),
            _ => false,
        }
    }
}
