//! Access policy for Warden.
//!
//! A [`PolicyEngine`] holds an ordered list of [`PolicyRule`]s. Evaluating a
//! `(role, operation, resource key)` request walks the list and returns the
//! effect of the first rule that matches; when none does, the request is
//! denied with `no_matching_rule`.
//!
//! ```
//! use warden_policy::{Operation, PolicyEngine, PolicyRule, ResourceKey, Role};
//!
//! let engine = PolicyEngine::builder()
//!     .rule(PolicyRule::allow("admin-all").for_role("admin"))
//!     .build()
//!     .unwrap();
//!
//! let decision = engine.evaluate(&Role::new("admin"), &Operation::Write, &ResourceKey::new("config"));
//! assert!(decision.is_allowed());
//!
//! let decision = engine.evaluate(&Role::new("user"), &Operation::Write, &ResourceKey::new("config"));
//! assert!(decision.is_denied());
//! ```

mod config;
mod engine;
mod error;
mod matcher;
pub mod presets;
mod rule;

pub use engine::{Explanation, PolicyEngine, PolicyEngineBuilder};
pub use error::{PolicyError, Result};
pub use matcher::{KeyMatcher, Matcher};
pub use rule::{Effect, PolicyRule};

pub use warden_audit_types::{Decision, Operation, ReasonCode, ResourceKey, Role};
