//! Ready-made rule sets.

use crate::engine::PolicyEngine;
use crate::error::Result;
use crate::rule::PolicyRule;
use warden_audit_types::{Operation, ReasonCode};

/// Denial reason for reads of confidential documents.
pub const CONFIDENTIAL_RESOURCE: ReasonCode = ReasonCode::from_static("confidential_resource");

/// Key prefix marking a document as confidential.
pub const CONFIDENTIAL_PREFIX: &str = "confidential_";

/// Rules for a shared document store.
///
/// - `admin` may do anything.
/// - `user` may not read documents whose key starts with `confidential_`.
/// - `user` may read everything else.
/// - `editor` may write.
///
/// Anything else is denied by default.
pub fn file_access_rules() -> Vec<PolicyRule> {
    vec![
        PolicyRule::allow("admin-all").for_role("admin"),
        PolicyRule::deny("user-no-confidential-read", CONFIDENTIAL_RESOURCE)
            .for_role("user")
            .for_operation(Operation::Read)
            .on_prefix(CONFIDENTIAL_PREFIX),
        PolicyRule::allow("user-read")
            .for_role("user")
            .for_operation(Operation::Read),
        PolicyRule::allow("editor-write")
            .for_role("editor")
            .for_operation(Operation::Write),
    ]
}

/// Engine over [`file_access_rules`].
pub fn file_access() -> Result<PolicyEngine> {
    PolicyEngine::new(file_access_rules())
}
