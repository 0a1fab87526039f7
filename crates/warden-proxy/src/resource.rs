//! The operation seam between the proxy and the guarded resource.

use warden_audit_types::{Operation, ResourceKey};

/// A resource whose operations are reached only through a proxy.
///
/// The proxy has already checked the policy and will record the outcome;
/// implementations only perform the operation.
pub trait ProtectedResource: Send + Sync {
    /// Per-call input.
    type Args;
    /// Successful result.
    type Output;
    /// Operation failure, recorded by its `Display` text.
    type Error: std::error::Error;

    fn perform(
        &self,
        operation: &Operation,
        key: &ResourceKey,
        args: Self::Args,
    ) -> Result<Self::Output, Self::Error>;
}
