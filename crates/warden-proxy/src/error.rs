//! Proxy errors.

use std::time::Duration;
use thiserror::Error;
use warden_audit_log::AuditError;
use warden_audit_types::ReasonCode;

/// Errors returned by a proxied call.
///
/// `PolicyDenied`, `InitializationFailed` and `OperationFailed` are ordinary
/// outcomes and are always recorded in the audit log. `AuditLogExhausted`
/// means no room could be reserved for the record, so the call was refused
/// before the resource was built or touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyError {
    #[error("access denied: {reason}")]
    PolicyDenied { reason: ReasonCode },

    #[error("resource initialization failed: {reason}")]
    InitializationFailed { reason: String },

    #[error("operation failed: {reason}")]
    OperationFailed { reason: String },

    #[error("audit log unavailable: {0}")]
    AuditLogExhausted(#[from] AuditError),

    #[error("gave up waiting after {deadline:?}")]
    DeadlineElapsed { deadline: Duration },

    #[error("invocation task failed: {0}")]
    Join(String),

    #[error("proxy configuration error: {0}")]
    Config(String),
}

impl ProxyError {
    /// Whether the failure was recorded in the audit log.
    pub fn is_audited(&self) -> bool {
        matches!(
            self,
            Self::PolicyDenied { .. } | Self::InitializationFailed { .. } | Self::OperationFailed { .. }
        )
    }

    /// The denial reason, if the policy refused the call.
    pub fn denial_reason(&self) -> Option<&ReasonCode> {
        match self {
            Self::PolicyDenied { reason } => Some(reason),
            _ => None,
        }
    }
}

impl From<warden_policy::PolicyError> for ProxyError {
    fn from(e: warden_policy::PolicyError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<warden_common_config::EnvError> for ProxyError {
    fn from(e: warden_common_config::EnvError) -> Self {
        Self::Config(e.to_string())
    }
}

/// Proxy result type.
pub type Result<T> = std::result::Result<T, ProxyError>;
