//! Policy-gated, audited access to lazily built resources.
//!
//! A [`GatedResourceProxy`] sits in front of one [`ProtectedResource`]. For
//! each call it asks the [`PolicyEngine`](warden_policy::PolicyEngine)
//! whether the caller's role may perform the operation on the resource key,
//! reserves room in the shared [`AuditLog`](warden_audit_log::AuditLog),
//! builds the resource on the first allowed call, performs the operation and
//! commits one record. A full log refuses the call before anything runs.
//!
//! ```
//! use std::sync::Arc;
//! use warden_policy::presets;
//! use warden_proxy::{DocumentStore, GatedResourceProxy, ProxyError};
//!
//! let proxy = Arc::new(
//!     GatedResourceProxy::builder()
//!         .engine(presets::file_access().unwrap())
//!         .factory(|| Ok::<_, std::io::Error>(DocumentStore::new()))
//!         .build()
//!         .unwrap(),
//! );
//!
//! let user = proxy.as_role("user");
//! assert!(matches!(
//!     user.read("confidential_report"),
//!     Err(ProxyError::PolicyDenied { .. })
//! ));
//! // Denied calls never build the resource.
//! assert!(!proxy.is_initialized());
//! assert_eq!(proxy.audit_log().len(), 1);
//! ```

mod deadline;
mod error;
mod proxy;
mod resource;
mod role;
mod store;

pub use error::{ProxyError, Result};
pub use proxy::{FactoryError, GatedResourceProxy, ProxyBuilder, DEFAULT_DEADLINE};
pub use resource::ProtectedResource;
pub use role::RoleBoundProxy;
pub use store::{DocumentError, DocumentOutput, DocumentStore};

pub use warden_audit_log::{AuditEntry, AuditError, AuditLog, AuditLogConfig, AuditOutcome};
pub use warden_audit_types::{Decision, Operation, ReasonCode, ResourceKey, Role};
