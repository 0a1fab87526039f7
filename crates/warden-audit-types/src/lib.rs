//! Access and audit record types for Warden.
//!
//! These are the values that flow between the policy engine, the lazy
//! resource handle, the proxy and the audit log: who is asking ([`Role`]),
//! what they want to do ([`Operation`]), to which resource ([`ResourceKey`]),
//! what the policy said ([`Decision`]) and what happened ([`AuditOutcome`]).

mod decision;
mod entry;
mod name;
mod operation;

pub use decision::{Decision, ReasonCode};
pub use entry::{AuditEntry, AuditOutcome, AuditRecord, AuditRecordBuilder};
pub use name::{ResourceKey, Role};
pub use operation::Operation;
