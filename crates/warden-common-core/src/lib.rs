//! Warden common core types and utilities.

pub mod error;
pub mod id;
pub mod timestamp;

pub use error::{Error, Result};
pub use id::{AuditLogId, IdParseError, ProxyId};
pub use timestamp::Timestamp;
