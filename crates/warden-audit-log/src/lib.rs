//! Append-only audit log for Warden.
//!
//! This crate records every access attempt a gated proxy handles:
//!
//! - Thread-safe appends with gap-free sequence numbers
//! - Consistent snapshots (always a prefix of complete entries)
//! - Optional capacity limit surfaced as [`AuditError::Exhausted`], claimable
//!   ahead of time with [`AuditLog::reserve`]
//! - SHA-256 hash chain for tamper evidence
//! - JSON Lines export

mod chain;
mod export;
mod log;

pub use chain::{link_hash, record_digest, verify_chain, verify_chain_from, ChainError, GENESIS_HASH};
pub use export::{read_jsonl, write_jsonl};
pub use log::{AuditError, AuditLog, AuditLogConfig, AuditSlot};

// Re-export types for convenience
pub use warden_audit_types::{
    AuditEntry, AuditOutcome, AuditRecord, AuditRecordBuilder, Decision, Operation, ReasonCode,
    ResourceKey, Role,
};
