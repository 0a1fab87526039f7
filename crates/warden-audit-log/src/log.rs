//! The append-only audit log.

use crate::chain::{self, ChainError, GENESIS_HASH};
use parking_lot::RwLock;
use std::io::Write;
use tracing::{debug, error};
use warden_audit_types::{AuditEntry, AuditRecord};
use warden_common_config::AuditConfig;
use warden_common_core::AuditLogId;

/// Configuration for an audit log.
#[derive(Debug, Clone, Default)]
pub struct AuditLogConfig {
    /// Maximum number of entries; `None` for unbounded.
    pub capacity: Option<usize>,
    /// Sequence number assigned to the first entry.
    pub initial_sequence: u64,
}

impl From<&AuditConfig> for AuditLogConfig {
    fn from(config: &AuditConfig) -> Self {
        Self {
            capacity: config.capacity,
            initial_sequence: config.initial_sequence,
        }
    }
}

/// Errors appending to the log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuditError {
    /// The configured capacity is used up.
    #[error("audit log exhausted: capacity of {capacity} entries reached")]
    Exhausted { capacity: usize },
    /// No sequence number is left to assign.
    #[error("audit sequence space exhausted after {last}")]
    SequenceOverflow { last: u64 },
}

struct LogState {
    entries: Vec<AuditEntry>,
    next_sequence: Option<u64>,
    head_hash: String,
    /// Slots handed out by [`AuditLog::reserve`] and not yet committed or dropped.
    reserved: usize,
}

/// Append-only, sequence-numbered record of access attempts.
///
/// Appends are serialized by a short write-locked section that assigns the
/// sequence number, links the chain hash and pushes the entry, so entry order
/// is the order in which appends reached the log. Snapshots take the read
/// lock and therefore always see a prefix of complete entries.
pub struct AuditLog {
    id: AuditLogId,
    config: AuditLogConfig,
    state: RwLock<LogState>,
}

impl AuditLog {
    /// Create a new log.
    pub fn new(config: AuditLogConfig) -> Self {
        let state = LogState {
            entries: Vec::with_capacity(config.capacity.unwrap_or(0).min(1024)),
            next_sequence: Some(config.initial_sequence),
            head_hash: GENESIS_HASH.to_string(),
            reserved: 0,
        };
        Self {
            id: AuditLogId::new(),
            config,
            state: RwLock::new(state),
        }
    }

    /// Create an unbounded log starting at sequence 0.
    pub fn unbounded() -> Self {
        Self::new(AuditLogConfig::default())
    }

    /// Create a log holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(AuditLogConfig {
            capacity: Some(capacity),
            ..AuditLogConfig::default()
        })
    }

    pub fn id(&self) -> AuditLogId {
        self.id
    }

    pub fn capacity(&self) -> Option<usize> {
        self.config.capacity
    }

    /// Sequence number of the first entry.
    pub fn initial_sequence(&self) -> u64 {
        self.config.initial_sequence
    }

    /// Append a record and return the sequence number it was assigned.
    ///
    /// On error the log is left unchanged.
    pub fn append(&self, record: AuditRecord) -> Result<u64, AuditError> {
        self.reserve()?.commit(record)
    }

    /// Claim room for one entry before doing the work it will describe.
    ///
    /// Capacity and sequence space are held by the returned slot until it is
    /// committed or dropped, so a caller that gets a slot can always record
    /// its outcome. Sequence numbers are still assigned at commit time.
    pub fn reserve(&self) -> Result<AuditSlot<'_>, AuditError> {
        let mut state = self.state.write();

        if let Some(capacity) = self.config.capacity {
            if state.entries.len() + state.reserved >= capacity {
                error!(log = %self.id, capacity, "Audit log capacity reached");
                return Err(AuditError::Exhausted { capacity });
            }
        }

        let claimable = state
            .next_sequence
            .and_then(|next| next.checked_add(state.reserved as u64));
        if claimable.is_none() {
            let last = state.entries.last().map(|e| e.sequence).unwrap_or(u64::MAX);
            error!(log = %self.id, last, "Audit sequence space exhausted");
            return Err(AuditError::SequenceOverflow { last });
        }

        state.reserved += 1;
        Ok(AuditSlot {
            log: self,
            open: true,
        })
    }

    /// Number of slots reserved but not yet committed.
    pub fn reserved(&self) -> usize {
        self.state.read().reserved
    }

    fn commit(&self, record: AuditRecord) -> Result<u64, AuditError> {
        let digest = chain::record_digest(&record);
        let mut state = self.state.write();
        state.reserved = state.reserved.saturating_sub(1);

        let Some(sequence) = state.next_sequence else {
            let last = state.entries.last().map(|e| e.sequence).unwrap_or(u64::MAX);
            return Err(AuditError::SequenceOverflow { last });
        };

        let chain_hash = chain::link_hash(sequence, &digest, &state.head_hash);
        state.head_hash = chain_hash.clone();
        state.next_sequence = sequence.checked_add(1);
        state.entries.push(AuditEntry {
            sequence,
            record,
            chain_hash,
        });
        drop(state);

        debug!(log = %self.id, sequence, "Audit entry appended");
        Ok(sequence)
    }

    fn release(&self) {
        let mut state = self.state.write();
        state.reserved = state.reserved.saturating_sub(1);
    }

    /// All entries appended so far, in sequence order.
    pub fn snapshot(&self) -> Vec<AuditEntry> {
        self.state.read().entries.clone()
    }

    /// Entries with a sequence number of at least `sequence`.
    pub fn entries_since(&self, sequence: u64) -> Vec<AuditEntry> {
        let state = self.state.read();
        let start = state.entries.partition_point(|e| e.sequence < sequence);
        state.entries[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sequence number of the most recent entry.
    pub fn last_sequence(&self) -> Option<u64> {
        self.state.read().entries.last().map(|e| e.sequence)
    }

    /// Chain hash of the most recent entry (the genesis hash when empty).
    pub fn head_hash(&self) -> String {
        self.state.read().head_hash.clone()
    }

    /// Recompute the hash chain over a fresh snapshot.
    pub fn verify(&self) -> Result<(), ChainError> {
        chain::verify_chain(&self.snapshot())
    }

    /// Write every entry as one JSON object per line. Returns the number written.
    pub fn export_jsonl<W: Write>(&self, writer: W) -> warden_common_core::Result<usize> {
        crate::export::write_jsonl(&self.snapshot(), writer)
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("id", &self.id)
            .field("capacity", &self.config.capacity)
            .field("len", &self.len())
            .field("reserved", &self.reserved())
            .finish()
    }
}

/// Room for one entry, claimed by [`AuditLog::reserve`].
///
/// Dropping an uncommitted slot gives the room back.
#[must_use = "an uncommitted slot holds audit capacity until dropped"]
pub struct AuditSlot<'a> {
    log: &'a AuditLog,
    open: bool,
}

impl AuditSlot<'_> {
    /// Append `record` into the reserved room and return its sequence number.
    pub fn commit(mut self, record: AuditRecord) -> Result<u64, AuditError> {
        self.open = false;
        self.log.commit(record)
    }
}

impl Drop for AuditSlot<'_> {
    fn drop(&mut self) {
        if self.open {
            self.log.release();
        }
    }
}

impl std::fmt::Debug for AuditSlot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditSlot")
            .field("log", &self.log.id)
            .field("open", &self.open)
            .finish()
    }
}
