//! Hash chain linking consecutive audit entries.

use sha2::{Digest, Sha256};
use warden_audit_types::{AuditEntry, AuditOutcome, AuditRecord, Decision};

/// Previous-hash value of the first entry in a log.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Digest of a record's content, independent of its position in the log.
pub fn record_digest(record: &AuditRecord) -> String {
    let mut hasher = Sha256::new();
    let mut field = |value: &str| {
        hasher.update((value.len() as u64).to_le_bytes());
        hasher.update(value.as_bytes());
    };

    field(&record.timestamp.canonical());
    field(record.role.as_str());
    field(record.operation.as_str());
    field(record.resource_key.as_str());
    match &record.decision {
        Decision::Allowed { rule } => {
            field("allowed");
            field(rule.as_str());
        }
        Decision::Denied { reason } => {
            field("denied");
            field(reason.as_str());
        }
    }
    match &record.outcome {
        AuditOutcome::Denied => field("denied"),
        AuditOutcome::Succeeded => field("succeeded"),
        AuditOutcome::InitializationFailed { reason } => {
            field("initialization_failed");
            field(reason.as_str());
        }
        AuditOutcome::OperationFailed { reason } => {
            field("operation_failed");
            field(reason.as_str());
        }
    }
    field(&record.origin.map(|id| id.to_string()).unwrap_or_default());

    format!("{:x}", hasher.finalize())
}

/// Hash binding a record digest to its sequence number and predecessor.
pub fn link_hash(sequence: u64, record_digest: &str, prev_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sequence.to_le_bytes());
    hasher.update(record_digest.as_bytes());
    hasher.update(prev_hash.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Verify a snapshot taken from the start of a log.
pub fn verify_chain(entries: &[AuditEntry]) -> Result<(), ChainError> {
    verify_chain_from(entries, GENESIS_HASH)
}

/// Verify a contiguous run of entries whose predecessor had `prev_hash`.
pub fn verify_chain_from(entries: &[AuditEntry], prev_hash: &str) -> Result<(), ChainError> {
    let mut prev_hash = prev_hash.to_string();
    let mut expected = entries.first().map(|e| e.sequence);

    for entry in entries {
        if let Some(expected) = expected {
            if entry.sequence != expected {
                return Err(ChainError::Gap {
                    expected,
                    found: entry.sequence,
                });
            }
        }

        let computed = link_hash(entry.sequence, &record_digest(&entry.record), &prev_hash);
        if computed != entry.chain_hash {
            return Err(ChainError::BrokenLink {
                sequence: entry.sequence,
            });
        }

        prev_hash = computed;
        expected = entry.sequence.checked_add(1);
    }

    Ok(())
}

/// Chain verification error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("sequence gap: expected {expected}, found {found}")]
    Gap { expected: u64, found: u64 },
    #[error("chain hash mismatch at sequence {sequence}")]
    BrokenLink { sequence: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_audit_types::{Operation, ResourceKey, Role};

    fn record(role: &str) -> AuditRecord {
        AuditRecord::builder(
            Role::new(role),
            Operation::Read,
            ResourceKey::new("doc"),
            Decision::allowed("r"),
        )
        .build()
    }

    fn chain(records: Vec<AuditRecord>) -> Vec<AuditEntry> {
        let mut prev = GENESIS_HASH.to_string();
        records
            .into_iter()
            .enumerate()
            .map(|(i, record)| {
                let hash = link_hash(i as u64, &record_digest(&record), &prev);
                prev = hash.clone();
                AuditEntry {
                    sequence: i as u64,
                    record,
                    chain_hash: hash,
                }
            })
            .collect()
    }

    #[test]
    fn test_genesis_hash_shape() {
        assert_eq!(GENESIS_HASH.len(), 64);
        assert!(GENESIS_HASH.chars().all(|c| c == '0'));
    }

    #[test]
    fn test_digest_is_field_sensitive() {
        let a = record("user");
        let mut b = a.clone();
        b.role = Role::new("admin");
        assert_ne!(record_digest(&a), record_digest(&b));
        assert_eq!(record_digest(&a), record_digest(&a.clone()));
    }

    #[test]
    fn test_valid_chain_verifies() {
        let entries = chain(vec![record("a"), record("b"), record("c")]);
        assert_eq!(verify_chain(&entries), Ok(()));
        assert_eq!(verify_chain_from(&entries[1..], &entries[0].chain_hash), Ok(()));
        assert_eq!(verify_chain(&[]), Ok(()));
    }

    #[test]
    fn test_tampered_record_breaks_chain() {
        let mut entries = chain(vec![record("a"), record("b"), record("c")]);
        entries[1].record.role = Role::new("admin");
        assert_eq!(verify_chain(&entries), Err(ChainError::BrokenLink { sequence: 1 }));
    }

    #[test]
    fn test_removed_entry_is_a_gap() {
        let mut entries = chain(vec![record("a"), record("b"), record("c")]);
        entries.remove(1);
        assert_eq!(
            verify_chain(&entries),
            Err(ChainError::Gap { expected: 1, found: 2 })
        );
    }
}
