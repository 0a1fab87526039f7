//! JSON Lines export of audit snapshots.

use std::io::Write;
use warden_audit_types::AuditEntry;

/// Write entries as JSON Lines (one entry per line). Returns the number written.
pub fn write_jsonl<W: Write>(entries: &[AuditEntry], mut writer: W) -> warden_common_core::Result<usize> {
    for entry in entries {
        serde_json::to_writer(&mut writer, entry)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(entries.len())
}

/// Parse JSON Lines produced by [`write_jsonl`].
pub fn read_jsonl(input: &str) -> warden_common_core::Result<Vec<AuditEntry>> {
    input
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(Into::into))
        .collect()
}
