//! Audit records and entries.

use crate::{Decision, Operation, ResourceKey, Role};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::Display;
use warden_common_core::{ProxyId, Timestamp};

/// What happened after the policy decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display)]
#[serde(tag = "status", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditOutcome {
    /// The policy refused the call; nothing was attempted.
    Denied,
    /// The operation ran and succeeded.
    Succeeded,
    /// The resource could not be constructed.
    InitializationFailed { reason: String },
    /// The operation ran and failed.
    OperationFailed { reason: String },
}

impl AuditOutcome {
    /// Check if the outcome is successful.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Check if the outcome is a failure of an allowed call.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::InitializationFailed { .. } | Self::OperationFailed { .. }
        )
    }

    /// Whether the operation itself was invoked on the resource.
    pub fn was_attempted(&self) -> bool {
        matches!(self, Self::Succeeded | Self::OperationFailed { .. })
    }

    /// Failure reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::InitializationFailed { reason } | Self::OperationFailed { reason } => {
                Some(reason)
            }
            Self::Denied | Self::Succeeded => None,
        }
    }
}

/// An access attempt waiting to be appended to the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// When the attempt was made.
    pub timestamp: Timestamp,
    /// Calling actor's role.
    pub role: Role,
    /// Requested operation.
    pub operation: Operation,
    /// Targeted resource.
    pub resource_key: ResourceKey,
    /// Policy decision.
    pub decision: Decision,
    /// Result of the attempt.
    pub outcome: AuditOutcome,
    /// Proxy that handled the call, when several share one log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<ProxyId>,
}

impl AuditRecord {
    /// Create a new record builder.
    pub fn builder(
        role: Role,
        operation: Operation,
        resource_key: ResourceKey,
        decision: Decision,
    ) -> AuditRecordBuilder {
        AuditRecordBuilder::new(role, operation, resource_key, decision)
    }
}

/// Builder for audit records.
#[derive(Debug)]
pub struct AuditRecordBuilder {
    role: Role,
    operation: Operation,
    resource_key: ResourceKey,
    decision: Decision,
    outcome: Option<AuditOutcome>,
    timestamp: Option<Timestamp>,
    origin: Option<ProxyId>,
}

impl AuditRecordBuilder {
    /// Create a new builder.
    pub fn new(role: Role, operation: Operation, resource_key: ResourceKey, decision: Decision) -> Self {
        Self {
            role,
            operation,
            resource_key,
            decision,
            outcome: None,
            timestamp: None,
            origin: None,
        }
    }

    /// Set the outcome (defaults to `Denied` or `Succeeded` following the decision).
    pub fn outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Override the timestamp.
    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set the originating proxy.
    pub fn origin(mut self, origin: ProxyId) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Build the record.
    pub fn build(self) -> AuditRecord {
        let outcome = self.outcome.unwrap_or_else(|| {
            if self.decision.is_denied() {
                AuditOutcome::Denied
            } else {
                AuditOutcome::Succeeded
            }
        });
        AuditRecord {
            timestamp: self.timestamp.unwrap_or_else(Timestamp::now),
            role: self.role,
            operation: self.operation,
            resource_key: self.resource_key,
            decision: self.decision,
            outcome,
            origin: self.origin,
        }
    }
}

/// An appended, sequence-numbered audit record. Never mutated after append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the log, assigned at append time.
    pub sequence: u64,
    /// The appended record.
    #[serde(flatten)]
    pub record: AuditRecord,
    /// Hex SHA-256 link hash chaining this entry to its predecessor.
    pub chain_hash: String,
}

impl AuditEntry {
    pub fn decision(&self) -> &Decision {
        &self.record.decision
    }

    pub fn outcome(&self) -> &AuditOutcome {
        &self.record.outcome
    }
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = &self.record;
        let result = if record.decision.is_allowed() { "granted" } else { "denied" };
        write!(
            f,
            "#{} {} - role: {}, op: {}, key: {}, result: {} ({})",
            self.sequence,
            record.timestamp.to_log_format(),
            record.role,
            record.operation,
            record.resource_key,
            result,
            record.outcome,
        )?;
        match (record.outcome.reason(), record.decision.reason()) {
            (Some(reason), _) => write!(f, ": {}", reason),
            (None, Some(reason)) => write!(f, ": {}", reason),
            (None, None) => Ok(()),
        }
    }
}
