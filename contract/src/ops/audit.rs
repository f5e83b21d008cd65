//! # Audit Records
//!
//! One record per completed operation — success or failure — handed to a
//! pluggable sink. Routing the records (files, collectors, nothing) is the
//! host's business; the contract only guarantees the *content* is
//! deterministic: the `at` field is the round key, never a wall clock, and
//! the detail values come from the request and the error, nothing ambient.
//!
//! Audit records are observability, not state: they are emitted in
//! operation-completion order but are not part of the replica state digest.

use serde::Serialize;
use serde_json::Value;

use crate::error::ContractError;

/// A single audit record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// The round key the operation executed in.
    pub at: String,
    /// Operation name.
    pub event: String,
    pub success: bool,
    /// Vault the operation touched, when the payload names one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_id: Option<String>,
    /// Failure code, for unsuccessful operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,
}

impl AuditRecord {
    pub fn success(round_key: &str, event: &str, vault_id: Option<String>) -> Self {
        Self {
            at: round_key.to_string(),
            event: event.to_string(),
            success: true,
            vault_id,
            code: None,
            error_id: None,
        }
    }

    pub fn failure(
        round_key: &str,
        event: &str,
        vault_id: Option<String>,
        error: &ContractError,
    ) -> Self {
        Self {
            at: round_key.to_string(),
            event: event.to_string(),
            success: false,
            vault_id,
            code: Some(error.code.as_str().to_string()),
            error_id: Some(error.error_id()),
        }
    }

    /// The vault id named by a payload, if any.
    pub fn vault_id_from(payload: &Value) -> Option<String> {
        payload
            .get("vaultId")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Where audit records go. The default routes through `tracing` under the
/// `audit` target; tests swap in a collecting sink.
pub trait AuditSink: Send {
    fn record(&mut self, record: AuditRecord);
}

/// Structured-log sink: one `tracing` event per record.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&mut self, record: AuditRecord) {
        if record.success {
            tracing::info!(
                target: "audit",
                at = %record.at,
                event = %record.event,
                vault_id = record.vault_id.as_deref().unwrap_or(""),
                success = true,
            );
        } else {
            tracing::warn!(
                target: "audit",
                at = %record.at,
                event = %record.event,
                vault_id = record.vault_id.as_deref().unwrap_or(""),
                success = false,
                code = record.code.as_deref().unwrap_or(""),
                error_id = record.error_id.as_deref().unwrap_or(""),
            );
        }
    }
}

/// Collects records in memory. Test support.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    pub records: Vec<AuditRecord>,
}

impl AuditSink for MemoryAuditSink {
    fn record(&mut self, record: AuditRecord) {
        self.records.push(record);
    }
}
