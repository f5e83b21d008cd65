//! # Ledger Collaborator Traits
//!
//! The seams between the contract and the ledger. The core never talks to
//! a network itself — it is handed a [`LedgerClient`] (transaction autofill
//! and submission) and zero or more [`LedgerSigner`]s (per-party signing
//! blobs for multi-signed transactions), and stays agnostic to how either
//! is implemented.
//!
//! Replica discipline: either every replica is wired with a real client and
//! the same signer set, or none is. A cluster where some replicas submit
//! and others simulate has already diverged.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ContractError;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Minimal ledger surface the token adapter needs.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Fill in sequence numbers, fees, and network fields on a transaction.
    async fn autofill(&self, tx: Value) -> Result<Value, ContractError>;

    /// Submit a signed transaction blob and wait for validation. The result
    /// carries `result.hash` and, for URI-token mints,
    /// `result.meta.uritoken_id`.
    async fn submit_and_wait(&self, tx_blob: &str) -> Result<Value, ContractError>;

    /// Query account info for an address.
    async fn account_info(&self, account: &str) -> Result<Value, ContractError>;
}

/// One signing party in a multi-signed submission.
#[async_trait]
pub trait LedgerSigner: Send + Sync {
    /// Sign a transaction, returning the signed blob. `multi` selects the
    /// multi-signature signing scheme; the adapter always passes `true`.
    async fn sign(&self, tx: &Value, multi: bool) -> Result<SignedBlob, ContractError>;
}

/// A signed transaction blob produced by one signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedBlob {
    pub tx_blob: String,
}

/// Combine per-signer blobs into one multi-signed blob.
///
/// Blobs are sorted before joining so the combined blob is independent of
/// signer iteration order — the submission must be byte-identical on every
/// replica.
pub fn multisign(blobs: &[SignedBlob]) -> Result<String, ContractError> {
    if blobs.is_empty() {
        return Err(ContractError::unexpected("multisign requires at least one blob"));
    }
    let mut parts: Vec<&str> = blobs.iter().map(|b| b.tx_blob.as_str()).collect();
    parts.sort_unstable();
    Ok(parts.join(":"))
}

// ---------------------------------------------------------------------------
// In-memory ledger (dev mode & tests)
// ---------------------------------------------------------------------------

/// A local ledger stand-in: autofill is the identity, submission "validates"
/// instantly and derives the hash and token id from the blob contents.
/// Deterministic by construction, which is exactly what dev-mode replicas
/// need.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    /// When set, every submission fails — used to exercise the adapter's
    /// fallback paths.
    pub fail_submissions: bool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_submissions: true,
        }
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn autofill(&self, mut tx: Value) -> Result<Value, ContractError> {
        if let Some(obj) = tx.as_object_mut() {
            obj.insert("Sequence".to_string(), Value::from(1));
            obj.insert("Fee".to_string(), Value::from("12"));
        }
        Ok(tx)
    }

    async fn submit_and_wait(&self, tx_blob: &str) -> Result<Value, ContractError> {
        if self.fail_submissions {
            return Err(ContractError::new(
                crate::error::ErrorCode::XrplSubmissionFailed,
                "ledger rejected submission",
            ));
        }
        let hash = crate::canon::sha256_hex(tx_blob.as_bytes()).to_uppercase();
        let token_id =
            crate::canon::sha256_hex(format!("uritoken:{tx_blob}").as_bytes()).to_uppercase();
        Ok(serde_json::json!({
            "result": {
                "hash": hash,
                "meta": { "uritoken_id": token_id }
            }
        }))
    }

    async fn account_info(&self, account: &str) -> Result<Value, ContractError> {
        Ok(serde_json::json!({
            "result": { "account_data": { "Account": account, "Sequence": 1 } }
        }))
    }
}

/// A signer whose blob is a digest over the transaction and a signer tag.
/// Stands in for a real keypair signer in dev mode and tests.
#[derive(Debug, Clone)]
pub struct MemorySigner {
    pub tag: String,
}

impl MemorySigner {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }
}

#[async_trait]
impl LedgerSigner for MemorySigner {
    async fn sign(&self, tx: &Value, multi: bool) -> Result<SignedBlob, ContractError> {
        let canonical = crate::canon::canonical_string(tx)?;
        let blob = crate::canon::sha256_hex(
            format!("{}:{}:{}", self.tag, multi, canonical).as_bytes(),
        );
        Ok(SignedBlob { tx_blob: blob })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_ledger_autofill_adds_fields() {
        let ledger = MemoryLedger::new();
        let tx = ledger.autofill(json!({"TransactionType": "URITokenMint"})).await.unwrap();
        assert_eq!(tx["Sequence"], json!(1));
        assert_eq!(tx["Fee"], json!("12"));
    }

    #[tokio::test]
    async fn memory_ledger_submission_is_deterministic() {
        let ledger = MemoryLedger::new();
        let a = ledger.submit_and_wait("blob").await.unwrap();
        let b = ledger.submit_and_wait("blob").await.unwrap();
        assert_eq!(a, b);
        assert!(a["result"]["meta"]["uritoken_id"].is_string());
    }

    #[tokio::test]
    async fn failing_ledger_rejects() {
        let ledger = MemoryLedger::failing();
        assert!(ledger.submit_and_wait("blob").await.is_err());
    }

    #[tokio::test]
    async fn multisign_is_order_independent() {
        let signer_a = MemorySigner::new("a");
        let signer_b = MemorySigner::new("b");
        let tx = json!({"TransactionType": "URITokenMint"});

        let blob_a = signer_a.sign(&tx, true).await.unwrap();
        let blob_b = signer_b.sign(&tx, true).await.unwrap();

        let combined_ab = multisign(&[blob_a.clone(), blob_b.clone()]).unwrap();
        let combined_ba = multisign(&[blob_b, blob_a]).unwrap();
        assert_eq!(combined_ab, combined_ba);
    }

    #[test]
    fn multisign_rejects_empty() {
        assert!(multisign(&[]).is_err());
    }
}
