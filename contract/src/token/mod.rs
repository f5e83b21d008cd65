//! # Token Adapter
//!
//! Builds, signs, and submits the ledger's URI-token mint and burn
//! transactions — or simulates them deterministically when no ledger is
//! wired in. Every vault has a manifest token; every entry gets its own
//! token pointing at the entry's IPFS content.
//!
//! Three outcome modes, surfaced to clients as `mintMode`/`burnMode`:
//!
//! - `simulated` — no ledger client or no signers. The token id is a pure
//!   function of `(issuer, owner, uri)`, so every replica computes the same
//!   id without touching a network.
//! - `submitted` — the real thing: autofill, per-signer blobs, multisign,
//!   submit-and-wait, token id from the validated transaction metadata.
//! - `simulated_fallback` — submission failed and the dev-fallback flag is
//!   on; the deterministic id is returned instead of failing the operation.
//!
//! The adapter performs its work *before* the corresponding state mutation
//! in create/add flows. A mint that succeeds ahead of a state-insert
//! failure is acceptable — the ledger is the source of truth for tokens and
//! the contract never committed a record referencing it.

pub mod ledger;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use crate::canon::sha256_hex;
use crate::config::{TX_TYPE_URITOKEN_BURN, TX_TYPE_URITOKEN_MINT, URITOKEN_FLAG_BURNABLE};
use crate::error::{ContractError, ErrorCode};

pub use ledger::{multisign, LedgerClient, LedgerSigner, MemoryLedger, MemorySigner, SignedBlob};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// How a mint/burn was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenMode {
    Simulated,
    Submitted,
    SimulatedFallback,
}

impl TokenMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenMode::Simulated => "simulated",
            TokenMode::Submitted => "submitted",
            TokenMode::SimulatedFallback => "simulated_fallback",
        }
    }
}

/// Result of a mint or burn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOutcome {
    /// The minted (or burned) token identifier. Opaque to consumers:
    /// simulated ids are 64-hex SHA-256 strings, real ledger ids can be
    /// anything the ledger says.
    pub token_id: String,
    pub mode: TokenMode,
    /// Transaction hash for submitted outcomes.
    pub tx_hash: Option<String>,
}

// ---------------------------------------------------------------------------
// TokenAdapter
// ---------------------------------------------------------------------------

/// The contract's gateway to URI-token operations.
pub struct TokenAdapter {
    issuer: String,
    client: Option<Arc<dyn LedgerClient>>,
    signers: Vec<Arc<dyn LedgerSigner>>,
    dev_fallback: bool,
}

impl TokenAdapter {
    /// A purely simulated adapter — no ledger, deterministic ids.
    pub fn simulated(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            client: None,
            signers: Vec::new(),
            dev_fallback: false,
        }
    }

    /// An adapter wired to a real (or in-memory) ledger with signing
    /// parties. `dev_fallback` selects simulated ids over hard failure when
    /// a submission is rejected.
    pub fn with_ledger(
        issuer: impl Into<String>,
        client: Arc<dyn LedgerClient>,
        signers: Vec<Arc<dyn LedgerSigner>>,
        dev_fallback: bool,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            client: Some(client),
            signers,
            dev_fallback,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Deterministic simulated token id:
    /// `SHA-256(issuer + ":" + (owner or "") + ":" + uri)`.
    fn simulated_token_id(&self, owner: Option<&str>, uri: &str) -> String {
        sha256_hex(format!("{}:{}:{}", self.issuer, owner.unwrap_or(""), uri).as_bytes())
    }

    /// Mint a URI token. `owner` becomes the transaction destination when
    /// present (entry tokens go to the vault owner; manifest tokens stay
    /// with the issuer).
    pub async fn mint(
        &self,
        uri: &str,
        owner: Option<&str>,
    ) -> Result<TokenOutcome, ContractError> {
        let (Some(client), false) = (&self.client, self.signers.is_empty()) else {
            return Ok(TokenOutcome {
                token_id: self.simulated_token_id(owner, uri),
                mode: TokenMode::Simulated,
                tx_hash: None,
            });
        };

        let mut tx = json!({
            "TransactionType": TX_TYPE_URITOKEN_MINT,
            "Account": self.issuer,
            "URI": hex::encode_upper(uri.as_bytes()),
            "Flags": URITOKEN_FLAG_BURNABLE,
        });
        if let Some(destination) = owner {
            tx["Destination"] = Value::String(destination.to_string());
        }

        match self.submit(client, tx).await {
            Ok((result, tx_hash)) => {
                let token_id = result
                    .pointer("/result/meta/uritoken_id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        ContractError::new(
                            ErrorCode::XrplSubmissionFailed,
                            "ledger result missing uritoken_id",
                        )
                    })?
                    .to_string();
                Ok(TokenOutcome {
                    token_id,
                    mode: TokenMode::Submitted,
                    tx_hash: Some(tx_hash),
                })
            }
            Err(err) => self.fallback(err, self.simulated_token_id(owner, uri)),
        }
    }

    /// Burn a URI token held by the issuer.
    pub async fn burn(&self, token_id: &str) -> Result<TokenOutcome, ContractError> {
        let (Some(client), false) = (&self.client, self.signers.is_empty()) else {
            return Ok(TokenOutcome {
                token_id: token_id.to_string(),
                mode: TokenMode::Simulated,
                tx_hash: None,
            });
        };

        let tx = json!({
            "TransactionType": TX_TYPE_URITOKEN_BURN,
            "Account": self.issuer,
            "URITokenID": token_id,
        });

        match self.submit(client, tx).await {
            Ok((_, tx_hash)) => Ok(TokenOutcome {
                token_id: token_id.to_string(),
                mode: TokenMode::Submitted,
                tx_hash: Some(tx_hash),
            }),
            Err(err) => self.fallback(err, token_id.to_string()),
        }
    }

    /// Autofill, collect per-signer blobs, multisign, submit-and-wait.
    async fn submit(
        &self,
        client: &Arc<dyn LedgerClient>,
        tx: Value,
    ) -> Result<(Value, String), ContractError> {
        let filled = client.autofill(tx).await?;

        let mut blobs = Vec::with_capacity(self.signers.len());
        for signer in &self.signers {
            blobs.push(signer.sign(&filled, true).await?);
        }
        let combined = multisign(&blobs)?;

        let result = client.submit_and_wait(&combined).await?;
        let tx_hash = result
            .pointer("/result/hash")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ContractError::new(
                    ErrorCode::XrplSubmissionFailed,
                    "ledger result missing transaction hash",
                )
            })?
            .to_string();
        Ok((result, tx_hash))
    }

    /// Apply the dev-fallback policy to a failed submission.
    fn fallback(
        &self,
        err: ContractError,
        simulated_id: String,
    ) -> Result<TokenOutcome, ContractError> {
        if self.dev_fallback {
            tracing::warn!(error = %err, "ledger submission failed, using simulated fallback");
            return Ok(TokenOutcome {
                token_id: simulated_id,
                mode: TokenMode::SimulatedFallback,
                tx_hash: None,
            });
        }
        Err(ContractError::new(
            ErrorCode::XrplSubmissionFailed,
            format!("ledger submission failed: {}", err.message),
        ))
    }
}
