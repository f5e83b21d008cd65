//! # Operation Dispatcher
//!
//! The outer boundary of the contract. A request comes in as
//! `{type, payload}`; the dispatcher classifies it, runs the per-operation
//! handler (validate → authenticate → rate-limit → ledger work → state
//! mutation), persists the store after successful mutations — rolling the
//! mutation back if the write fails — emits an audit record either way, and
//! shapes the result into the wire envelope:
//!
//! - success: `{ok: true, operation, data}`
//! - failure: `{ok: false, error, code, errorId}`
//!
//! Handlers live in sibling modules by family (`create`, `entry`, `team`,
//! `manifest`, `admin`) as `impl Dispatcher` blocks. Each one fails fast
//! with a [`ContractError`]; this module is the only place errors become
//! envelopes and the only place audit records are written, so neither can
//! happen twice.
//!
//! The dispatcher owns every piece of process-wide mutable state — the
//! store, the rate limiter, the token adapter — as plain fields. The
//! runtime bootstrap constructs one `Dispatcher` and feeds it the round's
//! requests one at a time; there is no ambient global anywhere.

pub mod audit;
pub mod preimage;
pub mod ratelimit;
pub mod request;
pub mod validate;

mod admin;
mod create;
mod entry;
mod manifest;
mod team;

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;

use crate::config::DEFAULT_STATE_FILE;
use crate::error::{ContractError, ErrorCode};
use crate::state::persist;
use crate::state::store::VaultStore;
use crate::token::TokenAdapter;

pub use audit::{AuditRecord, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use ratelimit::RateLimiter;
pub use request::{OpKind, Request};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Process-wide startup configuration for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Where the store is mirrored after every mutation.
    pub state_file: PathBuf,
    /// Base URL composed into `gatewayUrl` response fields. May be empty.
    pub gateway_url: String,
    /// Enables the team operation family.
    pub team_mode: bool,
    /// Manifest updates keep the token and return `mutable_stub` instead
    /// of burn/remint.
    pub mutable_uri_tokens: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            gateway_url: String::new(),
            team_mode: false,
            mutable_uri_tokens: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// The wire response. Exactly one of the success or failure field sets is
/// populated, keyed by `ok`.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(rename = "errorId", skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,
}

impl Response {
    pub fn success(operation: &str, data: Value) -> Self {
        Self {
            ok: true,
            operation: Some(operation.to_string()),
            data: Some(data),
            error: None,
            code: None,
            error_id: None,
        }
    }

    pub fn failure(error: &ContractError) -> Self {
        Self {
            ok: false,
            operation: None,
            data: None,
            error: Some(error.message.clone()),
            code: Some(error.code),
            error_id: Some(error.error_id()),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Owns the store, the rate limiter, the token adapter, and the audit sink;
/// processes one request at a time to completion.
pub struct Dispatcher {
    pub(crate) store: VaultStore,
    pub(crate) limiter: RateLimiter,
    pub(crate) adapter: TokenAdapter,
    pub(crate) audit: Box<dyn AuditSink>,
    pub(crate) config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(store: VaultStore, adapter: TokenAdapter, config: DispatcherConfig) -> Self {
        Self {
            store,
            limiter: RateLimiter::new(),
            adapter,
            audit: Box::new(TracingAuditSink),
            config,
        }
    }

    /// Replace the audit sink (tests, custom routing).
    pub fn with_audit_sink(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    pub fn store(&self) -> &VaultStore {
        &self.store
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Process one request within a round. Never returns an error — every
    /// failure becomes a failure envelope plus an audit record.
    pub async fn handle(&mut self, request: &Request, round_key: &str) -> Response {
        let vault_id = AuditRecord::vault_id_from(&request.payload);

        match self.dispatch(request, round_key).await {
            Ok((op, data)) => {
                self.audit
                    .record(AuditRecord::success(round_key, op.name(), vault_id));
                Response::success(op.name(), data)
            }
            Err(err) => {
                tracing::debug!(
                    operation = %request.kind,
                    code = %err.code,
                    "operation failed: {}", err.message
                );
                self.audit
                    .record(AuditRecord::failure(round_key, &request.kind, vault_id, &err));
                Response::failure(&err)
            }
        }
    }

    async fn dispatch(
        &mut self,
        request: &Request,
        round_key: &str,
    ) -> Result<(OpKind, Value), ContractError> {
        let op = OpKind::parse(&request.kind)?;

        if op.requires_team_mode() && !self.config.team_mode {
            return Err(ContractError::new(
                ErrorCode::TeamModeDisabled,
                "team vault operations are disabled on this deployment",
            ));
        }

        // Checkpoint ahead of any mutation. If the persistence write below
        // fails, the handler's in-memory mutation is restored from this —
        // a failure envelope must describe a state that actually exists on
        // the replica.
        let checkpoint = if op.is_mutating() {
            Some(self.store.snapshot())
        } else {
            None
        };

        let payload = &request.payload;
        let data = match op {
            OpKind::CreateVault | OpKind::CreateTeamVault => {
                self.op_create_vault(payload, round_key, op).await?
            }
            OpKind::AddEntry => self.op_add_entry(payload, round_key).await?,
            OpKind::GetEntry => self.op_get_entry(payload)?,
            OpKind::GetMyVaults => self.op_get_my_vaults(payload)?,
            OpKind::InviteToVault => self.op_invite_to_vault(payload, round_key)?,
            OpKind::AcceptInvite => self.op_accept_invite(payload, round_key)?,
            OpKind::RevokeInvite => self.op_revoke_invite(payload, round_key)?,
            OpKind::RemoveMember => self.op_remove_member(payload, round_key)?,
            OpKind::GetPendingInvites => self.op_get_pending_invites(payload)?,
            OpKind::UpdateVaultManifest => {
                self.op_update_vault_manifest(payload, round_key).await?
            }
            OpKind::ListVaultUriTokens => self.op_list_vault_uri_tokens(payload)?,
            OpKind::RevokeVault => self.op_revoke_vault(payload, round_key).await?,
            OpKind::StateDigest => self.op_state_digest()?,
            OpKind::AddPasswordBackup => self.op_add_password_backup(payload, round_key)?,
            OpKind::RemovePasswordBackup => self.op_remove_password_backup(payload, round_key)?,
            OpKind::GetVaultMetadata => self.op_get_vault_metadata(payload)?,
        };

        // Persistence is the last step: only fully validated, fully applied
        // mutations reach the file. A failed write rolls the store back to
        // the checkpoint so memory and disk never disagree about an
        // operation the client was told failed. A ledger mint that already
        // happened stays, as with every failure after the adapter runs —
        // the ledger is the source of truth for tokens.
        if op.is_mutating() {
            if let Err(err) = persist::save(&self.config.state_file, &self.store) {
                if let Some(vaults) = checkpoint {
                    self.store = VaultStore::from_vaults(vaults);
                }
                return Err(ContractError::unexpected(format!(
                    "state persistence failed: {err}"
                )));
            }
        }

        Ok((op, data))
    }
}
