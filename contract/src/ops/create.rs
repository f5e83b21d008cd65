//! Vault creation handlers: `createVault` and `createTeamVault`.
//!
//! The flow is validation, signature, rate limit, manifest mint, metadata
//! normalization, insert. The manifest token must be minted before the
//! store mutation: if the insert then fails, the ledger holds a token no
//! committed vault references, which is recoverable; a committed vault
//! pointing at a token that was never minted is not.

use serde_json::{json, Value};

use crate::config::MANIFEST_PLACEHOLDER_URI;
use crate::crypto::verify::verify_request;
use crate::error::{ContractError, ErrorCode};
use crate::ops::preimage::create_vault_preimage;
use crate::ops::request::{optional_str, payload_object, require_str, signing_fields, OpKind};
use crate::ops::validate::{
    validate_address, validate_initial_authorized, validate_metadata_object, validate_salt,
};
use crate::ops::Dispatcher;
use crate::state::store::{NewVault, VaultStore};
use crate::state::types::{PasswordBackup, VaultType};

impl Dispatcher {
    pub(crate) async fn op_create_vault(
        &mut self,
        payload: &Value,
        round_key: &str,
        op: OpKind,
    ) -> Result<Value, ContractError> {
        payload_object(payload)?;

        let owner = require_str(payload, "owner")?;
        validate_address(owner, "owner")?;
        let salt = require_str(payload, "salt")?;
        validate_salt(salt)?;

        let vault_type = if op == OpKind::CreateTeamVault {
            VaultType::Team
        } else {
            VaultType::Individual
        };
        // A declared `type` must agree with the operation.
        if let Some(declared) = optional_str(payload, "type")? {
            if VaultType::parse(declared)? != vault_type {
                return Err(ContractError::new(
                    ErrorCode::InvalidVaultType,
                    format!("payload type {declared} does not match operation {}", op.name()),
                ));
            }
        }

        let metadata_value = payload.get("metadata").cloned().unwrap_or(Value::Null);
        let mut metadata = validate_metadata_object(&metadata_value)?;

        let initial_authorized = match payload.get("initialAuthorized") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => {
                if !vault_type.is_team() {
                    return Err(ContractError::invalid_input(
                        "initialAuthorized is only valid for team vaults",
                    ));
                }
                validate_initial_authorized(value)?
            }
        };

        let vault_id = VaultStore::vault_id_for(owner, salt);

        // A client-supplied metadata.vaultId must already match the id this
        // vault will get.
        if let Some(declared) = metadata.get("vaultId") {
            if declared.as_str() != Some(vault_id.as_str()) {
                return Err(ContractError::new(
                    ErrorCode::InvalidMetadata,
                    "metadata.vaultId does not match the derived vault id",
                ));
            }
        }
        if let Some(backup) = metadata.get("passwordBackup") {
            PasswordBackup::from_value(backup, &vault_id)?;
        }

        let (signer_key, signature) = signing_fields(payload)?;
        let preimage = create_vault_preimage(payload)?;
        verify_request(&preimage, signature, signer_key, owner)?;

        self.limiter.enforce(owner, round_key)?;

        let mint = self.adapter.mint(MANIFEST_PLACEHOLDER_URI, None).await?;

        // Normalize metadata after authentication: bind the id, default the
        // blob version, stamp the round.
        metadata.insert("vaultId".to_string(), Value::String(vault_id.clone()));
        metadata
            .entry("blobVersion".to_string())
            .or_insert_with(|| json!(1));
        metadata.insert("lastUpdated".to_string(), Value::String(round_key.to_string()));

        let vault = self.store.create_vault(NewVault {
            owner: owner.to_string(),
            salt: salt.to_string(),
            vault_type,
            metadata,
            created_at: round_key.to_string(),
            manifest_token_id: mint.token_id.clone(),
            authorized: initial_authorized,
            pending_invites: Vec::new(),
        })?;

        tracing::info!(
            vault_id = %vault.id,
            vault_type = vault.vault_type.as_str(),
            mint_mode = mint.mode.as_str(),
            "vault created"
        );

        let mut data = json!({
            "vaultId": vault.id,
            "owner": vault.owner,
            "createdAt": vault.created_at,
            "manifestTokenId": vault.manifest_token_id,
            "mintMode": mint.mode.as_str(),
        });
        if vault_type.is_team() {
            data["type"] = json!("team");
            data["authorizedCount"] = json!(vault.authorized.len());
        }
        Ok(data)
    }
}
