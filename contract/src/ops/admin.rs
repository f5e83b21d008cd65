//! Owner administration: token listings, vault revocation, the state
//! digest, and password-backup metadata.
//!
//! Revocation is the one destructive operation in the protocol. For team
//! vaults it demands an explicit `confirm: true` — deleting a vault other
//! people depend on should never happen because a client defaulted a
//! boolean. The burn loop walks the exact token list `listVaultURITokens`
//! reports, manifest first, then deletes the vault record and every entry
//! with it.

use serde_json::{json, Value};

use crate::crypto::verify::verify_request;
use crate::error::{ContractError, ErrorCode};
use crate::ops::preimage::{
    to_value, PasswordBackupPreimage, RevokeVaultPreimage, VaultActionPreimage,
};
use crate::ops::request::{optional_bool, payload_object, require_str, signing_fields};
use crate::ops::Dispatcher;
use crate::state::types::PasswordBackup;

impl Dispatcher {
    pub(crate) fn op_list_vault_uri_tokens(
        &mut self,
        payload: &Value,
    ) -> Result<Value, ContractError> {
        payload_object(payload)?;

        let vault_id = require_str(payload, "vaultId")?;
        let owner = self.store.vault(vault_id)?.owner.clone();

        let (signer_key, signature) = signing_fields(payload)?;
        let preimage = to_value(&VaultActionPreimage {
            vault_id,
            action: "listVaultURITokens",
        })?;
        verify_request(&preimage, signature, signer_key, &owner)?;

        let tokens = self.store.list_vault_uri_tokens(vault_id, &owner)?;
        Ok(json!({
            "vaultId": vault_id,
            "count": tokens.len(),
            "tokens": tokens,
        }))
    }

    pub(crate) async fn op_revoke_vault(
        &mut self,
        payload: &Value,
        round_key: &str,
    ) -> Result<Value, ContractError> {
        payload_object(payload)?;

        let vault_id = require_str(payload, "vaultId")?;
        let confirm = optional_bool(payload, "confirm")?.unwrap_or(false);

        let vault = self.store.vault(vault_id)?;
        let owner = vault.owner.clone();
        let is_team = vault.vault_type.is_team();

        let (signer_key, signature) = signing_fields(payload)?;
        let preimage = to_value(&RevokeVaultPreimage {
            vault_id,
            confirm,
            action: "revokeVault",
        })?;
        verify_request(&preimage, signature, signer_key, &owner)?;

        if is_team && !confirm {
            return Err(ContractError::new(
                ErrorCode::ConfirmationRequired,
                "revoking a team vault requires confirm: true",
            ));
        }

        self.limiter.enforce(&owner, round_key)?;

        let tokens = self.store.list_vault_uri_tokens(vault_id, &owner)?;
        let mut burn_mode = None;
        for token in &tokens {
            let outcome = self.adapter.burn(token).await?;
            burn_mode.get_or_insert(outcome.mode);
        }

        self.store.delete_vault(vault_id, &owner)?;

        tracing::info!(vault_id, burned = tokens.len(), "vault revoked");
        Ok(json!({
            "vaultId": vault_id,
            "burnedTokens": tokens.len(),
            "burnMode": burn_mode.map(|m| m.as_str()),
        }))
    }

    /// Unsigned replica cross-check: the digest of the whole vault map.
    pub(crate) fn op_state_digest(&mut self) -> Result<Value, ContractError> {
        Ok(json!({
            "digest": self.store.digest()?,
            "vaultCount": self.store.len(),
        }))
    }

    pub(crate) fn op_add_password_backup(
        &mut self,
        payload: &Value,
        round_key: &str,
    ) -> Result<Value, ContractError> {
        payload_object(payload)?;

        let vault_id = require_str(payload, "vaultId")?;
        let owner = self.store.vault(vault_id)?.owner.clone();

        let backup_value = payload
            .get("passwordBackup")
            .ok_or_else(|| ContractError::invalid_input("missing field: passwordBackup"))?;
        PasswordBackup::from_value(backup_value, vault_id)?;

        let (signer_key, signature) = signing_fields(payload)?;
        let preimage = to_value(&PasswordBackupPreimage {
            vault_id,
            password_backup: backup_value,
            action: "addPasswordBackup",
        })?;
        verify_request(&preimage, signature, signer_key, &owner)?;

        self.limiter.enforce(&owner, round_key)?;

        // The envelope is stored verbatim — byte-equal on readback.
        self.store
            .set_password_backup(vault_id, &owner, backup_value.clone(), round_key)?;

        Ok(json!({
            "vaultId": vault_id,
            "lastUpdated": round_key,
        }))
    }

    pub(crate) fn op_remove_password_backup(
        &mut self,
        payload: &Value,
        round_key: &str,
    ) -> Result<Value, ContractError> {
        payload_object(payload)?;

        let vault_id = require_str(payload, "vaultId")?;
        let owner = self.store.vault(vault_id)?.owner.clone();

        let (signer_key, signature) = signing_fields(payload)?;
        let preimage = to_value(&VaultActionPreimage {
            vault_id,
            action: "removePasswordBackup",
        })?;
        verify_request(&preimage, signature, signer_key, &owner)?;

        self.limiter.enforce(&owner, round_key)?;
        let removed = self.store.clear_password_backup(vault_id, &owner, round_key)?;

        Ok(json!({
            "vaultId": vault_id,
            "removed": removed,
            "lastUpdated": round_key,
        }))
    }

    pub(crate) fn op_get_vault_metadata(
        &mut self,
        payload: &Value,
    ) -> Result<Value, ContractError> {
        payload_object(payload)?;

        let vault_id = require_str(payload, "vaultId")?;
        let owner = self.store.vault(vault_id)?.owner.clone();

        let (signer_key, signature) = signing_fields(payload)?;
        let preimage = to_value(&VaultActionPreimage {
            vault_id,
            action: "getVaultMetadata",
        })?;
        verify_request(&preimage, signature, signer_key, &owner)?;

        let metadata = self.store.get_vault_metadata(vault_id, &owner)?;
        Ok(json!({
            "vaultId": vault_id,
            "metadata": Value::Object(metadata.clone()),
        }))
    }
}
