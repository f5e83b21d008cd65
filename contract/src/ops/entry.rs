//! Entry handlers: `addEntry`, `getEntry`, and the unsigned `getMyVaults`
//! listing.
//!
//! `addEntry` is the one place the encrypted blob crosses the boundary. It
//! is validated (base64, bounded, canonical) because it is part of the
//! signing preimage, but it is never persisted — the contract stores the
//! CID reference and mints a URI token pointing at `ipfs://{cid}` with the
//! vault owner as destination.

use serde_json::{json, Value};

use crate::crypto::verify::verify_request;
use crate::error::ContractError;
use crate::ops::preimage::{add_entry_preimage, to_value, GetEntryPreimage};
use crate::ops::request::{optional_index, optional_str, payload_object, require_str, signing_fields};
use crate::ops::validate::{
    validate_address, validate_cid, validate_encrypted_blob, validate_entry_metadata,
    validate_wrapped_keys,
};
use crate::ops::Dispatcher;
use crate::state::types::Entry;

impl Dispatcher {
    pub(crate) async fn op_add_entry(
        &mut self,
        payload: &Value,
        round_key: &str,
    ) -> Result<Value, ContractError> {
        payload_object(payload)?;

        let vault_id = require_str(payload, "vaultId")?;
        let actor = require_str(payload, "actor")?;
        validate_address(actor, "actor")?;

        let encrypted_blob = require_str(payload, "encryptedBlob")?;
        validate_encrypted_blob(encrypted_blob)?;
        let cid = require_str(payload, "cid")?;
        validate_cid(cid)?;

        let metadata_value = payload
            .get("entryMetadata")
            .ok_or_else(|| ContractError::invalid_input("missing field: entryMetadata"))?;
        let metadata = validate_entry_metadata(metadata_value)?;

        // A missing wrappedKeys array is signed and stored as empty.
        let wrapped_value = payload.get("wrappedKeys").cloned().unwrap_or(json!([]));
        let wrapped_keys = validate_wrapped_keys(&wrapped_value)?;

        let vault = self.store.vault(vault_id)?;
        if !vault.vault_type.is_team() && !wrapped_keys.is_empty() {
            return Err(ContractError::invalid_input(
                "wrapped keys are not allowed on individual vault entries",
            ));
        }
        if !vault.has_access(actor) {
            return Err(ContractError::unauthorized(format!(
                "actor {actor} has no write access to vault"
            )));
        }
        let owner = vault.owner.clone();

        let (signer_key, signature) = signing_fields(payload)?;
        let preimage = add_entry_preimage(
            vault_id,
            actor,
            encrypted_blob,
            cid,
            metadata_value,
            &wrapped_value,
        );
        verify_request(&preimage, signature, signer_key, actor)?;

        self.limiter.enforce(actor, round_key)?;

        // Ledger first, store second — see module docs in `ops::create`.
        let mint = self
            .adapter
            .mint(&format!("ipfs://{cid}"), Some(&owner))
            .await?;

        let entry = self.store.add_entry(
            vault_id,
            actor,
            Entry {
                token_id: mint.token_id.clone(),
                cid: cid.to_string(),
                metadata,
                wrapped_keys,
                created_at: round_key.to_string(),
            },
        )?;

        tracing::info!(vault_id, cid, mint_mode = mint.mode.as_str(), "entry added");

        Ok(json!({
            "vaultId": vault_id,
            "tokenId": entry.token_id,
            "cid": entry.cid,
            "createdAt": entry.created_at,
            "metadata": to_value(&entry.metadata)?,
            "mintMode": mint.mode.as_str(),
        }))
    }

    pub(crate) fn op_get_entry(&mut self, payload: &Value) -> Result<Value, ContractError> {
        payload_object(payload)?;

        let vault_id = require_str(payload, "vaultId")?;
        let actor = require_str(payload, "actor")?;
        validate_address(actor, "actor")?;

        let entry_index = optional_index(payload, "entryIndex")?;
        let token_id = optional_str(payload, "tokenId")?;
        if entry_index.is_none() && token_id.is_none() {
            return Err(ContractError::invalid_input(
                "either entryIndex or tokenId is required",
            ));
        }
        if let Some(token) = token_id {
            if token.is_empty() {
                return Err(ContractError::invalid_input("tokenId must not be empty"));
            }
        }

        let (signer_key, signature) = signing_fields(payload)?;
        let preimage = to_value(&GetEntryPreimage {
            vault_id,
            actor,
            entry_index,
            token_id,
        })?;
        verify_request(&preimage, signature, signer_key, actor)?;

        let (index, entry) = self.store.get_entry(
            vault_id,
            actor,
            entry_index.map(|i| i as usize),
            token_id,
        )?;

        let gateway_url = format!("{}/ipfs/{}", self.config.gateway_url, entry.cid);
        Ok(json!({
            "vaultId": vault_id,
            "entryIndex": index,
            "tokenId": entry.token_id,
            "cid": entry.cid,
            "createdAt": entry.created_at,
            "metadata": to_value(&entry.metadata)?,
            "gatewayUrl": gateway_url,
        }))
    }

    /// The one unsigned operation: list a caller's own vaults. Returns
    /// summaries only — no entry bodies, so there is nothing to protect
    /// beyond what the owner address already reveals.
    pub(crate) fn op_get_my_vaults(&mut self, payload: &Value) -> Result<Value, ContractError> {
        payload_object(payload)?;

        let owner = require_str(payload, "owner")?;
        validate_address(owner, "owner")?;
        let since = optional_str(payload, "since")?;

        let summaries = self.store.get_my_vaults(owner, since);
        Ok(json!({
            "owner": owner,
            "count": summaries.len(),
            "vaults": serde_json::to_value(&summaries)
                .map_err(|e| ContractError::unexpected(format!("summary serialization failed: {e}")))?,
        }))
    }
}
