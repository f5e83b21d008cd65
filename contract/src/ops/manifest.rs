//! Manifest rotation: `updateVaultManifest`.
//!
//! Two behaviors behind one operation, selected by the mutable-URI-token
//! feature flag:
//!
//! - flag on (`mutable_stub`): the ledger supports mutating a token's URI
//!   in place, so the contract keeps the manifest token id untouched and
//!   leaves the actual URI update to the ledger layer.
//! - flag off (`burn_remint`): the classic rotation — burn the current
//!   manifest token, mint a fresh one carrying the new URI, and swap the
//!   id in the vault record.

use serde_json::{json, Value};

use crate::config::MANIFEST_PLACEHOLDER_URI;
use crate::crypto::verify::verify_request;
use crate::error::{ContractError, ErrorCode};
use crate::ops::preimage::{to_value, UpdateManifestPreimage};
use crate::ops::request::{optional_str, payload_object, require_str, signing_fields};
use crate::ops::validate::validate_hex;
use crate::ops::Dispatcher;

impl Dispatcher {
    pub(crate) async fn op_update_vault_manifest(
        &mut self,
        payload: &Value,
        round_key: &str,
    ) -> Result<Value, ContractError> {
        payload_object(payload)?;

        let vault_id = require_str(payload, "vaultId")?;
        let new_uri = optional_str(payload, "newUri")?;
        let new_blob_hex = optional_str(payload, "newBlobHex")?;
        if new_uri.is_none() && new_blob_hex.is_none() {
            return Err(ContractError::invalid_input(
                "at least one of newUri or newBlobHex is required",
            ));
        }
        if let Some(blob_hex) = new_blob_hex {
            validate_hex(blob_hex, "newBlobHex")?;
        }

        let vault = self.store.vault(vault_id)?;
        if !vault.vault_type.is_team() {
            return Err(ContractError::new(
                ErrorCode::InvalidVaultType,
                "manifest rotation applies to team vaults only",
            ));
        }
        let owner = vault.owner.clone();
        let current_token = vault.manifest_token_id.clone();

        let (signer_key, signature) = signing_fields(payload)?;
        let preimage = to_value(&UpdateManifestPreimage {
            vault_id,
            new_uri,
            new_blob_hex,
            action: "updateVaultManifest",
        })?;
        verify_request(&preimage, signature, signer_key, &owner)?;

        self.limiter.enforce(&owner, round_key)?;

        if self.config.mutable_uri_tokens {
            // The token id survives; the URI mutation happens on-ledger.
            tracing::info!(vault_id, "manifest updated (mutable stub)");
            return Ok(json!({
                "vaultId": vault_id,
                "manifestTokenId": current_token,
                "mode": "mutable_stub",
            }));
        }

        let burn = self.adapter.burn(&current_token).await?;
        let mint_uri = new_uri.unwrap_or(MANIFEST_PLACEHOLDER_URI);
        let mint = self.adapter.mint(mint_uri, None).await?;
        self.store
            .set_manifest_token(vault_id, &owner, mint.token_id.clone())?;

        tracing::info!(
            vault_id,
            burn_mode = burn.mode.as_str(),
            mint_mode = mint.mode.as_str(),
            "manifest rotated"
        );
        Ok(json!({
            "vaultId": vault_id,
            "manifestTokenId": mint.token_id,
            "mode": "burn_remint",
            "burnMode": burn.mode.as_str(),
            "mintMode": mint.mode.as_str(),
        }))
    }
}
