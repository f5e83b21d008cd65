//! Team membership handlers: invite → accept → revoke/remove, plus the
//! owner's pending-invite listing. All of these are gated behind the
//! team-mode flag by the dispatcher before they run.
//!
//! Authentication asymmetry worth knowing: invite/revoke/remove/getPending
//! bind the signature to the *vault owner* — anyone else signing those
//! payloads fails verification, which is how an attacker "acting on the
//! owner's behalf" is rejected. `acceptInvite` binds to the *signer's own
//! address* (derived from their public key); authorization then comes from
//! that address holding a pending invite.

use serde_json::{json, Value};

use crate::crypto::address::derive_address;
use crate::crypto::verify::verify_request;
use crate::error::ContractError;
use crate::ops::preimage::{
    to_value, InvitePreimage, RemoveMemberPreimage, RevokeInvitePreimage, VaultActionPreimage,
};
use crate::ops::request::{payload_object, require_str, signing_fields};
use crate::ops::validate::validate_address;
use crate::ops::Dispatcher;

impl Dispatcher {
    pub(crate) fn op_invite_to_vault(
        &mut self,
        payload: &Value,
        round_key: &str,
    ) -> Result<Value, ContractError> {
        payload_object(payload)?;

        let vault_id = require_str(payload, "vaultId")?;
        let invitee = require_str(payload, "invitee")?;
        validate_address(invitee, "invitee")?;

        let owner = self.store.vault(vault_id)?.owner.clone();

        let (signer_key, signature) = signing_fields(payload)?;
        let preimage = to_value(&InvitePreimage {
            vault_id,
            invitee,
            action: "inviteToVault",
        })?;
        verify_request(&preimage, signature, signer_key, &owner)?;

        self.limiter.enforce(&owner, round_key)?;
        self.store
            .add_pending_invite(vault_id, &owner, invitee, round_key)?;

        tracing::info!(vault_id, invitee, "member invited");
        Ok(json!({
            "vaultId": vault_id,
            "invitee": invitee,
            "invitedBy": owner,
            "invitedAt": round_key,
        }))
    }

    pub(crate) fn op_accept_invite(
        &mut self,
        payload: &Value,
        round_key: &str,
    ) -> Result<Value, ContractError> {
        payload_object(payload)?;

        let vault_id = require_str(payload, "vaultId")?;
        self.store.vault(vault_id)?;

        // The actor is whoever actually signed: their address falls out of
        // their own public key.
        let (signer_key, signature) = signing_fields(payload)?;
        let actor = derive_address(signer_key)?;

        let preimage = to_value(&VaultActionPreimage {
            vault_id,
            action: "acceptInvite",
        })?;
        verify_request(&preimage, signature, signer_key, &actor)?;

        self.limiter.enforce(&actor, round_key)?;
        self.store.accept_pending_invite(vault_id, &actor)?;

        let authorized_count = self.store.vault(vault_id)?.authorized.len();
        tracing::info!(vault_id, member = %actor, "invite accepted");
        Ok(json!({
            "vaultId": vault_id,
            "member": actor,
            "authorizedCount": authorized_count,
        }))
    }

    pub(crate) fn op_revoke_invite(
        &mut self,
        payload: &Value,
        round_key: &str,
    ) -> Result<Value, ContractError> {
        payload_object(payload)?;

        let vault_id = require_str(payload, "vaultId")?;
        let pending_address = require_str(payload, "pendingAddress")?;
        validate_address(pending_address, "pendingAddress")?;

        let owner = self.store.vault(vault_id)?.owner.clone();

        let (signer_key, signature) = signing_fields(payload)?;
        let preimage = to_value(&RevokeInvitePreimage {
            vault_id,
            pending_address,
            action: "revokeInvite",
        })?;
        verify_request(&preimage, signature, signer_key, &owner)?;

        self.limiter.enforce(&owner, round_key)?;
        self.store
            .revoke_pending_invite(vault_id, &owner, pending_address)?;

        tracing::info!(vault_id, pending_address, "invite revoked");
        Ok(json!({
            "vaultId": vault_id,
            "pendingAddress": pending_address,
        }))
    }

    pub(crate) fn op_remove_member(
        &mut self,
        payload: &Value,
        round_key: &str,
    ) -> Result<Value, ContractError> {
        payload_object(payload)?;

        let vault_id = require_str(payload, "vaultId")?;
        let member = require_str(payload, "memberToRemove")?;
        validate_address(member, "memberToRemove")?;

        let owner = self.store.vault(vault_id)?.owner.clone();

        let (signer_key, signature) = signing_fields(payload)?;
        let preimage = to_value(&RemoveMemberPreimage {
            vault_id,
            member_to_remove: member,
            action: "removeMember",
        })?;
        verify_request(&preimage, signature, signer_key, &owner)?;

        self.limiter.enforce(&owner, round_key)?;
        self.store
            .remove_authorized_member(vault_id, &owner, member)?;

        let authorized_count = self.store.vault(vault_id)?.authorized.len();
        tracing::info!(vault_id, member, "member removed");
        Ok(json!({
            "vaultId": vault_id,
            "removed": member,
            "authorizedCount": authorized_count,
        }))
    }

    /// Signed read: the owner's view of outstanding invites.
    pub(crate) fn op_get_pending_invites(
        &mut self,
        payload: &Value,
    ) -> Result<Value, ContractError> {
        payload_object(payload)?;

        let vault_id = require_str(payload, "vaultId")?;
        let vault = self.store.vault(vault_id)?;
        let owner = vault.owner.clone();

        let (signer_key, signature) = signing_fields(payload)?;
        let preimage = to_value(&VaultActionPreimage {
            vault_id,
            action: "getPendingInvites",
        })?;
        verify_request(&preimage, signature, signer_key, &owner)?;

        let vault = self.store.vault(vault_id)?;
        Ok(json!({
            "vaultId": vault_id,
            "count": vault.pending_invites.len(),
            "pendingInvites": serde_json::to_value(&vault.pending_invites)
                .map_err(|e| ContractError::unexpected(format!("invite serialization failed: {e}")))?,
        }))
    }
}
