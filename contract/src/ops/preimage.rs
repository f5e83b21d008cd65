//! # Signing Preimages
//!
//! One record per signed operation, shaped byte-for-byte like what the
//! client library hashes and signs. The canonical codec sorts keys, so only
//! the *set* of fields and their values matter — but that set is load
//! bearing: an optional selector the client did not provide appears as the
//! null sentinel, never as a missing key, or client and contract hash
//! different bytes and every signature fails.
//!
//! Create and addEntry preimages are built from the raw payload (the exact
//! values the client sent, signing fields stripped) rather than from
//! normalized state — normalization happens *after* authentication.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ContractError;

/// Fields stripped from a payload to obtain its signing preimage.
const SIGNING_FIELDS: [&str; 2] = ["signature", "signerPublicKey"];

/// Preimage for createVault / createTeamVault: the payload mapping minus
/// the signing fields. The caller has already rejected `initialAuthorized`
/// on individual creates, so inclusion-only-for-team falls out naturally.
pub fn create_vault_preimage(payload: &Value) -> Result<Value, ContractError> {
    let object = payload
        .as_object()
        .ok_or_else(|| ContractError::invalid_input("payload must be an object"))?;
    let mut preimage = object.clone();
    for field in SIGNING_FIELDS {
        preimage.remove(field);
    }
    Ok(Value::Object(preimage))
}

/// Preimage for addEntry. `entry_metadata` and `wrapped_keys` are the raw
/// client-provided values; a missing `wrappedKeys` is signed as `[]`.
pub fn add_entry_preimage(
    vault_id: &str,
    actor: &str,
    encrypted_blob: &str,
    cid: &str,
    entry_metadata: &Value,
    wrapped_keys: &Value,
) -> Value {
    let mut preimage = Map::new();
    preimage.insert("vaultId".into(), Value::String(vault_id.into()));
    preimage.insert("actor".into(), Value::String(actor.into()));
    preimage.insert("encryptedBlob".into(), Value::String(encrypted_blob.into()));
    preimage.insert("cid".into(), Value::String(cid.into()));
    preimage.insert("entryMetadata".into(), entry_metadata.clone());
    preimage.insert("wrappedKeys".into(), wrapped_keys.clone());
    Value::Object(preimage)
}

/// Preimage for getEntry. The unused selector is the null sentinel.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEntryPreimage<'a> {
    pub vault_id: &'a str,
    pub actor: &'a str,
    pub entry_index: Option<u64>,
    pub token_id: Option<&'a str>,
}

/// Preimage for inviteToVault.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitePreimage<'a> {
    pub vault_id: &'a str,
    pub invitee: &'a str,
    pub action: &'a str,
}

/// Preimage for acceptInvite and the other single-vault team actions
/// (getPendingInvites shares the shape with a different action tag).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultActionPreimage<'a> {
    pub vault_id: &'a str,
    pub action: &'a str,
}

/// Preimage for revokeInvite.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeInvitePreimage<'a> {
    pub vault_id: &'a str,
    pub pending_address: &'a str,
    pub action: &'a str,
}

/// Preimage for removeMember.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveMemberPreimage<'a> {
    pub vault_id: &'a str,
    pub member_to_remove: &'a str,
    pub action: &'a str,
}

/// Preimage for updateVaultManifest. Absent inputs sign as null.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateManifestPreimage<'a> {
    pub vault_id: &'a str,
    pub new_uri: Option<&'a str>,
    pub new_blob_hex: Option<&'a str>,
    pub action: &'a str,
}

/// Preimage for revokeVault.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeVaultPreimage<'a> {
    pub vault_id: &'a str,
    pub confirm: bool,
    pub action: &'a str,
}

/// Preimage for addPasswordBackup: the envelope rides along verbatim.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordBackupPreimage<'a> {
    pub vault_id: &'a str,
    pub password_backup: &'a Value,
    pub action: &'a str,
}

/// Serialize a preimage record to the JSON value the verifier hashes.
pub fn to_value<T: Serialize>(preimage: &T) -> Result<Value, ContractError> {
    serde_json::to_value(preimage)
        .map_err(|e| ContractError::unexpected(format!("preimage serialization failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::canonical_string;
    use serde_json::json;

    #[test]
    fn create_preimage_strips_signing_fields_only() {
        let payload = json!({
            "type": "individual",
            "owner": "rOwner",
            "salt": "aabbccddeeff0011",
            "metadata": {},
            "signerPublicKey": "ED00",
            "signature": "abcd",
        });
        let preimage = create_vault_preimage(&payload).unwrap();
        assert_eq!(
            preimage,
            json!({
                "type": "individual",
                "owner": "rOwner",
                "salt": "aabbccddeeff0011",
                "metadata": {},
            })
        );
    }

    #[test]
    fn get_entry_preimage_null_sentinels() {
        let preimage = to_value(&GetEntryPreimage {
            vault_id: "v1",
            actor: "rActor",
            entry_index: Some(0),
            token_id: None,
        })
        .unwrap();
        assert_eq!(
            canonical_string(&preimage).unwrap(),
            "{\"actor\":\"rActor\",\"entryIndex\":0,\"tokenId\":null,\"vaultId\":\"v1\"}"
        );
    }

    #[test]
    fn invite_preimage_exact_bytes() {
        let preimage = to_value(&InvitePreimage {
            vault_id: "v1",
            invitee: "rMember",
            action: "inviteToVault",
        })
        .unwrap();
        assert_eq!(
            canonical_string(&preimage).unwrap(),
            "{\"action\":\"inviteToVault\",\"invitee\":\"rMember\",\"vaultId\":\"v1\"}"
        );
    }

    #[test]
    fn accept_preimage_exact_bytes() {
        let preimage = to_value(&VaultActionPreimage {
            vault_id: "v1",
            action: "acceptInvite",
        })
        .unwrap();
        assert_eq!(
            canonical_string(&preimage).unwrap(),
            "{\"action\":\"acceptInvite\",\"vaultId\":\"v1\"}"
        );
    }

    #[test]
    fn update_manifest_preimage_null_sentinels() {
        let preimage = to_value(&UpdateManifestPreimage {
            vault_id: "v1",
            new_uri: Some("ipfs://new"),
            new_blob_hex: None,
            action: "updateVaultManifest",
        })
        .unwrap();
        assert_eq!(
            canonical_string(&preimage).unwrap(),
            "{\"action\":\"updateVaultManifest\",\"newBlobHex\":null,\"newUri\":\"ipfs://new\",\"vaultId\":\"v1\"}"
        );
    }

    #[test]
    fn add_entry_preimage_uses_raw_client_values() {
        // No normalization: the metadata object appears exactly as sent,
        // without a notes key the client never provided.
        let metadata = json!({"service": "github", "username": "mike"});
        let wrapped = json!([]);
        let preimage = add_entry_preimage("v1", "rActor", "AAAA", "QmX", &metadata, &wrapped);
        assert_eq!(
            preimage["entryMetadata"],
            json!({"service": "github", "username": "mike"})
        );
        assert!(preimage["entryMetadata"].get("notes").is_none());
    }
}
