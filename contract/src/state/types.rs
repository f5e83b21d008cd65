//! Core state types: vaults, entries, invites, and the password-backup
//! envelope. Field names serialize in camelCase — the persisted file, the
//! state digest, and wire responses all use this serialization, so renaming
//! a field here is a protocol change.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::PASSWORD_BACKUP_VERSION;
use crate::error::{ContractError, ErrorCode};

// ---------------------------------------------------------------------------
// VaultType
// ---------------------------------------------------------------------------

/// The two vault flavors. Individual vaults have exactly one authorized
/// address (the owner) and no membership machinery; team vaults carry the
/// invite lifecycle and per-member wrapped keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultType {
    Individual,
    Team,
}

impl VaultType {
    /// The wire string for this vault type.
    pub fn as_str(&self) -> &'static str {
        match self {
            VaultType::Individual => "individual",
            VaultType::Team => "team",
        }
    }

    pub fn is_team(&self) -> bool {
        matches!(self, VaultType::Team)
    }

    /// Parse a wire string into a vault type.
    pub fn parse(s: &str) -> Result<Self, ContractError> {
        match s {
            "individual" => Ok(VaultType::Individual),
            "team" => Ok(VaultType::Team),
            other => Err(ContractError::new(
                ErrorCode::UnsupportedVaultType,
                format!("unsupported vault type: {other}"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// A per-member wrapped entry key: the entry's symmetric key encrypted to
/// one authorized address. Opaque to the contract beyond shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedKey {
    /// The member this key is wrapped for.
    pub address: String,
    /// Base64 ciphertext of the wrapped key.
    pub encrypted_key: String,
}

/// Client-visible entry metadata. Unset optionals are stored as the null
/// sentinel, never omitted — the signing preimage depends on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMetadata {
    /// What the secret is for. Required, 1–128 characters.
    pub service: String,
    /// Optional account name at the service.
    pub username: Option<String>,
    /// Optional free-form notes.
    pub notes: Option<String>,
}

/// One stored secret reference. The ciphertext itself lives off-site under
/// `cid`; the contract keeps only the reference, the minted token id, and
/// the wrapped keys that let team members decrypt it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// URI-token identifier minted for this entry.
    pub token_id: String,
    /// Content identifier of the encrypted blob.
    pub cid: String,
    pub metadata: EntryMetadata,
    /// Per-member wrapped keys. Always empty for individual vaults.
    pub wrapped_keys: Vec<WrappedKey>,
    /// Round key at insertion.
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// Invites
// ---------------------------------------------------------------------------

/// A pending membership invite on a team vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingInvite {
    /// The invited address.
    pub address: String,
    /// Who issued the invite (always the vault owner today).
    pub invited_by: String,
    /// Round key when the invite was issued.
    pub invited_at: String,
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// The unit of state: one vault with its membership, invites, metadata and
/// entries. `id`, `owner`, and `salt` never change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    /// SHA-256 of `owner + ":" + salt`, 64 lowercase hex characters.
    pub id: String,
    #[serde(rename = "type")]
    pub vault_type: VaultType,
    /// Ledger classic address of the vault owner.
    pub owner: String,
    /// Client-chosen hex salt mixed into the vault id.
    pub salt: String,
    /// Round key at creation.
    pub created_at: String,
    /// Free-form key/value metadata. Two fields are special: `vaultId`
    /// (must equal `id` when present) and `passwordBackup` (a shape-checked
    /// envelope, see [`PasswordBackup`]).
    pub metadata: Map<String, Value>,
    /// URI-token id of the vault's manifest token.
    pub manifest_token_id: String,
    /// Addresses with read/write access. Always contains the owner.
    pub authorized: Vec<String>,
    /// Outstanding invites. Disjoint from `authorized`.
    pub pending_invites: Vec<PendingInvite>,
    /// Secret references, in insertion order.
    pub entries: Vec<Entry>,
}

impl Vault {
    /// Whether `actor` may read and write entries in this vault.
    ///
    /// Individual vaults: the owner only. Team vaults: any authorized
    /// member.
    pub fn has_access(&self, actor: &str) -> bool {
        match self.vault_type {
            VaultType::Individual => actor == self.owner,
            VaultType::Team => self.authorized.iter().any(|a| a == actor),
        }
    }

    pub fn is_owner(&self, actor: &str) -> bool {
        actor == self.owner
    }

    pub fn has_pending_invite(&self, address: &str) -> bool {
        self.pending_invites.iter().any(|i| i.address == address)
    }

    pub fn is_authorized(&self, address: &str) -> bool {
        self.authorized.iter().any(|a| a == address)
    }

    /// Round key of the most recent entry, if any. Entries append in round
    /// order, so the last one is the latest.
    pub fn last_activity(&self) -> Option<&str> {
        self.entries.last().map(|e| e.created_at.as_str())
    }

    /// Summary record used by vault listings.
    pub fn summary(&self) -> VaultSummary {
        VaultSummary {
            vault_id: self.id.clone(),
            vault_type: self.vault_type,
            created_at: self.created_at.clone(),
            entry_count: self.entries.len(),
            manifest_token_id: self.manifest_token_id.clone(),
            last_activity: self.last_activity().map(str::to_string),
        }
    }
}

/// What `getMyVaults` returns per vault: enough to render a listing without
/// shipping entry bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultSummary {
    pub vault_id: String,
    #[serde(rename = "type")]
    pub vault_type: VaultType,
    pub created_at: String,
    pub entry_count: usize,
    pub manifest_token_id: String,
    /// Round key of the latest entry, or null for an empty vault.
    pub last_activity: Option<String>,
}

// ---------------------------------------------------------------------------
// Password backup envelope
// ---------------------------------------------------------------------------

/// The client-side password backup envelope. The contract validates shape
/// only — version tag, vault binding, and base64 fields — and stores the
/// envelope verbatim. The ciphertext never gets decrypted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordBackup {
    pub version: u64,
    pub vault_id: String,
    pub salt: String,
    pub nonce: String,
    pub auth_tag: String,
    pub ciphertext: String,
}

impl PasswordBackup {
    /// Parse and shape-check an envelope from a JSON value.
    ///
    /// `expected_vault_id` is the vault the envelope must be bound to —
    /// for vault creation that is the *to-be-computed* id, so a client
    /// cannot smuggle a backup for some other vault into a create payload.
    pub fn from_value(value: &Value, expected_vault_id: &str) -> Result<Self, ContractError> {
        let backup: PasswordBackup = serde_json::from_value(value.clone()).map_err(|e| {
            ContractError::new(
                ErrorCode::InvalidMetadata,
                format!("malformed password backup envelope: {e}"),
            )
        })?;
        backup.validate(expected_vault_id)?;
        Ok(backup)
    }

    /// Shape checks: version, vault binding, and base64-decodable fields.
    pub fn validate(&self, expected_vault_id: &str) -> Result<(), ContractError> {
        if self.version != PASSWORD_BACKUP_VERSION {
            return Err(ContractError::new(
                ErrorCode::InvalidMetadata,
                format!("unsupported password backup version: {}", self.version),
            ));
        }
        if self.vault_id != expected_vault_id {
            return Err(ContractError::new(
                ErrorCode::InvalidMetadata,
                "password backup vaultId does not match vault",
            ));
        }
        for (name, field) in [
            ("salt", &self.salt),
            ("nonce", &self.nonce),
            ("authTag", &self.auth_tag),
            ("ciphertext", &self.ciphertext),
        ] {
            if field.is_empty() || !is_base64(field) {
                return Err(ContractError::new(
                    ErrorCode::InvalidMetadata,
                    format!("password backup field is not base64: {name}"),
                ));
            }
        }
        Ok(())
    }
}

/// Whether a string decodes as standard base64.
pub fn is_base64(s: &str) -> bool {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    STANDARD.decode(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(vault_id: &str) -> Value {
        json!({
            "version": 1,
            "vaultId": vault_id,
            "salt": "c2FsdA==",
            "nonce": "bm9uY2U=",
            "authTag": "dGFn",
            "ciphertext": "Y2lwaGVydGV4dA==",
        })
    }

    #[test]
    fn vault_type_wire_strings() {
        assert_eq!(VaultType::Individual.as_str(), "individual");
        assert_eq!(VaultType::Team.as_str(), "team");
        assert_eq!(VaultType::parse("team").unwrap(), VaultType::Team);
    }

    #[test]
    fn vault_type_parse_rejects_unknown() {
        let err = VaultType::parse("corporate").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedVaultType);
    }

    #[test]
    fn vault_type_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&VaultType::Team).unwrap(), "\"team\"");
    }

    #[test]
    fn entry_metadata_serializes_null_sentinels() {
        let meta = EntryMetadata {
            service: "github".into(),
            username: Some("mike".into()),
            notes: None,
        };
        let v = serde_json::to_value(&meta).unwrap();
        assert_eq!(v, json!({"service": "github", "username": "mike", "notes": null}));
    }

    #[test]
    fn vault_serializes_camel_case() {
        let vault = Vault {
            id: "aa".repeat(32),
            vault_type: VaultType::Individual,
            owner: "rOwner".into(),
            salt: "aabbccdd00112233".into(),
            created_at: "1".into(),
            metadata: Map::new(),
            manifest_token_id: "tok".into(),
            authorized: vec!["rOwner".into()],
            pending_invites: vec![],
            entries: vec![],
        };
        let v = serde_json::to_value(&vault).unwrap();
        assert!(v.get("createdAt").is_some());
        assert!(v.get("manifestTokenId").is_some());
        assert!(v.get("pendingInvites").is_some());
        assert_eq!(v["type"], json!("individual"));
    }

    #[test]
    fn access_rules_individual() {
        let vault = Vault {
            id: "v".into(),
            vault_type: VaultType::Individual,
            owner: "rOwner".into(),
            salt: "s".into(),
            created_at: "1".into(),
            metadata: Map::new(),
            manifest_token_id: "t".into(),
            authorized: vec!["rOwner".into()],
            pending_invites: vec![],
            entries: vec![],
        };
        assert!(vault.has_access("rOwner"));
        assert!(!vault.has_access("rSomeoneElse"));
    }

    #[test]
    fn access_rules_team() {
        let vault = Vault {
            id: "v".into(),
            vault_type: VaultType::Team,
            owner: "rOwner".into(),
            salt: "s".into(),
            created_at: "1".into(),
            metadata: Map::new(),
            manifest_token_id: "t".into(),
            authorized: vec!["rOwner".into(), "rMember".into()],
            pending_invites: vec![],
            entries: vec![],
        };
        assert!(vault.has_access("rMember"));
        assert!(!vault.has_access("rOutsider"));
        assert!(vault.is_owner("rOwner"));
        assert!(!vault.is_owner("rMember"));
    }

    #[test]
    fn password_backup_accepts_valid_envelope() {
        let v = envelope("vault-1");
        assert!(PasswordBackup::from_value(&v, "vault-1").is_ok());
    }

    #[test]
    fn password_backup_rejects_wrong_vault() {
        let v = envelope("vault-1");
        let err = PasswordBackup::from_value(&v, "vault-2").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidMetadata);
    }

    #[test]
    fn password_backup_rejects_wrong_version() {
        let mut v = envelope("vault-1");
        v["version"] = json!(2);
        let err = PasswordBackup::from_value(&v, "vault-1").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidMetadata);
    }

    #[test]
    fn password_backup_rejects_non_base64_field() {
        let mut v = envelope("vault-1");
        v["nonce"] = json!("not base64 !!!");
        let err = PasswordBackup::from_value(&v, "vault-1").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidMetadata);
    }

    #[test]
    fn password_backup_roundtrips_byte_equal() {
        // The envelope stored must be byte-equal to the one submitted.
        let v = envelope("vault-1");
        let parsed = PasswordBackup::from_value(&v, "vault-1").unwrap();
        assert_eq!(serde_json::to_value(&parsed).unwrap(), v);
    }

    #[test]
    fn last_activity_tracks_latest_entry() {
        let mut vault = Vault {
            id: "v".into(),
            vault_type: VaultType::Individual,
            owner: "rOwner".into(),
            salt: "s".into(),
            created_at: "1".into(),
            metadata: Map::new(),
            manifest_token_id: "t".into(),
            authorized: vec!["rOwner".into()],
            pending_invites: vec![],
            entries: vec![],
        };
        assert_eq!(vault.last_activity(), None);

        vault.entries.push(Entry {
            token_id: "t1".into(),
            cid: "QmX".into(),
            metadata: EntryMetadata { service: "a".into(), username: None, notes: None },
            wrapped_keys: vec![],
            created_at: "3".into(),
        });
        assert_eq!(vault.last_activity(), Some("3"));
    }
}
