//! # VaultStore — Typed State & Invariants
//!
//! The in-memory vault map and every mutator the dispatcher is allowed to
//! call. Each method either commits a mutation that satisfies every store
//! invariant or returns an error having changed nothing — there is no
//! half-mutated state for a failed operation to leave behind.
//!
//! ## Invariants (hold after every committed mutation)
//!
//! 1. The owner is always in `authorized`.
//! 2. `authorized` and `pendingInvites` are disjoint; no duplicates within
//!    either list.
//! 3. Individual vaults: `authorized == [owner]`, no pending invites, no
//!    wrapped keys on any entry.
//! 4. `id`, `owner`, and `salt` never change after creation.
//! 5. `metadata.vaultId`, when present, equals the vault id.
//! 6. A vault's `createdAt` is ≤ every entry's `createdAt`.
//! 7. The state digest is a pure function of the vault map.
//!
//! Vaults live in a `BTreeMap` keyed by vault id so iteration order — and
//! with it the persisted file and the state digest — is identical on every
//! replica.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::canon::{digest_value, sha256_hex};
use crate::error::{ContractError, ErrorCode};
use crate::state::types::{Entry, PendingInvite, Vault, VaultSummary, VaultType};

// ---------------------------------------------------------------------------
// Round key ordering
// ---------------------------------------------------------------------------

/// Order two round keys: numeric comparison when both parse as finite
/// numbers, bytewise comparison of the string forms otherwise.
pub fn compare_round_keys(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) if x.is_finite() && y.is_finite() => {
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        _ => a.as_bytes().cmp(b.as_bytes()),
    }
}

// ---------------------------------------------------------------------------
// Creation parameters
// ---------------------------------------------------------------------------

/// Everything needed to insert a fresh vault. The id is computed, never
/// supplied.
#[derive(Debug, Clone)]
pub struct NewVault {
    pub owner: String,
    pub salt: String,
    pub vault_type: VaultType,
    pub metadata: Map<String, Value>,
    pub created_at: String,
    pub manifest_token_id: String,
    /// Additional authorized members beyond the owner. Team vaults only;
    /// deduplicated against the owner and each other on insert.
    pub authorized: Vec<String>,
    /// Pre-seeded invites. Team vaults only.
    pub pending_invites: Vec<PendingInvite>,
}

// ---------------------------------------------------------------------------
// VaultStore
// ---------------------------------------------------------------------------

/// The whole replicated state: a deterministic map of vault id → vault.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VaultStore {
    vaults: BTreeMap<String, Vault>,
}

impl VaultStore {
    /// An empty store — the state every replica starts from.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a previously persisted vault map.
    pub fn from_vaults(vaults: BTreeMap<String, Vault>) -> Self {
        Self { vaults }
    }

    /// The vault id for an owner/salt pair: SHA-256 over the literal
    /// concatenation `owner + ":" + salt` (not a canonical-encoded mapping).
    pub fn vault_id_for(owner: &str, salt: &str) -> String {
        sha256_hex(format!("{owner}:{salt}").as_bytes())
    }

    pub fn len(&self) -> usize {
        self.vaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vaults.is_empty()
    }

    /// Borrow a vault, failing with `VaultNotFound`.
    pub fn vault(&self, vault_id: &str) -> Result<&Vault, ContractError> {
        self.vaults
            .get(vault_id)
            .ok_or_else(|| ContractError::vault_not_found(vault_id))
    }

    fn vault_mut(&mut self, vault_id: &str) -> Result<&mut Vault, ContractError> {
        self.vaults
            .get_mut(vault_id)
            .ok_or_else(|| ContractError::vault_not_found(vault_id))
    }

    /// Borrow the underlying map. Read-only; mutations go through the
    /// typed methods.
    pub fn vaults(&self) -> &BTreeMap<String, Vault> {
        &self.vaults
    }

    // -- Creation ------------------------------------------------------------

    /// Insert a new vault. Computes the id from `(owner, salt)` and fails
    /// with `VaultAlreadyExists` if that id is taken.
    pub fn create_vault(&mut self, params: NewVault) -> Result<&Vault, ContractError> {
        let id = Self::vault_id_for(&params.owner, &params.salt);
        if self.vaults.contains_key(&id) {
            return Err(ContractError::new(
                ErrorCode::VaultAlreadyExists,
                format!("vault already exists: {id}"),
            ));
        }

        // Owner first, then the extra members, deduplicated in order.
        // Individual vaults ignore extras entirely.
        let mut authorized = vec![params.owner.clone()];
        let mut pending_invites = Vec::new();
        if params.vault_type.is_team() {
            for member in params.authorized {
                if !authorized.contains(&member) {
                    authorized.push(member);
                }
            }
            for invite in params.pending_invites {
                if !authorized.contains(&invite.address)
                    && !pending_invites
                        .iter()
                        .any(|i: &PendingInvite| i.address == invite.address)
                {
                    pending_invites.push(invite);
                }
            }
        }

        let vault = Vault {
            id: id.clone(),
            vault_type: params.vault_type,
            owner: params.owner,
            salt: params.salt,
            created_at: params.created_at,
            metadata: params.metadata,
            manifest_token_id: params.manifest_token_id,
            authorized,
            pending_invites,
            entries: Vec::new(),
        };

        tracing::debug!(vault_id = %id, vault_type = %vault.vault_type.as_str(), "vault created");
        self.vaults.insert(id.clone(), vault);
        Ok(&self.vaults[&id])
    }

    // -- Entries -------------------------------------------------------------

    /// Append an entry to a vault the actor has write access to.
    pub fn add_entry(
        &mut self,
        vault_id: &str,
        actor: &str,
        entry: Entry,
    ) -> Result<&Entry, ContractError> {
        let vault = self.vault_mut(vault_id)?;
        if !vault.has_access(actor) {
            return Err(ContractError::unauthorized(format!(
                "actor {actor} has no write access to vault"
            )));
        }
        if !vault.vault_type.is_team() && !entry.wrapped_keys.is_empty() {
            return Err(ContractError::invalid_input(
                "wrapped keys are not allowed on individual vault entries",
            ));
        }

        vault.entries.push(entry);
        Ok(vault.entries.last().expect("entry was just pushed"))
    }

    /// Resolve an entry by index or token id. Index is pure array access;
    /// token id is first-match in insertion order.
    pub fn get_entry(
        &self,
        vault_id: &str,
        actor: &str,
        entry_index: Option<usize>,
        token_id: Option<&str>,
    ) -> Result<(usize, &Entry), ContractError> {
        let vault = self.vault(vault_id)?;
        if !vault.has_access(actor) {
            return Err(ContractError::unauthorized(format!(
                "actor {actor} has no read access to vault"
            )));
        }

        if let Some(index) = entry_index {
            return vault
                .entries
                .get(index)
                .map(|e| (index, e))
                .ok_or_else(|| {
                    ContractError::new(
                        ErrorCode::EntryNotFound,
                        format!("no entry at index {index}"),
                    )
                });
        }

        if let Some(token) = token_id {
            return vault
                .entries
                .iter()
                .enumerate()
                .find(|(_, e)| e.token_id == token)
                .ok_or_else(|| {
                    ContractError::new(
                        ErrorCode::EntryNotFound,
                        format!("no entry with token id {token}"),
                    )
                });
        }

        Err(ContractError::invalid_input(
            "either entryIndex or tokenId is required",
        ))
    }

    // -- Listings ------------------------------------------------------------

    /// Summaries of every vault owned by `owner`, newest first. With
    /// `since`, only vaults created strictly after that round key.
    pub fn get_my_vaults(&self, owner: &str, since: Option<&str>) -> Vec<VaultSummary> {
        let mut summaries: Vec<VaultSummary> = self
            .vaults
            .values()
            .filter(|v| v.owner == owner)
            .filter(|v| match since {
                Some(s) => compare_round_keys(&v.created_at, s) == Ordering::Greater,
                None => true,
            })
            .map(Vault::summary)
            .collect();

        // Descending by createdAt. The sort is stable and the input comes
        // from a BTreeMap, so ties keep vault-id order on every replica.
        summaries.sort_by(|a, b| compare_round_keys(&b.created_at, &a.created_at));
        summaries
    }

    // -- Team membership -----------------------------------------------------

    /// Record an invite on a team vault. Owner only.
    pub fn add_pending_invite(
        &mut self,
        vault_id: &str,
        actor: &str,
        invitee: &str,
        round_key: &str,
    ) -> Result<(), ContractError> {
        let vault = self.team_vault_mut(vault_id)?;
        if !vault.is_owner(actor) {
            return Err(ContractError::unauthorized(
                "only the vault owner can invite members",
            ));
        }
        if vault.is_authorized(invitee) {
            return Err(ContractError::new(
                ErrorCode::InviteAlreadyAccepted,
                format!("address is already a member: {invitee}"),
            ));
        }
        if vault.has_pending_invite(invitee) {
            return Err(ContractError::new(
                ErrorCode::InviteAlreadyExists,
                format!("invite already pending: {invitee}"),
            ));
        }

        vault.pending_invites.push(PendingInvite {
            address: invitee.to_string(),
            invited_by: actor.to_string(),
            invited_at: round_key.to_string(),
        });
        Ok(())
    }

    /// Move the actor from pending invites into the authorized set.
    pub fn accept_pending_invite(
        &mut self,
        vault_id: &str,
        actor: &str,
    ) -> Result<(), ContractError> {
        let vault = self.team_vault_mut(vault_id)?;
        if vault.is_authorized(actor) {
            return Err(ContractError::new(
                ErrorCode::InviteAlreadyAccepted,
                format!("address is already a member: {actor}"),
            ));
        }
        let position = vault
            .pending_invites
            .iter()
            .position(|i| i.address == actor)
            .ok_or_else(|| {
                ContractError::new(
                    ErrorCode::InviteNotFound,
                    format!("no pending invite for: {actor}"),
                )
            })?;

        vault.pending_invites.remove(position);
        vault.authorized.push(actor.to_string());
        Ok(())
    }

    /// Withdraw a pending invite. Owner only.
    pub fn revoke_pending_invite(
        &mut self,
        vault_id: &str,
        actor: &str,
        pending_address: &str,
    ) -> Result<(), ContractError> {
        let vault = self.team_vault_mut(vault_id)?;
        if !vault.is_owner(actor) {
            return Err(ContractError::unauthorized(
                "only the vault owner can revoke invites",
            ));
        }
        let position = vault
            .pending_invites
            .iter()
            .position(|i| i.address == pending_address)
            .ok_or_else(|| {
                ContractError::new(
                    ErrorCode::InviteNotFound,
                    format!("no pending invite for: {pending_address}"),
                )
            })?;

        vault.pending_invites.remove(position);
        Ok(())
    }

    /// Remove a member from the authorized set. Owner only; the owner can
    /// never remove themselves.
    pub fn remove_authorized_member(
        &mut self,
        vault_id: &str,
        actor: &str,
        member: &str,
    ) -> Result<(), ContractError> {
        let vault = self.team_vault_mut(vault_id)?;
        if !vault.is_owner(actor) {
            return Err(ContractError::unauthorized(
                "only the vault owner can remove members",
            ));
        }
        if member == vault.owner {
            return Err(ContractError::new(
                ErrorCode::InvalidOperation,
                "the vault owner cannot be removed",
            ));
        }
        let position = vault
            .authorized
            .iter()
            .position(|a| a == member)
            .ok_or_else(|| {
                ContractError::new(
                    ErrorCode::MemberNotFound,
                    format!("not a member: {member}"),
                )
            })?;

        vault.authorized.remove(position);
        Ok(())
    }

    // -- Metadata ------------------------------------------------------------

    /// Store the password backup envelope verbatim. Owner only.
    pub fn set_password_backup(
        &mut self,
        vault_id: &str,
        actor: &str,
        envelope: Value,
        round_key: &str,
    ) -> Result<(), ContractError> {
        let vault = self.owned_vault_mut(vault_id, actor)?;
        vault
            .metadata
            .insert("passwordBackup".to_string(), envelope);
        vault
            .metadata
            .insert("lastUpdated".to_string(), Value::String(round_key.into()));
        Ok(())
    }

    /// Drop the password backup, if any. Owner only.
    pub fn clear_password_backup(
        &mut self,
        vault_id: &str,
        actor: &str,
        round_key: &str,
    ) -> Result<bool, ContractError> {
        let vault = self.owned_vault_mut(vault_id, actor)?;
        let removed = vault.metadata.remove("passwordBackup").is_some();
        vault
            .metadata
            .insert("lastUpdated".to_string(), Value::String(round_key.into()));
        Ok(removed)
    }

    /// Raw stored metadata, password backup included. Owner only.
    pub fn get_vault_metadata(
        &self,
        vault_id: &str,
        actor: &str,
    ) -> Result<&Map<String, Value>, ContractError> {
        let vault = self.vault(vault_id)?;
        if !vault.is_owner(actor) {
            return Err(ContractError::unauthorized(
                "only the vault owner can read vault metadata",
            ));
        }
        Ok(&vault.metadata)
    }

    /// Replace the manifest token id after a burn/remint rotation.
    pub fn set_manifest_token(
        &mut self,
        vault_id: &str,
        actor: &str,
        token_id: String,
    ) -> Result<(), ContractError> {
        let vault = self.owned_vault_mut(vault_id, actor)?;
        vault.manifest_token_id = token_id;
        Ok(())
    }

    // -- Tokens & revocation -------------------------------------------------

    /// The manifest token followed by every non-empty entry token. Owner
    /// only.
    pub fn list_vault_uri_tokens(
        &self,
        vault_id: &str,
        actor: &str,
    ) -> Result<Vec<String>, ContractError> {
        let vault = self.vault(vault_id)?;
        if !vault.is_owner(actor) {
            return Err(ContractError::unauthorized(
                "only the vault owner can list vault tokens",
            ));
        }

        let mut tokens = vec![vault.manifest_token_id.clone()];
        tokens.extend(
            vault
                .entries
                .iter()
                .filter(|e| !e.token_id.is_empty())
                .map(|e| e.token_id.clone()),
        );
        Ok(tokens)
    }

    /// Remove a vault and all its entries. Owner only.
    pub fn delete_vault(&mut self, vault_id: &str, actor: &str) -> Result<Vault, ContractError> {
        let vault = self.vault(vault_id)?;
        if !vault.is_owner(actor) {
            return Err(ContractError::unauthorized(
                "only the vault owner can delete a vault",
            ));
        }
        Ok(self
            .vaults
            .remove(vault_id)
            .expect("vault existence checked above"))
    }

    // -- Snapshots & digest --------------------------------------------------

    /// Deep copy of the vault map.
    pub fn snapshot(&self) -> BTreeMap<String, Vault> {
        self.vaults.clone()
    }

    /// The replica state digest: SHA-256 over the canonical serialization
    /// of `{"vaults": ...}`. A pure function of state — two replicas with
    /// equal stores produce equal digests, full stop.
    pub fn digest(&self) -> Result<String, ContractError> {
        let vaults = serde_json::to_value(&self.vaults)
            .map_err(|e| ContractError::unexpected(format!("state serialization failed: {e}")))?;
        let mut root = Map::new();
        root.insert("vaults".to_string(), vaults);
        digest_value(&Value::Object(root))
    }

    // -- Internal helpers ----------------------------------------------------

    fn team_vault_mut(&mut self, vault_id: &str) -> Result<&mut Vault, ContractError> {
        let vault = self.vault_mut(vault_id)?;
        if !vault.vault_type.is_team() {
            return Err(ContractError::new(
                ErrorCode::InvalidVaultType,
                "operation requires a team vault",
            ));
        }
        Ok(vault)
    }

    fn owned_vault_mut(
        &mut self,
        vault_id: &str,
        actor: &str,
    ) -> Result<&mut Vault, ContractError> {
        let vault = self.vault_mut(vault_id)?;
        if !vault.is_owner(actor) {
            return Err(ContractError::unauthorized(
                "operation is restricted to the vault owner",
            ));
        }
        Ok(vault)
    }
}
