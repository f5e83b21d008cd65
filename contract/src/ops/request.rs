//! Request records, the operation-kind enum, and payload field accessors.
//!
//! A request is `{type, payload}` where `payload` is an opaque mapping the
//! per-operation handler parses and validates. The accessors here turn
//! missing/mistyped fields into `InvalidInput` with the field name in the
//! message, so clients get actionable errors without handlers repeating the
//! same boilerplate seventeen times.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ContractError, ErrorCode};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A runtime-delivered request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// The operation name, e.g. `"createVault"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Operation-specific payload.
    #[serde(default)]
    pub payload: Value,
}

impl Request {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// Operation kinds
// ---------------------------------------------------------------------------

/// Every operation the dispatcher understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    CreateVault,
    CreateTeamVault,
    AddEntry,
    GetEntry,
    GetMyVaults,
    InviteToVault,
    AcceptInvite,
    RevokeInvite,
    RemoveMember,
    GetPendingInvites,
    UpdateVaultManifest,
    ListVaultUriTokens,
    RevokeVault,
    StateDigest,
    AddPasswordBackup,
    RemovePasswordBackup,
    GetVaultMetadata,
}

impl OpKind {
    /// Parse a wire operation name.
    pub fn parse(name: &str) -> Result<Self, ContractError> {
        Ok(match name {
            "createVault" => OpKind::CreateVault,
            "createTeamVault" => OpKind::CreateTeamVault,
            "addEntry" => OpKind::AddEntry,
            "getEntry" => OpKind::GetEntry,
            "getMyVaults" => OpKind::GetMyVaults,
            "inviteToVault" => OpKind::InviteToVault,
            "acceptInvite" => OpKind::AcceptInvite,
            "revokeInvite" => OpKind::RevokeInvite,
            "removeMember" => OpKind::RemoveMember,
            "getPendingInvites" => OpKind::GetPendingInvites,
            "updateVaultManifest" => OpKind::UpdateVaultManifest,
            "listVaultURITokens" => OpKind::ListVaultUriTokens,
            "revokeVault" => OpKind::RevokeVault,
            "stateDigest" => OpKind::StateDigest,
            "addPasswordBackup" => OpKind::AddPasswordBackup,
            "removePasswordBackup" => OpKind::RemovePasswordBackup,
            "getVaultMetadata" => OpKind::GetVaultMetadata,
            other => {
                return Err(ContractError::new(
                    ErrorCode::UnknownOperation,
                    format!("unknown operation: {other}"),
                ))
            }
        })
    }

    /// The wire name, used in response envelopes and audit records.
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::CreateVault => "createVault",
            OpKind::CreateTeamVault => "createTeamVault",
            OpKind::AddEntry => "addEntry",
            OpKind::GetEntry => "getEntry",
            OpKind::GetMyVaults => "getMyVaults",
            OpKind::InviteToVault => "inviteToVault",
            OpKind::AcceptInvite => "acceptInvite",
            OpKind::RevokeInvite => "revokeInvite",
            OpKind::RemoveMember => "removeMember",
            OpKind::GetPendingInvites => "getPendingInvites",
            OpKind::UpdateVaultManifest => "updateVaultManifest",
            OpKind::ListVaultUriTokens => "listVaultURITokens",
            OpKind::RevokeVault => "revokeVault",
            OpKind::StateDigest => "stateDigest",
            OpKind::AddPasswordBackup => "addPasswordBackup",
            OpKind::RemovePasswordBackup => "removePasswordBackup",
            OpKind::GetVaultMetadata => "getVaultMetadata",
        }
    }

    /// Whether this operation mutates state (and therefore counts against
    /// the per-round rate limit and triggers persistence).
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            OpKind::CreateVault
                | OpKind::CreateTeamVault
                | OpKind::AddEntry
                | OpKind::InviteToVault
                | OpKind::AcceptInvite
                | OpKind::RevokeInvite
                | OpKind::RemoveMember
                | OpKind::UpdateVaultManifest
                | OpKind::RevokeVault
                | OpKind::AddPasswordBackup
                | OpKind::RemovePasswordBackup
        )
    }

    /// The team family: unavailable when the team-mode flag is off.
    pub fn requires_team_mode(&self) -> bool {
        matches!(
            self,
            OpKind::CreateTeamVault
                | OpKind::InviteToVault
                | OpKind::AcceptInvite
                | OpKind::RevokeInvite
                | OpKind::RemoveMember
                | OpKind::GetPendingInvites
                | OpKind::UpdateVaultManifest
        )
    }
}

// ---------------------------------------------------------------------------
// Payload accessors
// ---------------------------------------------------------------------------

/// The payload as an object, or `InvalidInput`.
pub fn payload_object(payload: &Value) -> Result<&Map<String, Value>, ContractError> {
    payload
        .as_object()
        .ok_or_else(|| ContractError::invalid_input("payload must be an object"))
}

/// A required string field.
pub fn require_str<'a>(payload: &'a Value, field: &str) -> Result<&'a str, ContractError> {
    match payload.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(Value::String(_)) => Err(ContractError::invalid_input(format!(
            "field must not be empty: {field}"
        ))),
        Some(_) => Err(ContractError::invalid_input(format!(
            "field must be a string: {field}"
        ))),
        None => Err(ContractError::invalid_input(format!(
            "missing field: {field}"
        ))),
    }
}

/// An optional string field; `null` counts as absent.
pub fn optional_str<'a>(payload: &'a Value, field: &str) -> Result<Option<&'a str>, ContractError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ContractError::invalid_input(format!(
            "field must be a string: {field}"
        ))),
    }
}

/// An optional boolean field; `null` counts as absent.
pub fn optional_bool(payload: &Value, field: &str) -> Result<Option<bool>, ContractError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ContractError::invalid_input(format!(
            "field must be a boolean: {field}"
        ))),
    }
}

/// The signing fields of a payload. A missing or mistyped signature or
/// signer key is an authentication failure, not a shape failure — the
/// verifier's contract is that every path to "this request is not
/// authenticated" reads `InvalidSignature`.
pub fn signing_fields(payload: &Value) -> Result<(&str, &str), ContractError> {
    let signer_key = payload
        .get("signerPublicKey")
        .and_then(Value::as_str)
        .ok_or_else(|| ContractError::invalid_signature("missing signer public key"))?;
    let signature = payload
        .get("signature")
        .and_then(Value::as_str)
        .ok_or_else(|| ContractError::invalid_signature("missing signature"))?;
    Ok((signer_key, signature))
}

/// An optional non-negative integer field; `null` counts as absent.
pub fn optional_index(payload: &Value, field: &str) -> Result<Option<u64>, ContractError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_u64().map(Some).ok_or_else(|| {
            ContractError::invalid_input(format!("field must be a non-negative integer: {field}"))
        }),
        Some(_) => Err(ContractError::invalid_input(format!(
            "field must be an integer: {field}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_deserializes_wire_shape() {
        let req: Request =
            serde_json::from_str(r#"{"type":"createVault","payload":{"owner":"rX"}}"#).unwrap();
        assert_eq!(req.kind, "createVault");
        assert_eq!(req.payload["owner"], json!("rX"));
    }

    #[test]
    fn payload_defaults_to_null() {
        let req: Request = serde_json::from_str(r#"{"type":"stateDigest"}"#).unwrap();
        assert!(req.payload.is_null());
    }

    #[test]
    fn every_op_roundtrips_through_parse() {
        let names = [
            "createVault",
            "createTeamVault",
            "addEntry",
            "getEntry",
            "getMyVaults",
            "inviteToVault",
            "acceptInvite",
            "revokeInvite",
            "removeMember",
            "getPendingInvites",
            "updateVaultManifest",
            "listVaultURITokens",
            "revokeVault",
            "stateDigest",
            "addPasswordBackup",
            "removePasswordBackup",
            "getVaultMetadata",
        ];
        for name in names {
            let op = OpKind::parse(name).unwrap();
            assert_eq!(op.name(), name);
        }
    }

    #[test]
    fn unknown_operation_rejected() {
        let err = OpKind::parse("mintMoney").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownOperation);
    }

    #[test]
    fn reads_are_not_mutating() {
        for op in [
            OpKind::GetEntry,
            OpKind::GetMyVaults,
            OpKind::GetPendingInvites,
            OpKind::ListVaultUriTokens,
            OpKind::StateDigest,
            OpKind::GetVaultMetadata,
        ] {
            assert!(!op.is_mutating(), "{:?} should not be mutating", op);
        }
    }

    #[test]
    fn team_family_requires_team_mode() {
        assert!(OpKind::CreateTeamVault.requires_team_mode());
        assert!(OpKind::AcceptInvite.requires_team_mode());
        assert!(OpKind::UpdateVaultManifest.requires_team_mode());
        assert!(!OpKind::CreateVault.requires_team_mode());
        assert!(!OpKind::RevokeVault.requires_team_mode());
    }

    #[test]
    fn require_str_error_messages_name_the_field() {
        let payload = json!({"present": "", "wrong": 7});
        let err = require_str(&payload, "absent").unwrap_err();
        assert!(err.message.contains("absent"));
        let err = require_str(&payload, "present").unwrap_err();
        assert!(err.message.contains("present"));
        let err = require_str(&payload, "wrong").unwrap_err();
        assert!(err.message.contains("wrong"));
    }

    #[test]
    fn optional_accessors_treat_null_as_absent() {
        let payload = json!({"a": null, "b": true, "c": 3});
        assert_eq!(optional_str(&payload, "a").unwrap(), None);
        assert_eq!(optional_bool(&payload, "b").unwrap(), Some(true));
        assert_eq!(optional_index(&payload, "c").unwrap(), Some(3));
        assert_eq!(optional_index(&payload, "missing").unwrap(), None);
    }

    #[test]
    fn optional_index_rejects_negative_and_fractional() {
        assert!(optional_index(&json!({"i": -1}), "i").is_err());
        assert!(optional_index(&json!({"i": 1.5}), "i").is_err());
    }
}
