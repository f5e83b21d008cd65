//! # Contract Errors
//!
//! One error type for the whole contract. Every handler fails fast by
//! returning a [`ContractError`] carrying a wire-visible [`ErrorCode`] and a
//! human-readable message; the dispatcher converts it into the failure
//! envelope exactly once, at the outer boundary.
//!
//! The `errorId` surfaced to callers is a short digest of `code:message`, so
//! identical failures produce identical ids on every replica — useful when
//! correlating audit records across nodes without shipping logs around.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::canon::sha256_hex;

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Every failure kind the contract can surface over the wire.
///
/// The serialized form is the variant name verbatim — these strings are part
/// of the protocol and clients match on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    InvalidInput,
    InvalidAddress,
    InvalidSalt,
    InvalidSignature,
    InvalidCid,
    InvalidMetadata,
    InvalidVaultType,
    InvalidOperation,
    UnknownOperation,
    UnsupportedVaultType,
    Unauthorized,
    VaultNotFound,
    VaultAlreadyExists,
    EntryNotFound,
    InviteAlreadyExists,
    InviteAlreadyAccepted,
    InviteNotFound,
    MemberNotFound,
    TeamModeDisabled,
    ConfirmationRequired,
    RateLimitExceeded,
    XrplSubmissionFailed,
    UnexpectedError,
}

impl ErrorCode {
    /// The wire string for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "InvalidInput",
            ErrorCode::InvalidAddress => "InvalidAddress",
            ErrorCode::InvalidSalt => "InvalidSalt",
            ErrorCode::InvalidSignature => "InvalidSignature",
            ErrorCode::InvalidCid => "InvalidCid",
            ErrorCode::InvalidMetadata => "InvalidMetadata",
            ErrorCode::InvalidVaultType => "InvalidVaultType",
            ErrorCode::InvalidOperation => "InvalidOperation",
            ErrorCode::UnknownOperation => "UnknownOperation",
            ErrorCode::UnsupportedVaultType => "UnsupportedVaultType",
            ErrorCode::Unauthorized => "Unauthorized",
            ErrorCode::VaultNotFound => "VaultNotFound",
            ErrorCode::VaultAlreadyExists => "VaultAlreadyExists",
            ErrorCode::EntryNotFound => "EntryNotFound",
            ErrorCode::InviteAlreadyExists => "InviteAlreadyExists",
            ErrorCode::InviteAlreadyAccepted => "InviteAlreadyAccepted",
            ErrorCode::InviteNotFound => "InviteNotFound",
            ErrorCode::MemberNotFound => "MemberNotFound",
            ErrorCode::TeamModeDisabled => "TeamModeDisabled",
            ErrorCode::ConfirmationRequired => "ConfirmationRequired",
            ErrorCode::RateLimitExceeded => "RateLimitExceeded",
            ErrorCode::XrplSubmissionFailed => "XrplSubmissionFailed",
            ErrorCode::UnexpectedError => "UnexpectedError",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ContractError
// ---------------------------------------------------------------------------

/// The single tagged error type of the contract core.
///
/// Carries the wire code plus a message. Handlers construct these directly
/// or via the convenience constructors below; nothing in the core ever
/// panics on a client-caused condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ContractError {
    /// The wire-visible failure kind.
    pub code: ErrorCode,
    /// Human-readable detail. Deterministic for a given failure — no
    /// pointers, no timestamps, no randomness.
    pub message: String,
}

impl ContractError {
    /// Construct an error from a code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Client supplied a structurally invalid payload.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Signature, key, or signer-to-address binding failed. The verifier
    /// never says *which* check failed.
    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidSignature, message)
    }

    /// The actor is not permitted to perform this operation.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// The referenced vault does not exist.
    pub fn vault_not_found(vault_id: &str) -> Self {
        Self::new(ErrorCode::VaultNotFound, format!("vault not found: {vault_id}"))
    }

    /// Internal invariant violated or a producer-side programming error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnexpectedError, message)
    }

    /// Short deterministic identifier for this failure: the first 12 hex
    /// characters of `SHA-256(code + ':' + message)`.
    pub fn error_id(&self) -> String {
        let preimage = format!("{}:{}", self.code.as_str(), self.message);
        sha256_hex(preimage.as_bytes())[..12].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_serializes_to_wire_string() {
        let json = serde_json::to_string(&ErrorCode::VaultAlreadyExists).unwrap();
        assert_eq!(json, "\"VaultAlreadyExists\"");
    }

    #[test]
    fn code_roundtrips_through_serde() {
        let json = serde_json::to_string(&ErrorCode::RateLimitExceeded).unwrap();
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ErrorCode::RateLimitExceeded);
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(ErrorCode::Unauthorized.to_string(), "Unauthorized");
        assert_eq!(ErrorCode::XrplSubmissionFailed.to_string(), "XrplSubmissionFailed");
    }

    #[test]
    fn error_id_is_deterministic() {
        let a = ContractError::vault_not_found("abc");
        let b = ContractError::vault_not_found("abc");
        assert_eq!(a.error_id(), b.error_id());
        assert_eq!(a.error_id().len(), 12);
    }

    #[test]
    fn error_id_known_vector() {
        // SHA-256("VaultNotFound:vault not found: abc")[..12]
        let err = ContractError::vault_not_found("abc");
        assert_eq!(err.error_id(), "e04fbf82ed8c");
    }

    #[test]
    fn error_id_distinguishes_messages() {
        let a = ContractError::unauthorized("actor x");
        let b = ContractError::unauthorized("actor y");
        assert_ne!(a.error_id(), b.error_id());
    }

    #[test]
    fn error_display_includes_code_and_message() {
        let err = ContractError::invalid_input("missing field: owner");
        assert_eq!(err.to_string(), "InvalidInput: missing field: owner");
    }
}
