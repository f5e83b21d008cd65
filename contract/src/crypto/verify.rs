//! # Signature Verification
//!
//! Authenticates a signed operation: shape checks, key-family dispatch,
//! signer-to-address binding, and the curve verification itself. Checks are
//! ordered cheapest-first so malformed requests burn string comparisons,
//! not elliptic-curve math.
//!
//! Two key families are recognized by the leading bytes of the public key:
//!
//! - `ED` + 64 hex chars — Ed25519 (the 0xED prefix the ledger uses to tag
//!   Ed25519 keys into the same 33-byte shape as compressed ECDSA keys).
//! - `02`/`03` + 64 hex chars — compressed secp256k1.
//!
//! The signature is verified over the 32 raw bytes of the payload digest
//! (see [`crate::canon::signing_message`]). For Ed25519 those bytes are the
//! signed message; for secp256k1 they are the ECDSA prehash. secp256k1
//! signatures are accepted in DER (the ledger's native encoding) or as a
//! fixed 64-byte `r || s`.
//!
//! Every failure here is `InvalidSignature`. We do not tell callers whether
//! the key was malformed, the address didn't bind, or the curve math said
//! no — a detailed rejection oracle helps exactly one audience, and it is
//! not our users.

use ed25519_dalek::{Signature as Ed25519Signature, VerifyingKey as Ed25519VerifyingKey};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature as EcdsaSignature, VerifyingKey as EcdsaVerifyingKey};
use serde_json::Value;

use crate::canon::signing_message;
use crate::config::{MAX_PUBLIC_KEY_LENGTH, MIN_PUBLIC_KEY_LENGTH, MIN_SIGNATURE_HEX_LENGTH};
use crate::crypto::address::derive_address;
use crate::error::ContractError;

// ---------------------------------------------------------------------------
// Key families
// ---------------------------------------------------------------------------

/// The signature curve a public key belongs to, decided by its prefix.
///
/// Tagged variants rather than trait objects: there are exactly two curves
/// in this protocol and the dispatch point is a single match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    /// `ED`-prefixed 33-byte keys.
    Ed25519,
    /// `02`/`03`-prefixed compressed SEC1 keys.
    Secp256k1,
}

/// Classify a public key string into its curve family.
///
/// The caller has already shape-checked the string (alphanumeric, length
/// bounds); this decides the curve or rejects the key as unrecognizable.
fn classify_key(public_key: &str) -> Result<KeyFamily, ContractError> {
    let upper = public_key.to_ascii_uppercase();
    let (prefix, body) = upper.split_at(2.min(upper.len()));

    let family = match prefix {
        "ED" => KeyFamily::Ed25519,
        "02" | "03" => KeyFamily::Secp256k1,
        _ => {
            return Err(ContractError::invalid_signature(
                "unrecognized public key prefix",
            ))
        }
    };

    if body.len() != 64 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ContractError::invalid_signature(
            "public key body must be 64 hex characters",
        ));
    }

    Ok(family)
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Authenticate a signed operation.
///
/// The checks, in order:
///
/// 1. Signature present, hex, and at least 16 characters.
/// 2. Public key present, alphanumeric, 16–80 characters.
/// 3. Key family recognized from the prefix.
/// 4. Address derived from the key equals `expected_address`.
/// 5. Curve verification of `signature` over the payload digest bytes.
///
/// Pure function: no I/O, no state, same answer on every replica.
pub fn verify_request(
    payload: &Value,
    signature_hex: &str,
    signer_public_key: &str,
    expected_address: &str,
) -> Result<(), ContractError> {
    // 1. Signature shape.
    if signature_hex.len() < MIN_SIGNATURE_HEX_LENGTH
        || !signature_hex.bytes().all(|b| b.is_ascii_hexdigit())
    {
        return Err(ContractError::invalid_signature("malformed signature"));
    }

    // 2. Public key shape.
    if signer_public_key.len() < MIN_PUBLIC_KEY_LENGTH
        || signer_public_key.len() > MAX_PUBLIC_KEY_LENGTH
        || !signer_public_key.bytes().all(|b| b.is_ascii_alphanumeric())
    {
        return Err(ContractError::invalid_signature("malformed public key"));
    }

    // 3. Curve family.
    let family = classify_key(signer_public_key)?;

    // 4. Signer-to-address binding. Without this check anyone could sign
    //    with their own key while naming someone else as the actor.
    let derived = derive_address(signer_public_key)?;
    if derived != expected_address {
        return Err(ContractError::invalid_signature(
            "signer key does not match expected address",
        ));
    }

    // 5. Curve verification over the payload digest bytes.
    let message = signing_message(payload)?;
    let signature_bytes = hex::decode(signature_hex)
        .map_err(|_| ContractError::invalid_signature("malformed signature"))?;

    match family {
        KeyFamily::Ed25519 => verify_ed25519(signer_public_key, &message, &signature_bytes),
        KeyFamily::Secp256k1 => verify_secp256k1(signer_public_key, &message, &signature_bytes),
    }
}

fn verify_ed25519(
    public_key: &str,
    message: &[u8; 32],
    signature_bytes: &[u8],
) -> Result<(), ContractError> {
    // Strip the ED tag byte; the remaining 32 bytes are the curve point.
    let key_bytes = hex::decode(&public_key[2..])
        .map_err(|_| ContractError::invalid_signature("malformed public key"))?;
    let key_arr: [u8; 32] = key_bytes
        .as_slice()
        .try_into()
        .map_err(|_| ContractError::invalid_signature("malformed public key"))?;
    let verifying_key = Ed25519VerifyingKey::from_bytes(&key_arr)
        .map_err(|_| ContractError::invalid_signature("invalid Ed25519 public key"))?;

    let sig_arr: [u8; 64] = signature_bytes
        .try_into()
        .map_err(|_| ContractError::invalid_signature("malformed signature"))?;
    let signature = Ed25519Signature::from_bytes(&sig_arr);

    // Strict verification: rejects the cofactor edge cases lenient
    // implementations let through.
    verifying_key
        .verify_strict(message, &signature)
        .map_err(|_| ContractError::invalid_signature("signature verification failed"))
}

fn verify_secp256k1(
    public_key: &str,
    message: &[u8; 32],
    signature_bytes: &[u8],
) -> Result<(), ContractError> {
    let key_bytes = hex::decode(public_key)
        .map_err(|_| ContractError::invalid_signature("malformed public key"))?;
    let verifying_key = EcdsaVerifyingKey::from_sec1_bytes(&key_bytes)
        .map_err(|_| ContractError::invalid_signature("invalid secp256k1 public key"))?;

    // DER first (what ledger tooling emits), fixed 64-byte r||s as fallback.
    let signature = EcdsaSignature::from_der(signature_bytes)
        .or_else(|_| EcdsaSignature::from_slice(signature_bytes))
        .map_err(|_| ContractError::invalid_signature("malformed signature"))?;

    verifying_key
        .verify_prehash(message, &signature)
        .map_err(|_| ContractError::invalid_signature("signature verification failed"))
}
