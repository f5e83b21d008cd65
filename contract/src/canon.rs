//! # Canonical Codec & Hasher
//!
//! Deterministic serialization of structured values to bytes, and the
//! SHA-256 digests built on top of it. This is the root of trust for the
//! whole contract: the signing preimage a client hashes must be
//! byte-identical to the one every replica reconstructs, and the state
//! digest replicas cross-check is a hash of these bytes. A single stray
//! space here is a consensus fault.
//!
//! ## Encoding rules
//!
//! - Primitives use their standard JSON literal form. Numbers must be
//!   finite; there is no NaN/Infinity in this protocol.
//! - Sequences serialize as `[a,b,c]` — commas only, no whitespace.
//! - Mappings serialize as `{"k1":v1,"k2":v2}` with keys sorted by the
//!   bytewise lexicographic order of their UTF-8 encoding. Sorting happens
//!   here, explicitly — we never rely on the map type's iteration order.
//! - Strings (including keys) are JSON-escaped.
//!
//! Three digest shapes are used across the contract:
//!
//! 1. `digest_value` — signing preimages and the whole-state digest.
//! 2. `sha256_hex` over a literal byte string — vault ids
//!    (`owner + ":" + salt`), simulated token ids, and error ids. These are
//!    plain concatenations, *not* canonical-encoded mappings.
//! 3. Raw `sha256_bytes` — the 32-byte message the signature verifier
//!    checks a signature against.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::ContractError;

// ---------------------------------------------------------------------------
// Canonical serialization
// ---------------------------------------------------------------------------

/// Serialize a structured value to its unique canonical byte string.
///
/// Fails with a programming-error kind on non-finite numbers. That failure
/// is producer-side: client payloads arrive as parsed JSON, which cannot
/// contain NaN, so hitting it means contract code built a bad value.
pub fn canonical_bytes(value: &Value) -> Result<Vec<u8>, ContractError> {
    let mut out = Vec::with_capacity(128);
    write_value(&mut out, value)?;
    Ok(out)
}

/// Canonical serialization as a `String`. The output is always valid UTF-8
/// because every byte written is either ASCII punctuation or part of a
/// JSON-escaped string.
pub fn canonical_string(value: &Value) -> Result<String, ContractError> {
    let bytes = canonical_bytes(value)?;
    String::from_utf8(bytes).map_err(|e| ContractError::unexpected(format!("canonical bytes not UTF-8: {e}")))
}

fn write_value(out: &mut Vec<u8>, value: &Value) -> Result<(), ContractError> {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if !f.is_finite() {
                    return Err(ContractError::unexpected(
                        "non-finite number in canonical value",
                    ));
                }
            }
            out.extend_from_slice(n.to_string().as_bytes());
        }
        Value::String(s) => write_json_string(out, s)?,
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(out, item)?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            // Collect and sort keys bytewise. `String`'s `Ord` is exactly
            // the bytewise lexicographic order of the UTF-8 encoding.
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();

            out.push(b'{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_json_string(out, key)?;
                out.push(b':');
                // Key came from the map, so the lookup cannot miss.
                write_value(out, &map[key.as_str()])?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

/// Emit a JSON-escaped, quoted string. Delegates the escaping to
/// serde_json so our escapes match the rest of the JSON ecosystem exactly
/// (control characters as `\uXXXX`, quote and backslash escaped, everything
/// else verbatim).
fn write_json_string(out: &mut Vec<u8>, s: &str) -> Result<(), ContractError> {
    serde_json::to_writer(&mut *out, s)
        .map_err(|e| ContractError::unexpected(format!("string escape failed: {e}")))
}

// ---------------------------------------------------------------------------
// Digests
// ---------------------------------------------------------------------------

/// SHA-256 of arbitrary bytes as a fixed array.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 of arbitrary bytes, rendered as 64 lowercase hex characters.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256_bytes(data))
}

/// Digest of a structured value: SHA-256 over its canonical bytes, as
/// lowercase hex. This is the hash clients sign and the hash replicas
/// compare state with.
pub fn digest_value(value: &Value) -> Result<String, ContractError> {
    Ok(sha256_hex(&canonical_bytes(value)?))
}

/// The 32-byte signing message for a payload: the digest hex re-interpreted
/// as raw bytes. Signatures are verified over these bytes, not over the
/// 64-character hex string.
pub fn signing_message(value: &Value) -> Result<[u8; 32], ContractError> {
    let hex_digest = digest_value(value)?;
    let raw = hex::decode(&hex_digest)
        .map_err(|e| ContractError::unexpected(format!("digest hex decode failed: {e}")))?;
    let mut msg = [0u8; 32];
    msg.copy_from_slice(&raw);
    Ok(msg)
}
