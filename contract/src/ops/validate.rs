//! # Payload Validation
//!
//! Shape and bounds checks for everything a client can send, ordered into
//! small single-purpose functions the handlers compose. All of this runs
//! before any cryptographic work: malformed input must fail on string
//! checks, not after an elliptic-curve verification it was never going to
//! pass.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{Map, Value};

use crate::config::{
    MAX_CID_LENGTH, MAX_ENTRY_BLOB_BYTES, MAX_INITIAL_AUTHORIZED, MAX_NOTES_LENGTH,
    MAX_SALT_LENGTH, MAX_SERVICE_LENGTH, MAX_USERNAME_LENGTH, MAX_WRAPPED_KEYS, MIN_CID_LENGTH,
    MIN_SALT_LENGTH,
};
use crate::crypto::address::is_valid_address;
use crate::error::{ContractError, ErrorCode};
use crate::state::types::{EntryMetadata, WrappedKey};

// ---------------------------------------------------------------------------
// Addresses & salts
// ---------------------------------------------------------------------------

/// Validate a ledger classic address, naming the offending field.
pub fn validate_address(address: &str, field: &str) -> Result<(), ContractError> {
    if !is_valid_address(address) {
        return Err(ContractError::new(
            ErrorCode::InvalidAddress,
            format!("invalid address in field: {field}"),
        ));
    }
    Ok(())
}

/// Validate a vault salt: even-length hex, 16–256 characters.
pub fn validate_salt(salt: &str) -> Result<(), ContractError> {
    let ok = salt.len() >= MIN_SALT_LENGTH
        && salt.len() <= MAX_SALT_LENGTH
        && salt.len() % 2 == 0
        && salt.bytes().all(|b| b.is_ascii_hexdigit());
    if !ok {
        return Err(ContractError::new(
            ErrorCode::InvalidSalt,
            "salt must be even-length hex, 16-256 characters",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Content identifiers
// ---------------------------------------------------------------------------

/// Validate a content identifier against the accepted grammars:
/// `Qm` + 44 base58btc chars (v0), `b` + base32 (v1), `k` + base36 (v1).
pub fn validate_cid(cid: &str) -> Result<(), ContractError> {
    if cid.len() >= MIN_CID_LENGTH && cid.len() <= MAX_CID_LENGTH && matches_cid_grammar(cid) {
        return Ok(());
    }
    Err(ContractError::new(
        ErrorCode::InvalidCid,
        format!("not a valid content identifier: {cid}"),
    ))
}

fn matches_cid_grammar(cid: &str) -> bool {
    if let Some(body) = cid.strip_prefix("Qm") {
        // v0: exactly 44 base58btc characters after the prefix.
        return body.len() == 44 && body.bytes().all(is_base58btc);
    }
    if let Some(body) = cid.strip_prefix('b') {
        // v1 base32 (lowercase rfc4648, no padding).
        return body.len() >= 20 && body.bytes().all(|b| b.is_ascii_lowercase() || (b'2'..=b'7').contains(&b));
    }
    if let Some(body) = cid.strip_prefix('k') {
        // v1 base36 (lowercase).
        return body.len() >= 20 && body.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase());
    }
    false
}

fn is_base58btc(b: u8) -> bool {
    b.is_ascii_alphanumeric() && !matches!(b, b'0' | b'O' | b'I' | b'l')
}

// ---------------------------------------------------------------------------
// Entry payload pieces
// ---------------------------------------------------------------------------

/// Validate the base64 encrypted blob: decodable, bounded, and equal to its
/// re-encoding modulo padding. The round-trip check rejects sloppy
/// encodings that would make the signing preimage ambiguous.
pub fn validate_encrypted_blob(blob: &str) -> Result<(), ContractError> {
    let decoded = BASE64
        .decode(blob)
        .map_err(|_| ContractError::invalid_input("encryptedBlob is not valid base64"))?;
    if decoded.len() > MAX_ENTRY_BLOB_BYTES {
        return Err(ContractError::invalid_input(format!(
            "encryptedBlob exceeds {MAX_ENTRY_BLOB_BYTES} bytes"
        )));
    }
    let reencoded = BASE64.encode(&decoded);
    if reencoded.trim_end_matches('=') != blob.trim_end_matches('=') {
        return Err(ContractError::invalid_input(
            "encryptedBlob is not canonical base64",
        ));
    }
    Ok(())
}

/// Parse and bounds-check entry metadata from the client value.
pub fn validate_entry_metadata(value: &Value) -> Result<EntryMetadata, ContractError> {
    let object = value.as_object().ok_or_else(|| {
        ContractError::new(ErrorCode::InvalidMetadata, "entryMetadata must be an object")
    })?;

    let service = match object.get("service") {
        Some(Value::String(s)) => s.clone(),
        _ => {
            return Err(ContractError::new(
                ErrorCode::InvalidMetadata,
                "entryMetadata.service is required",
            ))
        }
    };
    if service.is_empty() || service.len() > MAX_SERVICE_LENGTH {
        return Err(ContractError::new(
            ErrorCode::InvalidMetadata,
            format!("entryMetadata.service must be 1-{MAX_SERVICE_LENGTH} characters"),
        ));
    }

    let username = optional_bounded(object, "username", MAX_USERNAME_LENGTH)?;
    let notes = optional_bounded(object, "notes", MAX_NOTES_LENGTH)?;

    Ok(EntryMetadata {
        service,
        username,
        notes,
    })
}

fn optional_bounded(
    object: &Map<String, Value>,
    field: &str,
    max: usize,
) -> Result<Option<String>, ContractError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if !s.is_empty() && s.len() <= max => Ok(Some(s.clone())),
        Some(Value::String(_)) => Err(ContractError::new(
            ErrorCode::InvalidMetadata,
            format!("entryMetadata.{field} must be 1-{max} characters"),
        )),
        Some(_) => Err(ContractError::new(
            ErrorCode::InvalidMetadata,
            format!("entryMetadata.{field} must be a string"),
        )),
    }
}

/// Parse and validate the wrapped-keys array: at most 200 items, each with
/// a valid member address and base64 key material.
pub fn validate_wrapped_keys(value: &Value) -> Result<Vec<WrappedKey>, ContractError> {
    let items = value
        .as_array()
        .ok_or_else(|| ContractError::invalid_input("wrappedKeys must be an array"))?;
    if items.len() > MAX_WRAPPED_KEYS {
        return Err(ContractError::invalid_input(format!(
            "wrappedKeys exceeds {MAX_WRAPPED_KEYS} items"
        )));
    }

    let mut keys = Vec::with_capacity(items.len());
    for item in items {
        let address = item
            .get("address")
            .and_then(Value::as_str)
            .ok_or_else(|| ContractError::invalid_input("wrappedKeys[].address is required"))?;
        validate_address(address, "wrappedKeys[].address")?;

        let encrypted_key = item
            .get("encryptedKey")
            .and_then(Value::as_str)
            .ok_or_else(|| ContractError::invalid_input("wrappedKeys[].encryptedKey is required"))?;
        if encrypted_key.is_empty() || BASE64.decode(encrypted_key).is_err() {
            return Err(ContractError::invalid_input(
                "wrappedKeys[].encryptedKey must be base64",
            ));
        }

        keys.push(WrappedKey {
            address: address.to_string(),
            encrypted_key: encrypted_key.to_string(),
        });
    }
    Ok(keys)
}

// ---------------------------------------------------------------------------
// Vault metadata & team lists
// ---------------------------------------------------------------------------

/// The vault metadata payload field as an owned object map.
pub fn validate_metadata_object(value: &Value) -> Result<Map<String, Value>, ContractError> {
    match value {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map.clone()),
        _ => Err(ContractError::new(
            ErrorCode::InvalidMetadata,
            "metadata must be an object",
        )),
    }
}

/// Validate `initialAuthorized`: at most 50 entries, all valid addresses.
pub fn validate_initial_authorized(value: &Value) -> Result<Vec<String>, ContractError> {
    let items = value
        .as_array()
        .ok_or_else(|| ContractError::invalid_input("initialAuthorized must be an array"))?;
    if items.len() > MAX_INITIAL_AUTHORIZED {
        return Err(ContractError::invalid_input(format!(
            "initialAuthorized exceeds {MAX_INITIAL_AUTHORIZED} entries"
        )));
    }

    let mut members = Vec::with_capacity(items.len());
    for item in items {
        let address = item
            .as_str()
            .ok_or_else(|| ContractError::invalid_input("initialAuthorized entries must be strings"))?;
        validate_address(address, "initialAuthorized[]")?;
        members.push(address.to_string());
    }
    Ok(members)
}

/// Validate a hex string field (e.g. `newBlobHex`).
pub fn validate_hex(value: &str, field: &str) -> Result<(), ContractError> {
    if value.is_empty() || value.len() % 2 != 0 || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ContractError::invalid_input(format!(
            "field must be even-length hex: {field}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const GOOD_ADDRESS: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";
    const CID_V0: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
    const CID_V1_B32: &str = "bafybeigdyrztf4f6xsl54n4xq4m5gxezm5q4za2ojx6x7lf5y3w4f4xhqy";
    const CID_V1_B36: &str = "k51qzi5uqu5dgutdk6i1ynyzgkqngpha5xpgia3a5qqp4jsh0u4csozksxel2r";

    #[test]
    fn accepts_all_three_cid_grammars() {
        assert!(validate_cid(CID_V0).is_ok());
        assert!(validate_cid(CID_V1_B32).is_ok());
        assert!(validate_cid(CID_V1_B36).is_ok());
    }

    #[test]
    fn rejects_malformed_cids() {
        for bad in [
            "not-a-cid",
            "Qmtooshort",
            // v0 with a forbidden base58 character ('0').
            "Qm0wAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG",
            // v1 base32 with uppercase.
            "bAFYBEIGDYRZT",
            "x123456789012345678901234567890",
            "",
        ] {
            assert!(validate_cid(bad).is_err(), "should reject: {bad}");
        }
    }

    #[test]
    fn rejects_overlong_cid() {
        let long = format!("b{}", "a".repeat(130));
        assert!(validate_cid(&long).is_err());
    }

    #[test]
    fn salt_bounds() {
        assert!(validate_salt("aabbccddeeff0011").is_ok());
        assert!(validate_salt(&"ab".repeat(128)).is_ok());
        // Too short, odd length, non-hex, too long.
        assert!(validate_salt("aabb").is_err());
        assert!(validate_salt("aabbccddeeff001").is_err());
        assert!(validate_salt("gghhiijjkkllmmnn").is_err());
        assert!(validate_salt(&"ab".repeat(129)).is_err());
    }

    #[test]
    fn address_validation_names_the_field() {
        let err = validate_address("nonsense", "owner").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAddress);
        assert!(err.message.contains("owner"));
        assert!(validate_address(GOOD_ADDRESS, "owner").is_ok());
    }

    #[test]
    fn blob_round_trip_check() {
        assert!(validate_encrypted_blob("aGVsbG8=").is_ok());
        // Unpadded form of the same bytes is accepted.
        assert!(validate_encrypted_blob("aGVsbG8").is_ok());
        assert!(validate_encrypted_blob("not base64 !!!").is_err());
    }

    #[test]
    fn blob_size_bound() {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine as _;
        let at_limit = STANDARD.encode(vec![0u8; MAX_ENTRY_BLOB_BYTES]);
        assert!(validate_encrypted_blob(&at_limit).is_ok());
        let over = STANDARD.encode(vec![0u8; MAX_ENTRY_BLOB_BYTES + 1]);
        assert!(validate_encrypted_blob(&over).is_err());
    }

    #[test]
    fn entry_metadata_happy_path() {
        let meta =
            validate_entry_metadata(&json!({"service": "github", "username": "mike"})).unwrap();
        assert_eq!(meta.service, "github");
        assert_eq!(meta.username.as_deref(), Some("mike"));
        assert_eq!(meta.notes, None);
    }

    #[test]
    fn entry_metadata_bounds() {
        assert!(validate_entry_metadata(&json!({})).is_err());
        assert!(validate_entry_metadata(&json!({"service": ""})).is_err());
        assert!(validate_entry_metadata(&json!({"service": "s".repeat(129)})).is_err());
        assert!(
            validate_entry_metadata(&json!({"service": "ok", "notes": "n".repeat(4097)})).is_err()
        );
        // Null optionals are fine.
        assert!(
            validate_entry_metadata(&json!({"service": "ok", "username": null, "notes": null}))
                .is_ok()
        );
    }

    #[test]
    fn wrapped_keys_validation() {
        let good = json!([{"address": GOOD_ADDRESS, "encryptedKey": "aGVsbG8="}]);
        let keys = validate_wrapped_keys(&good).unwrap();
        assert_eq!(keys.len(), 1);

        assert!(validate_wrapped_keys(&json!([{"address": "bad", "encryptedKey": "aGk="}])).is_err());
        assert!(
            validate_wrapped_keys(&json!([{"address": GOOD_ADDRESS, "encryptedKey": "!!"}]))
                .is_err()
        );
        assert!(validate_wrapped_keys(&json!("not-an-array")).is_err());
    }

    #[test]
    fn wrapped_keys_count_bound() {
        let item = json!({"address": GOOD_ADDRESS, "encryptedKey": "aGk="});
        let over: Vec<_> = std::iter::repeat(item).take(MAX_WRAPPED_KEYS + 1).collect();
        assert!(validate_wrapped_keys(&Value::Array(over)).is_err());
    }

    #[test]
    fn initial_authorized_validation() {
        let good = json!([GOOD_ADDRESS]);
        assert_eq!(validate_initial_authorized(&good).unwrap().len(), 1);

        assert!(validate_initial_authorized(&json!(["bad-address"])).is_err());

        let over: Vec<_> = std::iter::repeat(json!(GOOD_ADDRESS))
            .take(MAX_INITIAL_AUTHORIZED + 1)
            .collect();
        assert!(validate_initial_authorized(&Value::Array(over)).is_err());
    }

    #[test]
    fn metadata_object_accepts_null_as_empty() {
        assert!(validate_metadata_object(&Value::Null).unwrap().is_empty());
        assert!(validate_metadata_object(&json!({"k": 1})).is_ok());
        assert!(validate_metadata_object(&json!([1, 2])).is_err());
    }

    #[test]
    fn hex_field_validation() {
        assert!(validate_hex("deadBEEF", "newBlobHex").is_ok());
        assert!(validate_hex("abc", "newBlobHex").is_err());
        assert!(validate_hex("zz", "newBlobHex").is_err());
        assert!(validate_hex("", "newBlobHex").is_err());
    }
}
