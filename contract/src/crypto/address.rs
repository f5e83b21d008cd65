//! # Ledger Address Derivation
//!
//! A ledger classic address is the base58check rendering of a public key's
//! account identifier:
//!
//! ```text
//! public_key (33 bytes)
//!     -> SHA-256 -> RIPEMD-160          (20-byte account id)
//!     -> 0x00 || account_id             (25-byte payload with version)
//!     -> SHA-256(SHA-256(payload))[..4] (checksum)
//!     -> base58(payload || checksum)    (Ripple alphabet, leading 'r')
//! ```
//!
//! The Ripple base58 alphabet differs from Bitcoin's, which is why every
//! address starts with `r` instead of `1`. The four checksum bytes catch
//! copy-paste corruption before a request ever reaches signature
//! verification.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::config::{MAX_ADDRESS_LENGTH, MIN_ADDRESS_LENGTH};
use crate::error::ContractError;

/// Version byte prefixed to the account id before base58check encoding.
/// Zero for classic account addresses.
const ACCOUNT_ID_VERSION: u8 = 0x00;

/// Length of the versioned payload: 1 version byte + 20-byte account id.
const PAYLOAD_LENGTH: usize = 21;

/// Derive the ledger classic address for a hex-encoded public key.
///
/// Accepts the 33-byte key encodings used on the ledger: `ED || 32 bytes`
/// for Ed25519 and `02`/`03 || 32 bytes` for compressed secp256k1. Both
/// prefixes are valid hex, so the whole string decodes uniformly and the
/// account id is computed over all 33 bytes.
pub fn derive_address(public_key_hex: &str) -> Result<String, ContractError> {
    let key_bytes = hex::decode(public_key_hex)
        .map_err(|_| ContractError::invalid_signature("public key is not valid hex"))?;
    if key_bytes.len() != 33 {
        return Err(ContractError::invalid_signature(
            "public key must decode to 33 bytes",
        ));
    }

    let sha = Sha256::digest(&key_bytes);
    let account_id = Ripemd160::digest(sha);

    let mut payload = Vec::with_capacity(PAYLOAD_LENGTH + 4);
    payload.push(ACCOUNT_ID_VERSION);
    payload.extend_from_slice(&account_id);

    let checksum = double_sha256(&payload);
    payload.extend_from_slice(&checksum[..4]);

    Ok(bs58::encode(payload)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .into_string())
}

/// Validate a ledger classic address: length bounds, base58 decodability
/// with the Ripple alphabet, version byte, and checksum.
pub fn is_valid_address(address: &str) -> bool {
    if address.len() < MIN_ADDRESS_LENGTH || address.len() > MAX_ADDRESS_LENGTH {
        return false;
    }

    let Ok(decoded) = bs58::decode(address)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .into_vec()
    else {
        return false;
    };

    if decoded.len() != PAYLOAD_LENGTH + 4 || decoded[0] != ACCOUNT_ID_VERSION {
        return false;
    }

    let (payload, checksum) = decoded.split_at(PAYLOAD_LENGTH);
    double_sha256(payload)[..4] == *checksum
}

fn double_sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}
