//! # Protocol Constants
//!
//! Every magic number in the XVault contract lives here. If you find
//! yourself hardcoding a limit somewhere else, move it here first.
//!
//! These values are consensus-relevant: replicas disagreeing on any of them
//! will diverge on the first request that touches the boundary. Changing one
//! is a breaking protocol revision.

// ---------------------------------------------------------------------------
// Rate Limiting
// ---------------------------------------------------------------------------

/// Maximum mutating operations a single address may commit within one
/// replica round. The counter resets wholesale when the round key changes.
pub const MAX_OPS_PER_ROUND: u32 = 5;

// ---------------------------------------------------------------------------
// Addresses & Salts
// ---------------------------------------------------------------------------

/// Minimum length of a ledger classic address.
pub const MIN_ADDRESS_LENGTH: usize = 25;

/// Maximum length of a ledger classic address.
pub const MAX_ADDRESS_LENGTH: usize = 40;

/// Minimum length of a vault salt (hex characters). Must be even.
pub const MIN_SALT_LENGTH: usize = 16;

/// Maximum length of a vault salt (hex characters).
pub const MAX_SALT_LENGTH: usize = 256;

// ---------------------------------------------------------------------------
// Signatures & Keys
// ---------------------------------------------------------------------------

/// Minimum plausible hex length for a signature. Anything shorter is
/// rejected before any curve work happens.
pub const MIN_SIGNATURE_HEX_LENGTH: usize = 16;

/// Minimum length of a signer public key string.
pub const MIN_PUBLIC_KEY_LENGTH: usize = 16;

/// Maximum length of a signer public key string.
pub const MAX_PUBLIC_KEY_LENGTH: usize = 80;

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// Minimum length of a content identifier string.
pub const MIN_CID_LENGTH: usize = 10;

/// Maximum length of a content identifier string.
pub const MAX_CID_LENGTH: usize = 120;

/// Maximum decoded size of an entry's encrypted blob. The blob itself is
/// never persisted by the contract (only its CID is), but the submitted
/// bytes still bound the signing preimage.
pub const MAX_ENTRY_BLOB_BYTES: usize = 1024 * 1024;

/// Entry metadata `service` field length bounds.
pub const MIN_SERVICE_LENGTH: usize = 1;
pub const MAX_SERVICE_LENGTH: usize = 128;

/// Entry metadata `username` field maximum length.
pub const MAX_USERNAME_LENGTH: usize = 256;

/// Entry metadata `notes` field maximum length.
pub const MAX_NOTES_LENGTH: usize = 4096;

/// Maximum number of per-member wrapped keys on a single entry.
pub const MAX_WRAPPED_KEYS: usize = 200;

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// Maximum number of addresses accepted in `initialAuthorized` at team
/// vault creation.
pub const MAX_INITIAL_AUTHORIZED: usize = 50;

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// URI minted into a fresh vault manifest token before the first manifest
/// rotation points it at real content.
pub const MANIFEST_PLACEHOLDER_URI: &str = "ipfs://placeholder-for-now";

/// Flag bit set on every minted URI token so the issuer can burn it during
/// vault revocation.
pub const URITOKEN_FLAG_BURNABLE: u64 = 1;

/// Transaction type names for the ledger's URI-token operations.
pub const TX_TYPE_URITOKEN_MINT: &str = "URITokenMint";
pub const TX_TYPE_URITOKEN_BURN: &str = "URITokenBurn";

// ---------------------------------------------------------------------------
// Password Backup Envelope
// ---------------------------------------------------------------------------

/// The only password-backup envelope version this contract accepts.
pub const PASSWORD_BACKUP_VERSION: u64 = 1;

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Default location of the single state file, relative to the process
/// working directory. Overridable at startup.
pub const DEFAULT_STATE_FILE: &str = "./state/xvault-state.json";
