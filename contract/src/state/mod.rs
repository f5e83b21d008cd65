//! # Vault State
//!
//! The typed, in-memory state every replica must agree on, byte for byte:
//!
//! ```text
//! types.rs   — Vault, Entry, invites, wrapped keys, the password-backup
//!              envelope, and listing summaries
//! store.rs   — VaultStore: every mutator, every invariant, the state digest
//! persist.rs — single-file load/save mirroring the store to disk
//! ```
//!
//! ## Design Principles
//!
//! 1. **Deterministic containers only.** Vaults live in a `BTreeMap`;
//!    everything ordered inside a vault is a `Vec` in insertion order.
//!    Nothing here iterates a hash map.
//! 2. **Round keys are opaque strings.** The runtime hands them to us
//!    monotonic per round; the store compares them, never interprets them
//!    beyond the documented numeric-else-bytewise ordering.
//! 3. **Mutators enforce invariants.** A `VaultStore` method either leaves
//!    the store satisfying every invariant or returns an error having
//!    changed nothing.
//! 4. **Serializable state.** Every struct serializes with the exact wire
//!    field names (camelCase), because the persisted file and the state
//!    digest are both derived from this serialization.

pub mod persist;
pub mod store;
pub mod types;

pub use store::VaultStore;
pub use types::{
    Entry, EntryMetadata, PasswordBackup, PendingInvite, Vault, VaultSummary, VaultType,
    WrappedKey,
};
