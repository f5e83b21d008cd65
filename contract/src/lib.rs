// Copyright (c) 2026 XVault Contributors. MIT License.
// See LICENSE for details.

//! # XVault Contract — Core Library
//!
//! The contract-side state machine of XVault, a decentralized secrets vault
//! whose server half runs inside a deterministic replicated runtime. Every
//! replica executes the same ordered request sequence and must arrive at a
//! byte-identical state digest, so every piece of this crate is written with
//! one question in mind: *is this reproducible on every node?*
//!
//! The contract never sees plaintext secrets. Clients encrypt before they
//! submit; the contract stores ciphertext references (IPFS CIDs), membership
//! and authorization state, and ledger token identifiers.
//!
//! ## Architecture
//!
//! - **canon** — Canonical serialization and SHA-256 digests. The signing
//!   preimage, vault ids, and the replica state digest all come from here.
//! - **crypto** — Request authentication: signature verification over two
//!   curves (Ed25519, secp256k1) and ledger address derivation/binding.
//! - **state** — The typed vault/entry/invite store, its invariants, and
//!   single-file persistence.
//! - **ops** — One handler per operation, plus rate limiting, payload
//!   validation, audit records, and the response envelopes.
//! - **token** — The URI-token mint/burn adapter: real ledger submission
//!   when a client and signers are wired in, deterministic simulation
//!   otherwise.
//! - **config** — Protocol constants. Every limit lives here, nowhere else.
//!
//! ## Design Philosophy
//!
//! 1. Determinism beats convenience. No wall clocks, no RNG, no iteration
//!    over unordered maps anywhere near committed state.
//! 2. Validate shape before touching cryptography — cheap failures first.
//! 3. All state mutation is synchronous; the only suspension points are the
//!    ledger adapter and the persistence write.
//! 4. If it guards someone's secrets, it has tests. Plural.

pub mod canon;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ops;
pub mod state;
pub mod token;

pub use error::{ContractError, ErrorCode};
pub use ops::{Dispatcher, DispatcherConfig, Request, Response};
pub use state::store::VaultStore;
pub use token::TokenAdapter;
