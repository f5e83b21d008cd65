//! # Request Authentication
//!
//! Everything needed to decide "did the address this operation claims to
//! come from really sign it?":
//!
//! ```text
//! address.rs — ledger classic-address derivation and validation
//!              (SHA-256 → RIPEMD-160 → base58check, Ripple alphabet)
//! verify.rs  — signature verification over two curves, dispatched by
//!              public-key prefix, bound to an expected address
//! ```
//!
//! Both halves are pure functions over their inputs — no I/O, no state.
//! Every failure in this module surfaces as `InvalidSignature`; callers and
//! attackers get the same coarse answer.

pub mod address;
pub mod verify;

pub use address::{derive_address, is_valid_address};
pub use verify::{verify_request, KeyFamily};
