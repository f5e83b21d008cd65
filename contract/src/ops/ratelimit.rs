//! # Per-Round Rate Limiting
//!
//! At most five mutating operations per address per replica round. The
//! limiter holds exactly one round's counters: the first operation carrying
//! a new round key throws away every count from the previous round.
//!
//! Determinism note: the counter map is keyed by address but never
//! iterated — lookups and inserts only — so a `HashMap` is safe here even
//! though the committed state sticks to ordered containers.

use std::collections::HashMap;

use crate::config::MAX_OPS_PER_ROUND;
use crate::error::{ContractError, ErrorCode};

/// Tracks mutating-operation counts for the current round.
#[derive(Debug, Default)]
pub struct RateLimiter {
    current_round: Option<String>,
    per_address_count: HashMap<String, u32>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Charge one mutating operation to `actor` within `round_key`.
    ///
    /// Fails with `RateLimitExceeded` when the actor has already used its
    /// budget this round; the failed attempt itself is not charged.
    pub fn enforce(&mut self, actor: &str, round_key: &str) -> Result<(), ContractError> {
        if self.current_round.as_deref() != Some(round_key) {
            // New round: a single set of counters lives at a time.
            self.current_round = Some(round_key.to_string());
            self.per_address_count.clear();
        }

        let count = self.per_address_count.entry(actor.to_string()).or_insert(0);
        if *count >= MAX_OPS_PER_ROUND {
            return Err(ContractError::new(
                ErrorCode::RateLimitExceeded,
                format!("rate limit exceeded for {actor}: max {MAX_OPS_PER_ROUND} operations per round"),
            ));
        }
        *count += 1;
        Ok(())
    }

    /// Operations charged to `actor` in the current round.
    pub fn count_for(&self, actor: &str) -> u32 {
        self.per_address_count.get(actor).copied().unwrap_or(0)
    }
}
