//! Ledger configuration and policy switches.

use sealvote_types::Address;
use serde::{Deserialize, Serialize};

/// Fewest options a proposal may offer.
pub const MIN_OPTIONS: usize = 2;
/// Most options a proposal may offer.
pub const MAX_OPTIONS: usize = 10;
/// Shortest voting window, in seconds.
pub const MIN_DURATION_SECS: u64 = 1;
/// Longest voting window (30 days), in seconds.
pub const MAX_DURATION_SECS: u64 = 30 * 24 * 60 * 60;

/// Whether `min_votes_for_reveal` gates `reveal_results`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealPolicy {
    /// Reveal fails with `InsufficientVotes` below the threshold
    #[default]
    Enforced,
    /// Threshold is informational only
    Advisory,
}

/// How a voter's weight enters the encrypted tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightPolicy {
    /// Contribution is the encrypted unit scaled by the voter's weight
    #[default]
    Weighted,
    /// Every ballot contributes one unit
    Flat,
}

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Identity ballots are bound to by their input proofs
    pub contract_address: Address,
    /// Admin installed when the ledger is first created
    pub genesis_admin: Address,
    pub reveal_policy: RevealPolicy,
    pub weight_policy: WeightPolicy,
    /// Buffered events per subscriber before lagging
    pub event_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            contract_address: Address::from_label("sealvote-ledger"),
            genesis_admin: Address::from_label("admin"),
            reveal_policy: RevealPolicy::default(),
            weight_policy: WeightPolicy::default(),
            event_capacity: 1024,
        }
    }
}

impl LedgerConfig {
    pub fn with_genesis_admin(mut self, admin: Address) -> Self {
        self.genesis_admin = admin;
        self
    }

    pub fn with_reveal_policy(mut self, policy: RevealPolicy) -> Self {
        self.reveal_policy = policy;
        self
    }

    pub fn with_weight_policy(mut self, policy: WeightPolicy) -> Self {
        self.weight_policy = policy;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.contract_address.is_zero() {
            return Err("contract_address cannot be the zero address".to_string());
        }
        if self.genesis_admin.is_zero() {
            return Err("genesis_admin cannot be the zero address".to_string());
        }
        if self.event_capacity == 0 {
            return Err("event_capacity must be positive".to_string());
        }
        Ok(())
    }
}
