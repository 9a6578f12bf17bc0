use sealvote_types::{Address, Timestamp};
use serde::{Deserialize, Serialize};

/// Lowest weight a registered identity may hold.
pub const MIN_VOTING_WEIGHT: u32 = 1;
/// Highest weight a registered identity may hold.
pub const MAX_VOTING_WEIGHT: u32 = 100;

/// Per-identity registration record. Created on first registration and
/// never deleted.
///
/// The default value describes an unknown identity: unregistered, weight 0.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub is_registered: bool,
    pub is_banned: bool,
    pub voting_weight: u32,
    pub registration_time: Timestamp,
    pub ban_reason: String,
    pub banned_by: Address,
}

impl UserProfile {
    /// `is_registered && !is_banned`
    pub fn can_vote(&self) -> bool {
        self.is_registered && !self.is_banned
    }
}

/// Whether `weight` lies in the allowed range.
pub fn is_valid_weight(weight: u32) -> bool {
    (MIN_VOTING_WEIGHT..=MAX_VOTING_WEIGHT).contains(&weight)
}
