use sealvote_types::{Address, LedgerEvent, Timestamp};
use serde::{Deserialize, Serialize};

/// A committed mutation of registry state.
///
/// Changes carry every value `apply` needs, so replay never consults the
/// clock or re-runs validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegistryChange {
    Genesis {
        admin: Address,
    },
    ProfileRegistered {
        user: Address,
        voting_weight: u32,
        registration_time: Timestamp,
    },
    WeightUpdated {
        user: Address,
        old_weight: u32,
        new_weight: u32,
    },
    Banned {
        user: Address,
        reason: String,
        banned_by: Address,
    },
    Unbanned {
        user: Address,
        unbanned_by: Address,
    },
    ModeratorAdded {
        moderator: Address,
        added_by: Address,
    },
    ModeratorRemoved {
        moderator: Address,
        removed_by: Address,
    },
    AdminTransferred {
        previous: Address,
        new_admin: Address,
    },
    Paused {
        by: Address,
    },
    Unpaused {
        by: Address,
    },
}

impl RegistryChange {
    /// Public event announcing this change. Genesis is not announced.
    pub fn event(&self) -> Option<LedgerEvent> {
        let event = match self {
            RegistryChange::Genesis { .. } => return None,
            RegistryChange::ProfileRegistered { user, voting_weight, registration_time } => {
                LedgerEvent::UserRegistered {
                    user: *user,
                    voting_weight: *voting_weight,
                    timestamp: *registration_time,
                }
            }
            RegistryChange::WeightUpdated { user, old_weight, new_weight } => {
                LedgerEvent::VotingWeightUpdated {
                    user: *user,
                    old_weight: *old_weight,
                    new_weight: *new_weight,
                }
            }
            RegistryChange::Banned { user, reason, banned_by } => LedgerEvent::UserBanned {
                user: *user,
                reason: reason.clone(),
                banned_by: *banned_by,
            },
            RegistryChange::Unbanned { user, unbanned_by } => LedgerEvent::UserUnbanned {
                user: *user,
                unbanned_by: *unbanned_by,
            },
            RegistryChange::ModeratorAdded { moderator, added_by } => LedgerEvent::ModeratorAdded {
                moderator: *moderator,
                added_by: *added_by,
            },
            RegistryChange::ModeratorRemoved { moderator, removed_by } => {
                LedgerEvent::ModeratorRemoved {
                    moderator: *moderator,
                    removed_by: *removed_by,
                }
            }
            RegistryChange::AdminTransferred { previous, new_admin } => {
                LedgerEvent::AdminTransferred {
                    previous: *previous,
                    new_admin: *new_admin,
                }
            }
            RegistryChange::Paused { by } => LedgerEvent::Paused { by: *by },
            RegistryChange::Unpaused { by } => LedgerEvent::Unpaused { by: *by },
        };
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_json_is_tagged() {
        let change = RegistryChange::Paused { by: Address::from_label("admin") };
        let json = serde_json::to_string(&change).unwrap();
        assert!(json.contains("\"kind\":\"paused\""));

        let back: RegistryChange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, change);
    }
}
