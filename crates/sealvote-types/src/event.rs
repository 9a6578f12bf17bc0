//! Public ledger events.
//!
//! Events are the only notification channel for external observers. A vote
//! event names the proposal and the voter but never the chosen option or
//! the running tally.

use crate::{Address, ProposalId, Timestamp};

/// Event emitted once per successful state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "event", rename_all = "snake_case")
)]
pub enum LedgerEvent {
    UserRegistered {
        user: Address,
        voting_weight: u32,
        timestamp: Timestamp,
    },
    VotingWeightUpdated {
        user: Address,
        old_weight: u32,
        new_weight: u32,
    },
    UserBanned {
        user: Address,
        reason: String,
        banned_by: Address,
    },
    UserUnbanned {
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
    ProposalCreated {
        proposal_id: ProposalId,
        creator: Address,
        title: String,
        description: String,
        options: Vec<String>,
        start_time: Timestamp,
        end_time: Timestamp,
        min_votes_for_reveal: u32,
    },
    VoteCast {
        proposal_id: ProposalId,
        voter: Address,
        timestamp: Timestamp,
    },
    RevealRequested {
        proposal_id: ProposalId,
        request_id: u64,
    },
    ResultsRevealed {
        proposal_id: ProposalId,
        counts: Vec<u32>,
    },
}

impl LedgerEvent {
    /// Short event name, used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::UserRegistered { .. } => "UserRegistered",
            LedgerEvent::VotingWeightUpdated { .. } => "VotingWeightUpdated",
            LedgerEvent::UserBanned { .. } => "UserBanned",
            LedgerEvent::UserUnbanned { .. } => "UserUnbanned",
            LedgerEvent::ModeratorAdded { .. } => "ModeratorAdded",
            LedgerEvent::ModeratorRemoved { .. } => "ModeratorRemoved",
            LedgerEvent::AdminTransferred { .. } => "AdminTransferred",
            LedgerEvent::Paused { .. } => "Paused",
            LedgerEvent::Unpaused { .. } => "Unpaused",
            LedgerEvent::ProposalCreated { .. } => "ProposalCreated",
            LedgerEvent::VoteCast { .. } => "VoteCast",
            LedgerEvent::RevealRequested { .. } => "RevealRequested",
            LedgerEvent::ResultsRevealed { .. } => "ResultsRevealed",
        }
    }

    /// Proposal this event concerns, if any.
    pub fn proposal_id(&self) -> Option<ProposalId> {
        match self {
            LedgerEvent::ProposalCreated { proposal_id, .. }
            | LedgerEvent::VoteCast { proposal_id, .. }
            | LedgerEvent::RevealRequested { proposal_id, .. }
            | LedgerEvent::ResultsRevealed { proposal_id, .. } => Some(*proposal_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_name_and_proposal() {
        let event = LedgerEvent::VoteCast {
            proposal_id: 7,
            voter: Address::from_bytes([1u8; 20]),
            timestamp: 100,
        };
        assert_eq!(event.name(), "VoteCast");
        assert_eq!(event.proposal_id(), Some(7));

        let event = LedgerEvent::Paused { by: Address::ZERO };
        assert_eq!(event.proposal_id(), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_vote_event_json_has_no_option() {
        let event = LedgerEvent::VoteCast {
            proposal_id: 1,
            voter: Address::from_bytes([2u8; 20]),
            timestamp: 5,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"vote_cast\""));
        assert!(!json.contains("option"));
    }
}
