use sealvote_crypto::Ciphertext;
use sealvote_registry::RegistryChange;
use sealvote_types::{Address, LedgerEvent, ProposalId, Timestamp};
use serde::{Deserialize, Serialize};

/// A committed mutation of proposal state.
///
/// Vote changes carry the full accumulator vector after the ballot was
/// added, with every slot re-encrypted, and never the chosen option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerChange {
    ProposalCreated {
        proposal_id: ProposalId,
        creator: Address,
        title: String,
        description: String,
        options: Vec<String>,
        start_time: Timestamp,
        end_time: Timestamp,
        min_votes_for_reveal: u32,
        accumulators: Vec<Ciphertext>,
    },
    VoteRecorded {
        proposal_id: ProposalId,
        voter: Address,
        timestamp: Timestamp,
        accumulators: Vec<Ciphertext>,
    },
    RevealRequested {
        proposal_id: ProposalId,
        request_id: u64,
        requested_at: Timestamp,
    },
    ResultsRevealed {
        proposal_id: ProposalId,
        request_id: u64,
        counts: Vec<u32>,
        revealed_at: Timestamp,
    },
}

impl LedgerChange {
    pub fn proposal_id(&self) -> ProposalId {
        match self {
            LedgerChange::ProposalCreated { proposal_id, .. }
            | LedgerChange::VoteRecorded { proposal_id, .. }
            | LedgerChange::RevealRequested { proposal_id, .. }
            | LedgerChange::ResultsRevealed { proposal_id, .. } => *proposal_id,
        }
    }

    pub fn event(&self) -> LedgerEvent {
        match self {
            LedgerChange::ProposalCreated {
                proposal_id,
                creator,
                title,
                description,
                options,
                start_time,
                end_time,
                min_votes_for_reveal,
                ..
            } => LedgerEvent::ProposalCreated {
                proposal_id: *proposal_id,
                creator: *creator,
                title: title.clone(),
                description: description.clone(),
                options: options.clone(),
                start_time: *start_time,
                end_time: *end_time,
                min_votes_for_reveal: *min_votes_for_reveal,
            },
            LedgerChange::VoteRecorded { proposal_id, voter, timestamp, .. } => LedgerEvent::VoteCast {
                proposal_id: *proposal_id,
                voter: *voter,
                timestamp: *timestamp,
            },
            LedgerChange::RevealRequested { proposal_id, request_id, .. } => {
                LedgerEvent::RevealRequested {
                    proposal_id: *proposal_id,
                    request_id: *request_id,
                }
            }
            LedgerChange::ResultsRevealed { proposal_id, counts, .. } => LedgerEvent::ResultsRevealed {
                proposal_id: *proposal_id,
                counts: counts.clone(),
            },
        }
    }
}

/// Change to either component of the voting state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateChange {
    Registry(RegistryChange),
    Ledger(LedgerChange),
}

impl StateChange {
    pub fn event(&self) -> Option<LedgerEvent> {
        match self {
            StateChange::Registry(change) => change.event(),
            StateChange::Ledger(change) => Some(change.event()),
        }
    }
}

impl From<RegistryChange> for StateChange {
    fn from(change: RegistryChange) -> Self {
        StateChange::Registry(change)
    }
}

impl From<LedgerChange> for StateChange {
    fn from(change: LedgerChange) -> Self {
        StateChange::Ledger(change)
    }
}

/// One atomic commit: every change of a single operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub timestamp: Timestamp,
    pub changes: Vec<StateChange>,
}
