//! Read-side index of proposals.
//!
//! The directory stores ids only. Active/ended classification is computed
//! from each proposal's window against the caller's `now`, so the index
//! never goes stale and can always be rebuilt from the ledger.

use crate::config::{LedgerConfig, RevealPolicy};
use crate::error::LedgerError;
use crate::proposal::{Proposal, ProposalLedger, RevealStatus};
use sealvote_registry::IdentityRegistry;
use sealvote_types::{Address, ProposalId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Per-proposal statistics for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalStats {
    pub total_voters: u64,
    pub time_remaining: u64,
    pub can_vote: bool,
    pub can_reveal: bool,
}

/// Counts across all proposals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySummary {
    pub total_proposals: u64,
    pub active: u64,
    pub ended: u64,
    pub revealed: u64,
    pub pending_reveals: u64,
    pub total_votes: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ProposalDirectory {
    ids: BTreeSet<ProposalId>,
}

impl ProposalDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruct the index from ledger state.
    pub fn rebuild(ledger: &ProposalLedger) -> Self {
        Self {
            ids: ledger.iter().map(|p| p.id).collect(),
        }
    }

    pub fn track(&mut self, id: ProposalId) {
        self.ids.insert(id);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn proposals<'a>(&'a self, ledger: &'a ProposalLedger) -> impl Iterator<Item = &'a Proposal> + 'a {
        self.ids.iter().filter_map(move |id| ledger.get(*id))
    }

    /// Proposals whose voting window contains `now`, ascending.
    pub fn active_proposals(&self, ledger: &ProposalLedger, now: Timestamp) -> Vec<ProposalId> {
        self.proposals(ledger)
            .filter(|p| p.is_voting_open(now))
            .map(|p| p.id)
            .collect()
    }

    /// Proposals whose voting window has closed, ascending. Revealed
    /// proposals are included.
    pub fn ended_proposals(&self, ledger: &ProposalLedger, now: Timestamp) -> Vec<ProposalId> {
        self.proposals(ledger)
            .filter(|p| p.has_ended(now))
            .map(|p| p.id)
            .collect()
    }

    pub fn proposal_stats(
        &self,
        ledger: &ProposalLedger,
        registry: &IdentityRegistry,
        config: &LedgerConfig,
        id: ProposalId,
        viewer: Option<&Address>,
        now: Timestamp,
    ) -> Result<ProposalStats, LedgerError> {
        let proposal = ledger.get(id).ok_or(LedgerError::ProposalNotFound(id))?;

        let can_vote = proposal.is_voting_open(now)
            && viewer.map_or(true, |v| registry.can_user_vote(v) && !proposal.has_voted(v));

        let threshold_ok = config.reveal_policy == RevealPolicy::Advisory || proposal.threshold_met();
        let can_reveal = proposal.has_ended(now)
            && matches!(proposal.reveal_status(), RevealStatus::NotRequested)
            && threshold_ok;

        Ok(ProposalStats {
            total_voters: proposal.total_voters(),
            time_remaining: proposal.time_remaining(now),
            can_vote,
            can_reveal,
        })
    }

    pub fn summary(&self, ledger: &ProposalLedger, now: Timestamp) -> DirectorySummary {
        let mut summary = DirectorySummary::default();
        for proposal in self.proposals(ledger) {
            summary.total_proposals += 1;
            summary.total_votes += proposal.total_voters();
            if proposal.is_voting_open(now) {
                summary.active += 1;
            }
            if proposal.has_ended(now) {
                summary.ended += 1;
            }
            match proposal.reveal_status() {
                RevealStatus::Pending { .. } => summary.pending_reveals += 1,
                RevealStatus::Revealed { .. } => summary.revealed += 1,
                RevealStatus::NotRequested => {}
            }
        }
        summary
    }
}
