//! Proposal state machine and encrypted tallies.
//!
//! Phases are derived from the wall clock and the reveal state:
//! `Created -> Active -> Ended -> Revealed`. Nothing is scheduled; every
//! check compares against the `now` of the calling operation.

use crate::change::LedgerChange;
use crate::config::{
    LedgerConfig, RevealPolicy, WeightPolicy, MAX_DURATION_SECS, MAX_OPTIONS, MIN_DURATION_SECS,
    MIN_OPTIONS,
};
use crate::error::LedgerError;
use sealvote_crypto::{
    Ciphertext, DecryptionRequest, EncryptedArithmetic, InputProof, RevealDelivery, RevealOracle,
};
use sealvote_registry::IdentityRegistry;
use sealvote_types::{Address, ProposalId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Lifecycle phase of a proposal at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalPhase {
    /// Before `start_time`
    Created,
    /// `start_time <= now <= end_time`
    Active,
    /// After `end_time`, results not yet revealed
    Ended,
    Revealed,
}

/// Progress of the two-phase reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RevealStatus {
    NotRequested,
    Pending {
        request_id: u64,
        requested_at: Timestamp,
    },
    Revealed {
        request_id: u64,
        counts: Vec<u32>,
        revealed_at: Timestamp,
    },
}

impl RevealStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, RevealStatus::Pending { .. })
    }

    pub fn is_revealed(&self) -> bool {
        matches!(self, RevealStatus::Revealed { .. })
    }
}

/// A proposal with its encrypted per-option accumulators.
///
/// Only voter membership is tracked; the option a voter chose is folded
/// into the accumulators and not stored anywhere.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub id: ProposalId,
    pub creator: Address,
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub min_votes_for_reveal: u32,
    accumulators: Vec<Ciphertext>,
    voters: HashSet<Address>,
    reveal: RevealStatus,
}

impl Proposal {
    pub fn phase(&self, now: Timestamp) -> ProposalPhase {
        if self.reveal.is_revealed() {
            ProposalPhase::Revealed
        } else if now < self.start_time {
            ProposalPhase::Created
        } else if now <= self.end_time {
            ProposalPhase::Active
        } else {
            ProposalPhase::Ended
        }
    }

    /// `start_time <= now <= end_time`, regardless of reveal state.
    pub fn is_voting_open(&self, now: Timestamp) -> bool {
        self.start_time <= now && now <= self.end_time
    }

    pub fn has_ended(&self, now: Timestamp) -> bool {
        now > self.end_time
    }

    pub fn has_voted(&self, identity: &Address) -> bool {
        self.voters.contains(identity)
    }

    pub fn total_voters(&self) -> u64 {
        self.voters.len() as u64
    }

    pub fn threshold_met(&self) -> bool {
        self.total_voters() >= u64::from(self.min_votes_for_reveal)
    }

    pub fn accumulator(&self, option_index: u32) -> Option<&Ciphertext> {
        self.accumulators.get(option_index as usize)
    }

    pub fn reveal_status(&self) -> &RevealStatus {
        &self.reveal
    }

    pub fn is_revealed(&self) -> bool {
        self.reveal.is_revealed()
    }

    /// Seconds left in the voting window; 0 once it has closed.
    pub fn time_remaining(&self, now: Timestamp) -> u64 {
        if now > self.end_time {
            0
        } else {
            self.end_time - now
        }
    }

    /// Decryption request covering every option accumulator.
    pub fn decryption_request(&self, request_id: u64) -> DecryptionRequest {
        DecryptionRequest {
            request_id,
            proposal_id: self.id,
            entries: self
                .accumulators
                .iter()
                .enumerate()
                .map(|(index, ct)| (index as u32, ct.clone()))
                .collect(),
        }
    }

    pub fn info(&self, now: Timestamp) -> ProposalInfo {
        ProposalInfo {
            id: self.id,
            creator: self.creator,
            title: self.title.clone(),
            description: self.description.clone(),
            options: self.options.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            min_votes_for_reveal: self.min_votes_for_reveal,
            is_active: self.is_voting_open(now),
            is_revealed: self.is_revealed(),
            total_voters: self.total_voters(),
        }
    }
}

/// Public metadata of a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalInfo {
    pub id: ProposalId,
    pub creator: Address,
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub min_votes_for_reveal: u32,
    pub is_active: bool,
    pub is_revealed: bool,
    pub total_voters: u64,
}

/// Everything a ledger plan consults besides the ledger itself.
pub struct PlanContext<'a> {
    pub engine: &'a dyn EncryptedArithmetic,
    pub registry: &'a IdentityRegistry,
    pub config: &'a LedgerConfig,
    pub now: Timestamp,
}

/// Outcome of planning a reveal request.
#[derive(Debug)]
pub enum RevealPlan {
    /// A request is already outstanding; nothing to submit
    AlreadyPending { request_id: u64, requested_at: Timestamp },
    /// Submit `request` to the oracle, then commit `change`
    Submit { request: DecryptionRequest, change: LedgerChange },
}

/// All proposals, keyed by id.
#[derive(Debug, Clone)]
pub struct ProposalLedger {
    proposals: BTreeMap<ProposalId, Proposal>,
    next_id: ProposalId,
    next_request_id: u64,
}

impl Default for ProposalLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ProposalLedger {
    pub fn new() -> Self {
        Self {
            proposals: BTreeMap::new(),
            next_id: 1,
            next_request_id: 1,
        }
    }

    // ---- reads ----

    pub fn get(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    fn existing(&self, id: ProposalId) -> Result<&Proposal, LedgerError> {
        self.proposals.get(&id).ok_or(LedgerError::ProposalNotFound(id))
    }

    /// Proposals in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    pub fn proposal_count(&self) -> u64 {
        self.proposals.len() as u64
    }

    /// False for unknown proposals.
    pub fn has_user_voted(&self, id: ProposalId, identity: &Address) -> bool {
        self.proposals.get(&id).map_or(false, |p| p.has_voted(identity))
    }

    pub fn proposal_info(&self, id: ProposalId, now: Timestamp) -> Result<ProposalInfo, LedgerError> {
        Ok(self.existing(id)?.info(now))
    }

    pub fn reveal_status(&self, id: ProposalId) -> Result<RevealStatus, LedgerError> {
        Ok(self.existing(id)?.reveal.clone())
    }

    pub fn decrypted_results(&self, id: ProposalId) -> Result<Vec<u32>, LedgerError> {
        match &self.existing(id)?.reveal {
            RevealStatus::Revealed { counts, .. } => Ok(counts.clone()),
            _ => Err(LedgerError::NotRevealed),
        }
    }

    pub fn decrypted_vote_count(&self, id: ProposalId, option_index: u32) -> Result<u32, LedgerError> {
        match &self.existing(id)?.reveal {
            RevealStatus::Revealed { counts, .. } => counts
                .get(option_index as usize)
                .copied()
                .ok_or(LedgerError::InvalidOption(option_index)),
            _ => Err(LedgerError::NotRevealed),
        }
    }

    /// Ids of proposals `identity` has voted on, ascending.
    pub fn voted_proposals(&self, identity: &Address) -> Vec<ProposalId> {
        self.proposals
            .values()
            .filter(|p| p.has_voted(identity))
            .map(|p| p.id)
            .collect()
    }

    /// Requests for every reveal still awaiting its oracle answer.
    pub fn pending_requests(&self) -> Vec<DecryptionRequest> {
        self.proposals
            .values()
            .filter_map(|p| match p.reveal {
                RevealStatus::Pending { request_id, .. } => Some(p.decryption_request(request_id)),
                _ => None,
            })
            .collect()
    }

    // ---- planning ----

    #[allow(clippy::too_many_arguments)]
    pub fn plan_create_proposal(
        &self,
        ctx: &PlanContext<'_>,
        creator: Address,
        title: String,
        description: String,
        options: Vec<String>,
        duration: u64,
        min_votes_for_reveal: u32,
    ) -> Result<(ProposalId, LedgerChange), LedgerError> {
        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
            return Err(LedgerError::InvalidOptionCount(options.len()));
        }
        if !(MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(&duration) {
            return Err(LedgerError::InvalidDuration(duration));
        }
        if min_votes_for_reveal == 0 {
            return Err(LedgerError::InvalidMinVotes);
        }

        let proposal_id = self.next_id;
        let accumulators = options.iter().map(|_| ctx.engine.trivial_encrypt(0)).collect();

        tracing::debug!(proposal_id, options = options.len(), duration, "Planned proposal");

        Ok((
            proposal_id,
            LedgerChange::ProposalCreated {
                proposal_id,
                creator,
                title,
                description,
                options,
                start_time: ctx.now,
                end_time: ctx.now + duration,
                min_votes_for_reveal,
                accumulators,
            },
        ))
    }

    pub fn plan_cast_vote(
        &self,
        ctx: &PlanContext<'_>,
        voter: Address,
        id: ProposalId,
        option_index: u32,
        encrypted_one: &Ciphertext,
        proof: &InputProof,
    ) -> Result<LedgerChange, LedgerError> {
        let proposal = self.existing(id)?;
        if !proposal.is_voting_open(ctx.now) {
            return Err(LedgerError::VotingNotActive);
        }
        if !ctx.registry.can_user_vote(&voter) {
            return Err(LedgerError::NotEligible);
        }
        if proposal.has_voted(&voter) {
            return Err(LedgerError::AlreadyVoted);
        }
        let Some(current) = proposal.accumulator(option_index) else {
            return Err(LedgerError::InvalidOption(option_index));
        };
        if !ctx
            .engine
            .verify_input_proof(encrypted_one, proof, &ctx.config.contract_address, &voter)
        {
            tracing::warn!(proposal_id = id, voter = %voter, "Rejected ballot with invalid input proof");
            return Err(LedgerError::InvalidProof);
        }

        let contribution = match ctx.config.weight_policy {
            WeightPolicy::Weighted => {
                let weight = ctx.registry.voting_weight(&voter);
                ctx.engine.scalar_mul(encrypted_one, weight)?
            }
            WeightPolicy::Flat => encrypted_one.clone(),
        };

        // Every slot gets a new ciphertext so the record does not single out the chosen one.
        let accumulators = proposal
            .accumulators
            .iter()
            .enumerate()
            .map(|(i, acc)| {
                if i == option_index as usize {
                    ctx.engine.add(current, &contribution)
                } else {
                    ctx.engine.rerandomize(acc)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LedgerChange::VoteRecorded {
            proposal_id: id,
            voter,
            timestamp: ctx.now,
            accumulators,
        })
    }

    pub fn plan_request_reveal(
        &self,
        ctx: &PlanContext<'_>,
        caller: Address,
        id: ProposalId,
    ) -> Result<RevealPlan, LedgerError> {
        let proposal = self.existing(id)?;
        if caller != proposal.creator {
            return Err(LedgerError::Unauthorized("only the creator can reveal".to_string()));
        }
        if proposal.is_revealed() {
            return Err(LedgerError::AlreadyRevealed);
        }
        if !proposal.has_ended(ctx.now) {
            return Err(LedgerError::VotingStillActive);
        }
        if ctx.config.reveal_policy == RevealPolicy::Enforced && !proposal.threshold_met() {
            return Err(LedgerError::InsufficientVotes {
                actual: proposal.total_voters(),
                required: u64::from(proposal.min_votes_for_reveal),
            });
        }
        if let RevealStatus::Pending { request_id, requested_at } = proposal.reveal {
            return Ok(RevealPlan::AlreadyPending { request_id, requested_at });
        }

        let request_id = self.next_request_id;
        Ok(RevealPlan::Submit {
            request: proposal.decryption_request(request_id),
            change: LedgerChange::RevealRequested {
                proposal_id: id,
                request_id,
                requested_at: ctx.now,
            },
        })
    }

    /// Validate an oracle delivery. `Ok(None)` when the same request was
    /// already applied.
    pub fn plan_complete_reveal(
        &self,
        oracle: &dyn RevealOracle,
        delivery: &RevealDelivery,
        now: Timestamp,
    ) -> Result<Option<LedgerChange>, LedgerError> {
        let proposal = self.existing(delivery.proposal_id)?;
        let pending = match &proposal.reveal {
            RevealStatus::Revealed { request_id, .. } if *request_id == delivery.request_id => {
                return Ok(None)
            }
            RevealStatus::Pending { request_id, .. } if *request_id == delivery.request_id => *request_id,
            _ => return Err(LedgerError::UnknownRevealRequest(delivery.request_id)),
        };

        if delivery.results.len() != proposal.options.len() {
            return Err(LedgerError::InvalidRevealDelivery(format!(
                "expected {} results, got {}",
                proposal.options.len(),
                delivery.results.len()
            )));
        }

        let request = proposal.decryption_request(pending);
        if !oracle.verify_attestation(&request, delivery) {
            tracing::warn!(
                proposal_id = delivery.proposal_id,
                request_id = delivery.request_id,
                "Rejected reveal delivery with invalid attestation"
            );
            return Err(LedgerError::InvalidAttestation);
        }

        Ok(Some(LedgerChange::ResultsRevealed {
            proposal_id: delivery.proposal_id,
            request_id: pending,
            counts: delivery.results.clone(),
            revealed_at: now,
        }))
    }

    // ---- apply ----

    /// Fold a committed change into state. Used for live commits and replay.
    pub fn apply(&mut self, change: &LedgerChange) {
        match change {
            LedgerChange::ProposalCreated {
                proposal_id,
                creator,
                title,
                description,
                options,
                start_time,
                end_time,
                min_votes_for_reveal,
                accumulators,
            } => {
                self.proposals.insert(
                    *proposal_id,
                    Proposal {
                        id: *proposal_id,
                        creator: *creator,
                        title: title.clone(),
                        description: description.clone(),
                        options: options.clone(),
                        start_time: *start_time,
                        end_time: *end_time,
                        min_votes_for_reveal: *min_votes_for_reveal,
                        accumulators: accumulators.clone(),
                        voters: HashSet::new(),
                        reveal: RevealStatus::NotRequested,
                    },
                );
                self.next_id = self.next_id.max(proposal_id + 1);
            }
            LedgerChange::VoteRecorded { proposal_id, voter, accumulators, .. } => {
                if let Some(proposal) = self.proposals.get_mut(proposal_id) {
                    proposal.accumulators = accumulators.clone();
                    proposal.voters.insert(*voter);
                }
            }
            LedgerChange::RevealRequested { proposal_id, request_id, requested_at } => {
                if let Some(proposal) = self.proposals.get_mut(proposal_id) {
                    proposal.reveal = RevealStatus::Pending {
                        request_id: *request_id,
                        requested_at: *requested_at,
                    };
                }
                self.next_request_id = self.next_request_id.max(request_id + 1);
            }
            LedgerChange::ResultsRevealed { proposal_id, request_id, counts, revealed_at } => {
                if let Some(proposal) = self.proposals.get_mut(proposal_id) {
                    proposal.reveal = RevealStatus::Revealed {
                        request_id: *request_id,
                        counts: counts.clone(),
                        revealed_at: *revealed_at,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealvote_crypto::{MockDecryptor, MockEngine};
    use sealvote_registry::RegistryChange;
    use std::sync::Arc;

    const T0: Timestamp = 1_000;

    fn admin() -> Address {
        Address::from_label("admin")
    }

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn bob() -> Address {
        Address::from_label("bob")
    }

    struct Fixture {
        engine: Arc<MockEngine>,
        registry: IdentityRegistry,
        config: LedgerConfig,
        ledger: ProposalLedger,
    }

    impl Fixture {
        fn new() -> Self {
            let mut registry = IdentityRegistry::with_admin(admin());
            for (user, weight) in [(alice(), 1), (bob(), 5)] {
                registry.apply(&RegistryChange::ProfileRegistered {
                    user,
                    voting_weight: weight,
                    registration_time: T0,
                });
            }
            Self {
                engine: Arc::new(MockEngine::from_seed("proposal-tests")),
                registry,
                config: LedgerConfig::default(),
                ledger: ProposalLedger::new(),
            }
        }

        fn ctx(&self, now: Timestamp) -> PlanContext<'_> {
            PlanContext {
                engine: self.engine.as_ref(),
                registry: &self.registry,
                config: &self.config,
                now,
            }
        }

        fn create(&mut self, options: usize, duration: u64, min_votes: u32) -> ProposalId {
            let opts = (0..options).map(|i| format!("option {}", i)).collect();
            let (id, change) = self
                .ledger
                .plan_create_proposal(&self.ctx(T0), alice(), "t".into(), "d".into(), opts, duration, min_votes)
                .unwrap();
            self.ledger.apply(&change);
            id
        }

        fn vote(&mut self, voter: Address, id: ProposalId, option: u32, now: Timestamp) -> Result<(), LedgerError> {
            let (ct, proof) = self.engine.encrypt_input(1, &self.config.contract_address, &voter);
            let change = self.ledger.plan_cast_vote(&self.ctx(now), voter, id, option, &ct, &proof)?;
            self.ledger.apply(&change);
            Ok(())
        }

        fn tally(&self, id: ProposalId, option: u32) -> u32 {
            let ct = self.ledger.get(id).unwrap().accumulator(option).unwrap();
            self.engine.decrypt(ct).unwrap()
        }
    }

    #[test]
    fn test_create_validation_order() {
        let f = Fixture::new();
        let ctx = f.ctx(T0);
        let one = vec!["a".to_string()];
        let two = vec!["a".to_string(), "b".to_string()];

        let err = f.ledger.plan_create_proposal(&ctx, alice(), "t".into(), "d".into(), one, 0, 0);
        assert_eq!(err.unwrap_err(), LedgerError::InvalidOptionCount(1));

        let err = f.ledger.plan_create_proposal(&ctx, alice(), "t".into(), "d".into(), two.clone(), 0, 0);
        assert_eq!(err.unwrap_err(), LedgerError::InvalidDuration(0));

        let err = f.ledger.plan_create_proposal(
            &ctx,
            alice(),
            "t".into(),
            "d".into(),
            two.clone(),
            MAX_DURATION_SECS + 1,
            1,
        );
        assert_eq!(err.unwrap_err(), LedgerError::InvalidDuration(MAX_DURATION_SECS + 1));

        let err = f.ledger.plan_create_proposal(&ctx, alice(), "t".into(), "d".into(), two, 60, 0);
        assert_eq!(err.unwrap_err(), LedgerError::InvalidMinVotes);

        let eleven = (0..11).map(|i| i.to_string()).collect();
        let err = f.ledger.plan_create_proposal(&ctx, alice(), "t".into(), "d".into(), eleven, 60, 1);
        assert_eq!(err.unwrap_err(), LedgerError::InvalidOptionCount(11));
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut f = Fixture::new();
        assert_eq!(f.create(2, 60, 1), 1);
        assert_eq!(f.create(3, 60, 1), 2);
        assert_eq!(f.ledger.proposal_count(), 2);
    }

    #[test]
    fn test_accumulators_start_at_zero() {
        let mut f = Fixture::new();
        let id = f.create(4, 60, 1);
        for option in 0..4 {
            assert_eq!(f.tally(id, option), 0);
        }
    }

    #[test]
    fn test_weighted_vote_accumulates() {
        let mut f = Fixture::new();
        let id = f.create(2, 60, 1);
        f.vote(alice(), id, 0, T0 + 1).unwrap();
        f.vote(bob(), id, 0, T0 + 2).unwrap();
        assert_eq!(f.tally(id, 0), 6);
        assert_eq!(f.tally(id, 1), 0);
        assert_eq!(f.ledger.get(id).unwrap().total_voters(), 2);
    }

    #[test]
    fn test_flat_policy_ignores_weight() {
        let mut f = Fixture::new();
        f.config.weight_policy = WeightPolicy::Flat;
        let id = f.create(2, 60, 1);
        f.vote(bob(), id, 1, T0 + 1).unwrap();
        assert_eq!(f.tally(id, 1), 1);
    }

    #[test]
    fn test_vote_window_is_inclusive() {
        let mut f = Fixture::new();
        let id = f.create(2, 60, 1);
        f.vote(alice(), id, 0, T0 + 60).unwrap();
        assert_eq!(f.vote(bob(), id, 0, T0 + 61), Err(LedgerError::VotingNotActive));
    }

    #[test]
    fn test_vote_check_order() {
        let mut f = Fixture::new();
        let id = f.create(2, 60, 1);

        assert_eq!(f.vote(alice(), 99, 0, T0), Err(LedgerError::ProposalNotFound(99)));
        assert_eq!(f.vote(Address::from_label("mallory"), id, 0, T0), Err(LedgerError::NotEligible));

        f.vote(alice(), id, 0, T0).unwrap();
        // A repeat vote with a bad option still reports AlreadyVoted.
        assert_eq!(f.vote(alice(), id, 7, T0), Err(LedgerError::AlreadyVoted));
        assert_eq!(f.vote(bob(), id, 2, T0), Err(LedgerError::InvalidOption(2)));
    }

    #[test]
    fn test_vote_rejects_proof_for_other_caller() {
        let mut f = Fixture::new();
        let id = f.create(2, 60, 1);
        let (ct, proof) = f.engine.encrypt_input(1, &f.config.contract_address, &alice());
        let result = f.ledger.plan_cast_vote(&f.ctx(T0), bob(), id, 0, &ct, &proof);
        assert_eq!(result.unwrap_err(), LedgerError::InvalidProof);
    }

    #[test]
    fn test_reveal_plan_checks() {
        let mut f = Fixture::new();
        let id = f.create(2, 60, 2);
        f.vote(alice(), id, 0, T0).unwrap();

        let ctx = f.ctx(T0 + 60);
        assert!(matches!(f.ledger.plan_request_reveal(&ctx, bob(), id), Err(LedgerError::Unauthorized(_))));
        assert_eq!(
            f.ledger.plan_request_reveal(&ctx, alice(), id).unwrap_err(),
            LedgerError::VotingStillActive
        );

        let ctx = f.ctx(T0 + 61);
        assert_eq!(
            f.ledger.plan_request_reveal(&ctx, alice(), id).unwrap_err(),
            LedgerError::InsufficientVotes { actual: 1, required: 2 }
        );

        f.config.reveal_policy = RevealPolicy::Advisory;
        let ctx = f.ctx(T0 + 61);
        assert!(matches!(
            f.ledger.plan_request_reveal(&ctx, alice(), id),
            Ok(RevealPlan::Submit { .. })
        ));
    }

    #[test]
    fn test_vote_reencrypts_every_slot() {
        let mut f = Fixture::new();
        let id = f.create(4, 60, 1);
        let before = f.ledger.get(id).unwrap().accumulators.clone();

        f.vote(bob(), id, 2, T0).unwrap();
        let after = &f.ledger.get(id).unwrap().accumulators;
        for (old, new) in before.iter().zip(after) {
            assert_ne!(old, new);
        }
        assert_eq!((0..4).map(|i| f.tally(id, i)).collect::<Vec<_>>(), vec![0, 0, 5, 0]);
    }

    #[test]
    fn test_unrecorded_reveal_replans_same_request() {
        let mut f = Fixture::new();
        let id = f.create(2, 60, 1);
        f.vote(alice(), id, 1, T0).unwrap();

        let plan = |f: &Fixture, now| match f.ledger.plan_request_reveal(&f.ctx(now), alice(), id).unwrap() {
            RevealPlan::Submit { request, .. } => request,
            RevealPlan::AlreadyPending { .. } => panic!("expected a new request"),
        };
        let first = plan(&f, T0 + 61);
        let second = plan(&f, T0 + 62);
        assert_eq!(first, second);
        assert_eq!(first.digest(), second.digest());
    }

    #[test]
    fn test_pending_requests_match_committed_reveals() {
        let mut f = Fixture::new();
        let a = f.create(2, 60, 1);
        let b = f.create(3, 60, 1);
        f.vote(alice(), a, 0, T0).unwrap();
        f.vote(bob(), b, 2, T0).unwrap();
        assert!(f.ledger.pending_requests().is_empty());

        let RevealPlan::Submit { request, change } =
            f.ledger.plan_request_reveal(&f.ctx(T0 + 61), alice(), b).unwrap()
        else {
            panic!("expected a new request");
        };
        f.ledger.apply(&change);
        assert_eq!(f.ledger.pending_requests(), vec![request]);
    }

    #[test]
    fn test_complete_reveal_flow() {
        let mut f = Fixture::new();
        let id = f.create(3, 60, 1);
        f.vote(alice(), id, 2, T0).unwrap();
        f.vote(bob(), id, 1, T0).unwrap();

        let RevealPlan::Submit { request, change } =
            f.ledger.plan_request_reveal(&f.ctx(T0 + 61), alice(), id).unwrap()
        else {
            panic!("expected a new request");
        };
        f.ledger.apply(&change);
        assert!(f.ledger.reveal_status(id).unwrap().is_pending());
        assert_eq!(f.ledger.decrypted_vote_count(id, 0), Err(LedgerError::NotRevealed));

        // A second request while pending reuses the token.
        assert!(matches!(
            f.ledger.plan_request_reveal(&f.ctx(T0 + 62), alice(), id).unwrap(),
            RevealPlan::AlreadyPending { request_id, .. } if request_id == request.request_id
        ));

        let decryptor = MockDecryptor::new(f.engine.clone(), "oracle");
        let delivery = decryptor.fulfil(&request).unwrap();
        let oracle = sealvote_crypto::QueuedOracle::new(f.engine.clone(), "oracle");

        let change = f.ledger.plan_complete_reveal(&oracle, &delivery, T0 + 70).unwrap().unwrap();
        f.ledger.apply(&change);

        assert_eq!(f.ledger.decrypted_results(id).unwrap(), vec![0, 5, 1]);
        assert_eq!(f.ledger.decrypted_vote_count(id, 1).unwrap(), 5);
        assert_eq!(f.ledger.decrypted_vote_count(id, 3), Err(LedgerError::InvalidOption(3)));
        assert_eq!(f.ledger.get(id).unwrap().phase(T0 + 70), ProposalPhase::Revealed);

        // Redelivery is a no-op; a later request is rejected.
        assert_eq!(f.ledger.plan_complete_reveal(&oracle, &delivery, T0 + 71).unwrap(), None);
        assert_eq!(
            f.ledger.plan_request_reveal(&f.ctx(T0 + 72), alice(), id).unwrap_err(),
            LedgerError::AlreadyRevealed
        );
    }

    #[test]
    fn test_complete_reveal_rejects_bad_deliveries() {
        let mut f = Fixture::new();
        let id = f.create(2, 60, 1);
        f.vote(alice(), id, 0, T0).unwrap();

        let oracle = sealvote_crypto::QueuedOracle::new(f.engine.clone(), "oracle");
        let request = f.ledger.get(id).unwrap().decryption_request(1);
        let delivery = oracle.fulfil(&request).unwrap();

        // No pending token yet.
        assert_eq!(
            f.ledger.plan_complete_reveal(&oracle, &delivery, T0 + 61).unwrap_err(),
            LedgerError::UnknownRevealRequest(1)
        );

        let RevealPlan::Submit { change, .. } =
            f.ledger.plan_request_reveal(&f.ctx(T0 + 61), alice(), id).unwrap()
        else {
            panic!("expected a new request");
        };
        f.ledger.apply(&change);

        let mut forged = delivery.clone();
        forged.results = vec![0, 1];
        assert_eq!(
            f.ledger.plan_complete_reveal(&oracle, &forged, T0 + 62).unwrap_err(),
            LedgerError::InvalidAttestation
        );

        let mut short = delivery.clone();
        short.results = vec![1];
        assert!(matches!(
            f.ledger.plan_complete_reveal(&oracle, &short, T0 + 62),
            Err(LedgerError::InvalidRevealDelivery(_))
        ));

        let mut stale = delivery;
        stale.request_id = 9;
        assert_eq!(
            f.ledger.plan_complete_reveal(&oracle, &stale, T0 + 62).unwrap_err(),
            LedgerError::UnknownRevealRequest(9)
        );
    }

    #[test]
    fn test_phases() {
        let mut f = Fixture::new();
        let id = f.create(2, 60, 1);
        let proposal = f.ledger.get(id).unwrap();
        assert_eq!(proposal.phase(T0 - 1), ProposalPhase::Created);
        assert_eq!(proposal.phase(T0), ProposalPhase::Active);
        assert_eq!(proposal.phase(T0 + 61), ProposalPhase::Ended);
        assert_eq!(proposal.time_remaining(T0 + 10), 50);
        assert_eq!(proposal.time_remaining(T0 + 100), 0);
    }

    #[test]
    fn test_voted_proposals() {
        let mut f = Fixture::new();
        let first = f.create(2, 60, 1);
        let second = f.create(2, 60, 1);
        let third = f.create(2, 60, 1);
        f.vote(alice(), first, 0, T0).unwrap();
        f.vote(alice(), third, 1, T0).unwrap();

        assert_eq!(f.ledger.voted_proposals(&alice()), vec![first, third]);
        assert!(f.ledger.has_user_voted(first, &alice()));
        assert!(!f.ledger.has_user_voted(second, &alice()));
        assert!(!f.ledger.has_user_voted(42, &alice()));
    }
}
