//! Single-writer voting store.
//!
//! Every mutating call runs under the write lock in four steps: plan the
//! changes against current state, append them to the commit log as one
//! record, apply them in memory, then publish their events. A failure while
//! planning or appending leaves state untouched.

use crate::change::{CommitRecord, LedgerChange, StateChange};
use crate::config::LedgerConfig;
use crate::directory::{DirectorySummary, ProposalDirectory, ProposalStats};
use crate::error::LedgerError;
use crate::proposal::{PlanContext, ProposalInfo, ProposalLedger, RevealPlan, RevealStatus};
use parking_lot::RwLock;
use sealvote_crypto::{
    Ciphertext, DecryptionRequest, EncryptedArithmetic, InputProof, RevealDelivery, RevealOracle,
};
use sealvote_registry::{IdentityRegistry, RegistryChange, RegistryError, UserProfile};
use sealvote_storage::CommitLog;
use sealvote_types::{Address, Clock, LedgerEvent, ProposalId, Timestamp};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Registry, ledger and directory, mutated together.
#[derive(Debug, Default)]
struct VotingState {
    registry: IdentityRegistry,
    ledger: ProposalLedger,
    directory: ProposalDirectory,
}

impl VotingState {
    fn apply(&mut self, change: &StateChange) {
        match change {
            StateChange::Registry(change) => self.registry.apply(change),
            StateChange::Ledger(change) => {
                if let LedgerChange::ProposalCreated { proposal_id, .. } = change {
                    self.directory.track(*proposal_id);
                }
                self.ledger.apply(change);
            }
        }
    }
}

struct Inner {
    state: VotingState,
    /// `None` for in-memory stores
    log: Option<CommitLog<CommitRecord>>,
    commits: u64,
}

/// Owned handle to the voting state.
pub struct VotingStore {
    inner: RwLock<Inner>,
    config: LedgerConfig,
    engine: Arc<dyn EncryptedArithmetic>,
    oracle: Arc<dyn RevealOracle>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<LedgerEvent>,
}

impl VotingStore {
    /// Open a durable store in `data_dir`, replaying its commit log.
    ///
    /// A fresh directory is initialised with `config.genesis_admin`.
    pub fn open(
        data_dir: &Path,
        config: LedgerConfig,
        engine: Arc<dyn EncryptedArithmetic>,
        oracle: Arc<dyn RevealOracle>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LedgerError> {
        let (log, records) = CommitLog::<CommitRecord>::open(data_dir)?;

        let mut state = VotingState::default();
        for record in &records {
            for change in &record.changes {
                state.apply(change);
            }
        }

        info!(
            path = %log.path().display(),
            commits = records.len(),
            proposals = state.ledger.proposal_count(),
            users = state.registry.registered_count(),
            "Voting state replayed"
        );

        let commits = log.len();
        let store = Self::with_parts(
            Inner { state, log: Some(log), commits },
            config,
            engine,
            oracle,
            clock,
        );
        store.ensure_genesis()?;
        Ok(store)
    }

    /// Store without durability, for tests and ephemeral nodes.
    pub fn in_memory(
        config: LedgerConfig,
        engine: Arc<dyn EncryptedArithmetic>,
        oracle: Arc<dyn RevealOracle>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LedgerError> {
        let inner = Inner {
            state: VotingState::default(),
            log: None,
            commits: 0,
        };
        let store = Self::with_parts(inner, config, engine, oracle, clock);
        store.ensure_genesis()?;
        Ok(store)
    }

    fn with_parts(
        inner: Inner,
        config: LedgerConfig,
        engine: Arc<dyn EncryptedArithmetic>,
        oracle: Arc<dyn RevealOracle>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: RwLock::new(inner),
            config,
            engine,
            oracle,
            clock,
            events,
        }
    }

    fn ensure_genesis(&self) -> Result<(), LedgerError> {
        let mut inner = self.inner.write();
        if !inner.state.registry.admin().is_zero() {
            return Ok(());
        }
        let changes = inner.state.registry.plan_genesis(self.config.genesis_admin)?;
        let now = self.clock.now();
        self.commit(&mut inner, now, changes.into_iter().map(StateChange::from).collect())?;
        info!(admin = %self.config.genesis_admin, "Genesis admin installed");
        Ok(())
    }

    /// Persist, apply and announce one atomic set of changes.
    fn commit(&self, inner: &mut Inner, now: Timestamp, changes: Vec<StateChange>) -> Result<(), LedgerError> {
        if changes.is_empty() {
            return Ok(());
        }

        let record = CommitRecord { timestamp: now, changes };
        let seq = match inner.log.as_mut() {
            Some(log) => log.append(&record)?,
            None => inner.commits + 1,
        };
        inner.commits = seq;

        for change in &record.changes {
            inner.state.apply(change);
        }

        for change in &record.changes {
            if let Some(event) = change.event() {
                info!(seq, event = event.name(), proposal_id = ?event.proposal_id(), "Committed");
                // No subscribers is fine.
                let _ = self.events.send(event);
            }
        }
        Ok(())
    }

    fn commit_registry<F>(&self, plan: F) -> Result<(), LedgerError>
    where
        F: FnOnce(&IdentityRegistry, Timestamp) -> Result<Vec<RegistryChange>, RegistryError>,
    {
        let mut inner = self.inner.write();
        let now = self.clock.now();
        let changes = plan(&inner.state.registry, now)?;
        debug!(changes = changes.len(), "Planned registry changes");
        self.commit(&mut inner, now, changes.into_iter().map(StateChange::from).collect())
    }

    fn plan_context<'a>(&'a self, registry: &'a IdentityRegistry, now: Timestamp) -> PlanContext<'a> {
        PlanContext {
            engine: self.engine.as_ref(),
            registry,
            config: &self.config,
            now,
        }
    }

    /// Subscribe to events committed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Number of committed records, genesis included.
    pub fn commit_count(&self) -> u64 {
        self.inner.read().commits
    }

    // ---- identity registry ----

    pub fn register_user(&self, caller: Address) -> Result<(), LedgerError> {
        self.commit_registry(|registry, now| registry.plan_register_user(caller, now))
    }

    pub fn register_user_with_weight(
        &self,
        caller: Address,
        target: Address,
        weight: u32,
    ) -> Result<(), LedgerError> {
        self.commit_registry(|registry, now| {
            registry.plan_register_user_with_weight(caller, target, weight, now)
        })
    }

    pub fn update_voting_weight(&self, caller: Address, target: Address, weight: u32) -> Result<(), LedgerError> {
        self.commit_registry(|registry, _| registry.plan_update_voting_weight(caller, target, weight))
    }

    pub fn ban_user(&self, caller: Address, target: Address, reason: &str) -> Result<(), LedgerError> {
        self.commit_registry(|registry, _| registry.plan_ban_user(caller, target, reason.to_string()))
    }

    pub fn unban_user(&self, caller: Address, target: Address) -> Result<(), LedgerError> {
        self.commit_registry(|registry, _| registry.plan_unban_user(caller, target))
    }

    pub fn add_moderator(&self, caller: Address, target: Address) -> Result<(), LedgerError> {
        self.commit_registry(|registry, _| registry.plan_add_moderator(caller, target))
    }

    pub fn remove_moderator(&self, caller: Address, target: Address) -> Result<(), LedgerError> {
        self.commit_registry(|registry, _| registry.plan_remove_moderator(caller, target))
    }

    pub fn transfer_admin(&self, caller: Address, target: Address) -> Result<(), LedgerError> {
        self.commit_registry(|registry, _| registry.plan_transfer_admin(caller, target))
    }

    pub fn pause(&self, caller: Address) -> Result<(), LedgerError> {
        self.commit_registry(|registry, _| registry.plan_pause(caller))
    }

    pub fn unpause(&self, caller: Address) -> Result<(), LedgerError> {
        self.commit_registry(|registry, _| registry.plan_unpause(caller))
    }

    pub fn can_user_vote(&self, identity: &Address) -> bool {
        self.inner.read().state.registry.can_user_vote(identity)
    }

    pub fn user_profile(&self, identity: &Address) -> UserProfile {
        self.inner.read().state.registry.profile_or_default(identity)
    }

    pub fn voting_weight(&self, identity: &Address) -> u32 {
        self.inner.read().state.registry.voting_weight(identity)
    }

    pub fn is_moderator(&self, identity: &Address) -> bool {
        self.inner.read().state.registry.is_moderator(identity)
    }

    pub fn admin(&self) -> Address {
        self.inner.read().state.registry.admin()
    }

    pub fn is_paused(&self) -> bool {
        self.inner.read().state.registry.is_paused()
    }

    pub fn registered_count(&self) -> usize {
        self.inner.read().state.registry.registered_count()
    }

    // ---- proposal ledger ----

    pub fn create_proposal(
        &self,
        creator: Address,
        title: &str,
        description: &str,
        options: Vec<String>,
        duration: u64,
        min_votes_for_reveal: u32,
    ) -> Result<ProposalId, LedgerError> {
        let mut inner = self.inner.write();
        let now = self.clock.now();
        let (proposal_id, change) = {
            let state = &inner.state;
            let ctx = self.plan_context(&state.registry, now);
            state.ledger.plan_create_proposal(
                &ctx,
                creator,
                title.to_string(),
                description.to_string(),
                options,
                duration,
                min_votes_for_reveal,
            )?
        };
        self.commit(&mut inner, now, vec![change.into()])?;
        Ok(proposal_id)
    }

    pub fn cast_vote(
        &self,
        voter: Address,
        proposal_id: ProposalId,
        option_index: u32,
        encrypted_one: &Ciphertext,
        proof: &InputProof,
    ) -> Result<(), LedgerError> {
        let mut inner = self.inner.write();
        let now = self.clock.now();
        let change = {
            let state = &inner.state;
            let ctx = self.plan_context(&state.registry, now);
            state
                .ledger
                .plan_cast_vote(&ctx, voter, proposal_id, option_index, encrypted_one, proof)?
        };
        self.commit(&mut inner, now, vec![change.into()])
    }

    /// Request decryption of a proposal's tallies.
    ///
    /// Returns the pending status; results arrive later through
    /// [`VotingStore::complete_reveal`]. Calling again while a request is
    /// outstanding returns the same token without resubmitting.
    pub fn reveal_results(&self, caller: Address, proposal_id: ProposalId) -> Result<RevealStatus, LedgerError> {
        let mut inner = self.inner.write();
        let now = self.clock.now();
        let plan = {
            let state = &inner.state;
            let ctx = self.plan_context(&state.registry, now);
            state.ledger.plan_request_reveal(&ctx, caller, proposal_id)?
        };

        match plan {
            RevealPlan::AlreadyPending { request_id, requested_at } => {
                debug!(proposal_id, request_id, "Reveal already pending");
                Ok(RevealStatus::Pending { request_id, requested_at })
            }
            RevealPlan::Submit { request, change } => {
                let request_id = request.request_id;
                self.oracle.submit(request)?;
                self.commit(&mut inner, now, vec![change.into()])?;
                Ok(RevealStatus::Pending { request_id, requested_at: now })
            }
        }
    }

    /// Apply an oracle delivery. Redelivering an applied result is a no-op.
    pub fn complete_reveal(&self, delivery: &RevealDelivery) -> Result<(), LedgerError> {
        let mut inner = self.inner.write();
        let now = self.clock.now();
        let change = inner
            .state
            .ledger
            .plan_complete_reveal(self.oracle.as_ref(), delivery, now)?;
        match change {
            Some(change) => self.commit(&mut inner, now, vec![change.into()]),
            None => {
                debug!(
                    proposal_id = delivery.proposal_id,
                    request_id = delivery.request_id,
                    "Duplicate reveal delivery ignored"
                );
                Ok(())
            }
        }
    }

    /// Decryption requests of every pending reveal, rebuilt from committed state.
    pub fn pending_reveal_requests(&self) -> Vec<DecryptionRequest> {
        self.inner.read().state.ledger.pending_requests()
    }

    /// Hand every pending request to the oracle again.
    ///
    /// Used after a restart, when the previous oracle may have lost its
    /// queue. Requests keep their ids, so an oracle that did receive them
    /// answers once. Returns the number of requests submitted.
    pub fn resubmit_pending_reveals(&self) -> Result<usize, LedgerError> {
        let requests = self.pending_reveal_requests();
        for request in &requests {
            info!(
                proposal_id = request.proposal_id,
                request_id = request.request_id,
                "Resubmitting pending reveal"
            );
            self.oracle.submit(request.clone())?;
        }
        Ok(requests.len())
    }

    pub fn has_user_voted(&self, proposal_id: ProposalId, identity: &Address) -> bool {
        self.inner.read().state.ledger.has_user_voted(proposal_id, identity)
    }

    pub fn proposal_info(&self, proposal_id: ProposalId) -> Result<ProposalInfo, LedgerError> {
        self.inner.read().state.ledger.proposal_info(proposal_id, self.clock.now())
    }

    pub fn proposal_count(&self) -> u64 {
        self.inner.read().state.ledger.proposal_count()
    }

    pub fn decrypted_vote_count(&self, proposal_id: ProposalId, option_index: u32) -> Result<u32, LedgerError> {
        self.inner.read().state.ledger.decrypted_vote_count(proposal_id, option_index)
    }

    pub fn decrypted_results(&self, proposal_id: ProposalId) -> Result<Vec<u32>, LedgerError> {
        self.inner.read().state.ledger.decrypted_results(proposal_id)
    }

    pub fn reveal_status(&self, proposal_id: ProposalId) -> Result<RevealStatus, LedgerError> {
        self.inner.read().state.ledger.reveal_status(proposal_id)
    }

    pub fn voted_proposals(&self, identity: &Address) -> Vec<ProposalId> {
        self.inner.read().state.ledger.voted_proposals(identity)
    }

    /// Current encrypted accumulator of one option.
    pub fn encrypted_tally(&self, proposal_id: ProposalId, option_index: u32) -> Result<Ciphertext, LedgerError> {
        let inner = self.inner.read();
        let proposal = inner
            .state
            .ledger
            .get(proposal_id)
            .ok_or(LedgerError::ProposalNotFound(proposal_id))?;
        proposal
            .accumulator(option_index)
            .cloned()
            .ok_or(LedgerError::InvalidOption(option_index))
    }

    // ---- proposal directory ----

    pub fn active_proposals(&self) -> Vec<ProposalId> {
        let inner = self.inner.read();
        inner.state.directory.active_proposals(&inner.state.ledger, self.clock.now())
    }

    pub fn ended_proposals(&self) -> Vec<ProposalId> {
        let inner = self.inner.read();
        inner.state.directory.ended_proposals(&inner.state.ledger, self.clock.now())
    }

    pub fn proposal_stats(
        &self,
        proposal_id: ProposalId,
        viewer: Option<&Address>,
    ) -> Result<ProposalStats, LedgerError> {
        let inner = self.inner.read();
        inner.state.directory.proposal_stats(
            &inner.state.ledger,
            &inner.state.registry,
            &self.config,
            proposal_id,
            viewer,
            self.clock.now(),
        )
    }

    pub fn summary(&self) -> DirectorySummary {
        let inner = self.inner.read();
        inner.state.directory.summary(&inner.state.ledger, self.clock.now())
    }
}
