//! SealVote Ledger - Encrypted proposals, ballots and reveal.
//!
//! This crate provides:
//! - Proposal lifecycle: Created -> Active -> Ended -> Revealed
//! - Option-scoped encrypted tally accumulation
//! - Two-phase reveal through an external decryption oracle
//! - The proposal directory (active/ended views and statistics)
//! - [`VotingStore`], the single-writer handle that commits every operation
//!   to the durable log

pub mod config;
pub mod proposal;
pub mod change;
pub mod directory;
pub mod store;
pub mod error;

pub use config::{LedgerConfig, RevealPolicy, WeightPolicy};
pub use proposal::{Proposal, ProposalInfo, ProposalLedger, ProposalPhase, RevealStatus};
pub use change::{CommitRecord, LedgerChange, StateChange};
pub use directory::{DirectorySummary, ProposalDirectory, ProposalStats};
pub use store::VotingStore;
pub use error::{ErrorKind, LedgerError};
