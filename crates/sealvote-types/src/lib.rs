//! SealVote Types - Core type definitions shared by the SealVote crates.
//!
//! This crate provides:
//! - Identities (20-byte addresses, Bech32m encoded)
//! - Wall-clock abstraction used to drive proposal phases
//! - Public ledger events emitted on every committed transition

pub mod address;
pub mod time;
pub mod event;
pub mod error;

#[cfg(feature = "serde")]
mod serialization;

pub use address::Address;
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
pub use event::LedgerEvent;
pub use error::TypesError;

/// Proposal identifier. Allocated monotonically starting at 1.
pub type ProposalId = u64;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Address, Clock, LedgerEvent, ManualClock, ProposalId, SystemClock, Timestamp, TypesError,
    };
}
