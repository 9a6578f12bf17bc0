//! SealVote Registry - Identity registration, voting weights, moderation
//! and the admin/moderator role hierarchy.
//!
//! The registry is a plain state value. Operations *plan* a list of
//! [`RegistryChange`]s against the current state without mutating it, and
//! [`IdentityRegistry::apply`] folds committed changes in. The same `apply`
//! is used when replaying the commit log.

pub mod profile;
pub mod role;
pub mod change;
pub mod registry;
pub mod error;

pub use profile::{UserProfile, MAX_VOTING_WEIGHT, MIN_VOTING_WEIGHT};
pub use role::{authorize, Role};
pub use change::RegistryChange;
pub use registry::IdentityRegistry;
pub use error::RegistryError;
