use sealvote_crypto::CryptoError;
use sealvote_registry::RegistryError;
use sealvote_storage::StorageError;
use sealvote_types::ProposalId;
use thiserror::Error;

/// Errors that can occur in ledger operations.
///
/// Registry failures are folded into the same taxonomy so callers match on
/// one enum regardless of which component rejected the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // authorization
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Caller is not eligible to vote")]
    NotEligible,

    // validation
    #[error("Invalid number of options: {0} (allowed 2..=10)")]
    InvalidOptionCount(usize),

    #[error("Invalid duration: {0}s (allowed 1..=2592000)")]
    InvalidDuration(u64),

    #[error("Invalid voting weight: {0} (allowed 1..=100)")]
    InvalidWeight(u32),

    #[error("Invalid option: {0}")]
    InvalidOption(u32),

    #[error("min_votes_for_reveal must be at least 1")]
    InvalidMinVotes,

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    // state conflict
    #[error("Proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    #[error("User already registered")]
    AlreadyRegistered,

    #[error("User not registered")]
    NotRegistered,

    #[error("User already banned")]
    AlreadyBanned,

    #[error("User not banned")]
    NotBanned,

    #[error("Already voted")]
    AlreadyVoted,

    #[error("Voting not active")]
    VotingNotActive,

    #[error("Voting still active")]
    VotingStillActive,

    #[error("Insufficient votes for reveal: {actual} < {required}")]
    InsufficientVotes { actual: u64, required: u64 },

    #[error("Results already revealed")]
    AlreadyRevealed,

    #[error("Results not revealed")]
    NotRevealed,

    #[error("Unknown reveal request: {0}")]
    UnknownRevealRequest(u64),

    // integrity
    #[error("Invalid encrypted input proof")]
    InvalidProof,

    #[error("Invalid reveal attestation")]
    InvalidAttestation,

    #[error("Invalid reveal delivery: {0}")]
    InvalidRevealDelivery(String),

    // system
    #[error("System paused")]
    SystemPaused,

    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Encrypted arithmetic error: {0}")]
    Crypto(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Coarse classification of [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller lacks the role or status; recoverable by obtaining it
    Authorization,
    /// Malformed input
    Validation,
    /// Well-formed but illegal in the current phase
    StateConflict,
    /// Encrypted input or oracle answer failed verification
    Integrity,
    /// Operational halt or infrastructure failure
    System,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Unauthorized(_) | LedgerError::NotEligible => ErrorKind::Authorization,

            LedgerError::InvalidOptionCount(_)
            | LedgerError::InvalidDuration(_)
            | LedgerError::InvalidWeight(_)
            | LedgerError::InvalidOption(_)
            | LedgerError::InvalidMinVotes
            | LedgerError::InvalidIdentity(_) => ErrorKind::Validation,

            LedgerError::ProposalNotFound(_)
            | LedgerError::AlreadyRegistered
            | LedgerError::NotRegistered
            | LedgerError::AlreadyBanned
            | LedgerError::NotBanned
            | LedgerError::AlreadyVoted
            | LedgerError::VotingNotActive
            | LedgerError::VotingStillActive
            | LedgerError::InsufficientVotes { .. }
            | LedgerError::AlreadyRevealed
            | LedgerError::NotRevealed
            | LedgerError::UnknownRevealRequest(_) => ErrorKind::StateConflict,

            LedgerError::InvalidProof
            | LedgerError::InvalidAttestation
            | LedgerError::InvalidRevealDelivery(_) => ErrorKind::Integrity,

            LedgerError::SystemPaused
            | LedgerError::OracleUnavailable(_)
            | LedgerError::Crypto(_)
            | LedgerError::Storage(_) => ErrorKind::System,
        }
    }
}

impl From<RegistryError> for LedgerError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::Unauthorized(reason) => LedgerError::Unauthorized(reason),
            RegistryError::AlreadyRegistered => LedgerError::AlreadyRegistered,
            RegistryError::NotRegistered => LedgerError::NotRegistered,
            RegistryError::InvalidWeight(w) => LedgerError::InvalidWeight(w),
            RegistryError::AlreadyBanned => LedgerError::AlreadyBanned,
            RegistryError::NotBanned => LedgerError::NotBanned,
            RegistryError::InvalidIdentity(reason) => LedgerError::InvalidIdentity(reason),
            RegistryError::SystemPaused => LedgerError::SystemPaused,
        }
    }
}

impl From<CryptoError> for LedgerError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::OracleUnavailable(reason) => LedgerError::OracleUnavailable(reason),
            other => LedgerError::Crypto(other.to_string()),
        }
    }
}

impl From<StorageError> for LedgerError {
    fn from(e: StorageError) -> Self {
        LedgerError::Storage(e.to_string())
    }
}
