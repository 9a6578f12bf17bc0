//! Decryption oracle contract.
//!
//! Reveal is a two-phase protocol: the ledger submits a [`DecryptionRequest`]
//! and records a pending token, later the oracle hands back a
//! [`RevealDelivery`] which the ledger validates and applies.

use crate::ciphertext::{Attestation, Ciphertext};
use crate::error::CryptoError;
use sealvote_types::ProposalId;
use serde::{Deserialize, Serialize};

/// Batch of accumulators to decrypt, keyed by `(proposal_id, option_index)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionRequest {
    pub request_id: u64,
    pub proposal_id: ProposalId,
    pub entries: Vec<(u32, Ciphertext)>,
}

impl DecryptionRequest {
    /// Binding digest of the request, covered by oracle attestations.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"sealvote decryption request");
        hasher.update(&self.request_id.to_le_bytes());
        hasher.update(&self.proposal_id.to_le_bytes());
        for (index, ciphertext) in &self.entries {
            hasher.update(&index.to_le_bytes());
            hasher.update(&(ciphertext.len() as u64).to_le_bytes());
            hasher.update(ciphertext.as_bytes());
        }
        *hasher.finalize().as_bytes()
    }
}

/// Plaintext results returned by the oracle.
///
/// `results[i]` is the decrypted tally of option `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealDelivery {
    pub request_id: u64,
    pub proposal_id: ProposalId,
    pub results: Vec<u32>,
    pub attestation: Attestation,
}

/// External decryption oracle.
///
/// Requests are identified by `request_id`. The ledger may submit the same
/// request more than once (a submission whose commit failed is replanned
/// with the same id and entries, and a restarted node resubmits pending
/// requests), so an oracle answers each `request_id` at most once.
pub trait RevealOracle: Send + Sync {
    /// Enqueue a request. Must not block on decryption.
    fn submit(&self, request: DecryptionRequest) -> Result<(), CryptoError>;

    /// Check that `delivery` is a genuine answer to `request`.
    fn verify_attestation(&self, request: &DecryptionRequest, delivery: &RevealDelivery) -> bool;
}
