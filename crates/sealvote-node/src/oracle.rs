//! Channel-backed decryption oracle.
//!
//! The ledger hands requests to [`ChannelOracle::submit`], which only
//! enqueues. A background task decrypts each request and calls
//! `VotingStore::complete_reveal` with the attested results.

use sealvote_crypto::{CryptoError, DecryptionRequest, MockDecryptor, RevealDelivery, RevealOracle};
use sealvote_ledger::VotingStore;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

pub struct ChannelOracle {
    requests: mpsc::UnboundedSender<DecryptionRequest>,
    decryptor: Arc<MockDecryptor>,
}

impl ChannelOracle {
    /// Oracle plus the receiving end its worker consumes.
    pub fn new(decryptor: Arc<MockDecryptor>) -> (Self, mpsc::UnboundedReceiver<DecryptionRequest>) {
        let (requests, rx) = mpsc::unbounded_channel();
        (Self { requests, decryptor }, rx)
    }
}

impl RevealOracle for ChannelOracle {
    fn submit(&self, request: DecryptionRequest) -> Result<(), CryptoError> {
        self.requests
            .send(request)
            .map_err(|_| CryptoError::OracleUnavailable("oracle worker stopped".to_string()))
    }

    fn verify_attestation(&self, request: &DecryptionRequest, delivery: &RevealDelivery) -> bool {
        self.decryptor.verify(request, delivery)
    }
}

/// Spawn the worker answering requests from `rx`.
pub fn spawn_worker(
    store: Arc<VotingStore>,
    decryptor: Arc<MockDecryptor>,
    mut rx: mpsc::UnboundedReceiver<DecryptionRequest>,
    delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Oracle worker started");
        let mut answered = HashSet::new();
        while let Some(request) = rx.recv().await {
            if !answered.insert(request.request_id) {
                debug!(request_id = request.request_id, "Duplicate decryption request ignored");
                continue;
            }
            debug!(
                request_id = request.request_id,
                proposal_id = request.proposal_id,
                "Decryption request received"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let delivery = match decryptor.fulfil(&request) {
                Ok(delivery) => delivery,
                Err(e) => {
                    error!(request_id = request.request_id, "Decryption failed: {}", e);
                    continue;
                }
            };

            // Leaves the reveal pending on failure; it stays visible through reveal_status.
            if let Err(e) = store.complete_reveal(&delivery) {
                error!(
                    request_id = delivery.request_id,
                    proposal_id = delivery.proposal_id,
                    "Reveal delivery rejected: {}",
                    e
                );
            }
        }
        info!("Oracle worker stopped");
    })
}
