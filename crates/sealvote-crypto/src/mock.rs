//! Keyed mock engine and oracle.
//!
//! Plays the role of an FHE mock environment: ciphertexts are opaque to the
//! ledger and support addition, but confidentiality rests on a symmetric key
//! held by the engine. Not a cryptosystem; do not deploy.
//!
//! Ciphertext layout: `nonce (16) || value ^ mask(nonce) (4) || tag (16)`.

use crate::ciphertext::{Attestation, Ciphertext, InputProof};
use crate::engine::EncryptedArithmetic;
use crate::error::CryptoError;
use crate::oracle::{DecryptionRequest, RevealDelivery, RevealOracle};
use parking_lot::Mutex;
use rand::RngCore;
use sealvote_types::Address;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const NONCE_LEN: usize = 16;
const BODY_LEN: usize = 4;
const TAG_LEN: usize = 16;
const CIPHERTEXT_LEN: usize = NONCE_LEN + BODY_LEN + TAG_LEN;

/// Keyed mock of the encrypted-arithmetic engine.
pub struct MockEngine {
    key: [u8; 32],
}

impl MockEngine {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Deterministic engine key derived from a seed string.
    pub fn from_seed(seed: &str) -> Self {
        Self::new(blake3::derive_key("sealvote mock engine", seed.as_bytes()))
    }

    /// Engine with a fresh random key.
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        Self::new(key)
    }

    fn mask(&self, nonce: &[u8]) -> [u8; BODY_LEN] {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(b"mask");
        hasher.update(nonce);
        let mut mask = [0u8; BODY_LEN];
        mask.copy_from_slice(&hasher.finalize().as_bytes()[..BODY_LEN]);
        mask
    }

    fn tag(&self, nonce: &[u8], body: &[u8]) -> [u8; TAG_LEN] {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(b"tag");
        hasher.update(nonce);
        hasher.update(body);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&hasher.finalize().as_bytes()[..TAG_LEN]);
        tag
    }

    fn seal(&self, value: u32, nonce: [u8; NONCE_LEN]) -> Ciphertext {
        let mask = self.mask(&nonce);
        let mut body = value.to_le_bytes();
        for (b, m) in body.iter_mut().zip(mask.iter()) {
            *b ^= m;
        }
        let tag = self.tag(&nonce, &body);

        let mut bytes = Vec::with_capacity(CIPHERTEXT_LEN);
        bytes.extend_from_slice(&nonce);
        bytes.extend_from_slice(&body);
        bytes.extend_from_slice(&tag);
        Ciphertext::from_bytes(bytes)
    }

    /// Deterministic nonce for engine-side ciphertexts, keyed so that
    /// observers cannot tell which inputs produced a ciphertext.
    fn derived_nonce(&self, parts: &[&[u8]]) -> [u8; NONCE_LEN] {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(b"nonce");
        for part in parts {
            hasher.update(part);
        }
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&hasher.finalize().as_bytes()[..NONCE_LEN]);
        nonce
    }

    /// Recover the plaintext. Only the engine and its oracle can do this.
    pub fn decrypt(&self, ciphertext: &Ciphertext) -> Result<u32, CryptoError> {
        let bytes = ciphertext.as_bytes();
        if bytes.len() != CIPHERTEXT_LEN {
            return Err(CryptoError::MalformedCiphertext(format!(
                "expected {} bytes, got {}",
                CIPHERTEXT_LEN,
                bytes.len()
            )));
        }

        let (nonce, rest) = bytes.split_at(NONCE_LEN);
        let (body, tag) = rest.split_at(BODY_LEN);
        if self.tag(nonce, body) != tag {
            return Err(CryptoError::IntegrityCheckFailed);
        }

        let mask = self.mask(nonce);
        let mut value = [0u8; BODY_LEN];
        for i in 0..BODY_LEN {
            value[i] = body[i] ^ mask[i];
        }
        Ok(u32::from_le_bytes(value))
    }

    fn input_proof(&self, ciphertext: &Ciphertext, contract: &Address, caller: &Address) -> InputProof {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(b"input proof");
        hasher.update(ciphertext.as_bytes());
        hasher.update(contract.as_bytes());
        hasher.update(caller.as_bytes());
        InputProof::from_bytes(hasher.finalize().as_bytes().to_vec())
    }

    /// Client-side encryption of a ballot input bound to `(contract, caller)`.
    pub fn encrypt_input(&self, value: u32, contract: &Address, caller: &Address) -> (Ciphertext, InputProof) {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let ciphertext = self.seal(value, nonce);
        let proof = self.input_proof(&ciphertext, contract, caller);
        (ciphertext, proof)
    }
}

impl EncryptedArithmetic for MockEngine {
    fn trivial_encrypt(&self, value: u32) -> Ciphertext {
        self.seal(value, self.derived_nonce(&[b"trivial", &value.to_le_bytes()]))
    }

    fn add(&self, acc: &Ciphertext, contribution: &Ciphertext) -> Result<Ciphertext, CryptoError> {
        let sum = self.decrypt(acc)?.wrapping_add(self.decrypt(contribution)?);
        // Deterministic so that replicas applying the same inputs agree.
        let nonce = self.derived_nonce(&[b"add", acc.as_bytes(), contribution.as_bytes()]);
        Ok(self.seal(sum, nonce))
    }

    fn verify_input_proof(
        &self,
        ciphertext: &Ciphertext,
        proof: &InputProof,
        contract: &Address,
        caller: &Address,
    ) -> bool {
        if self.decrypt(ciphertext).is_err() {
            return false;
        }
        self.input_proof(ciphertext, contract, caller) == *proof
    }
}

/// Oracle-side decryption and attestation over a [`MockEngine`].
pub struct MockDecryptor {
    engine: Arc<MockEngine>,
    key: [u8; 32],
}

impl MockDecryptor {
    pub fn new(engine: Arc<MockEngine>, seed: &str) -> Self {
        Self {
            engine,
            key: blake3::derive_key("sealvote mock oracle", seed.as_bytes()),
        }
    }

    fn attest(&self, request: &DecryptionRequest, results: &[u32]) -> Attestation {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(&request.digest());
        for value in results {
            hasher.update(&value.to_le_bytes());
        }
        Attestation::from_bytes(hasher.finalize().as_bytes().to_vec())
    }

    /// Decrypt every entry of `request` and attest the results.
    pub fn fulfil(&self, request: &DecryptionRequest) -> Result<RevealDelivery, CryptoError> {
        let results = request
            .entries
            .iter()
            .map(|(_, ciphertext)| self.engine.decrypt(ciphertext))
            .collect::<Result<Vec<_>, _>>()?;
        let attestation = self.attest(request, &results);

        Ok(RevealDelivery {
            request_id: request.request_id,
            proposal_id: request.proposal_id,
            results,
            attestation,
        })
    }

    pub fn verify(&self, request: &DecryptionRequest, delivery: &RevealDelivery) -> bool {
        delivery.request_id == request.request_id
            && delivery.proposal_id == request.proposal_id
            && self.attest(request, &delivery.results) == delivery.attestation
    }
}

/// Mock oracle that queues requests until the caller drains them.
pub struct QueuedOracle {
    decryptor: MockDecryptor,
    queue: Mutex<VecDeque<DecryptionRequest>>,
    /// Request ids ever accepted
    seen: Mutex<HashSet<u64>>,
    accepting: AtomicBool,
}

impl QueuedOracle {
    pub fn new(engine: Arc<MockEngine>, seed: &str) -> Self {
        Self {
            decryptor: MockDecryptor::new(engine, seed),
            queue: Mutex::new(VecDeque::new()),
            seen: Mutex::new(HashSet::new()),
            accepting: AtomicBool::new(true),
        }
    }

    /// Simulate an outage: while not accepting, `submit` fails.
    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Remove queued requests without answering them.
    pub fn take_requests(&self) -> Vec<DecryptionRequest> {
        self.queue.lock().drain(..).collect()
    }

    /// Answer a single request.
    pub fn fulfil(&self, request: &DecryptionRequest) -> Result<RevealDelivery, CryptoError> {
        self.decryptor.fulfil(request)
    }

    /// Answer every queued request.
    pub fn drain(&self) -> Result<Vec<RevealDelivery>, CryptoError> {
        self.take_requests().iter().map(|r| self.decryptor.fulfil(r)).collect()
    }
}

impl RevealOracle for QueuedOracle {
    fn submit(&self, request: DecryptionRequest) -> Result<(), CryptoError> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(CryptoError::OracleUnavailable("queue closed".to_string()));
        }
        if !self.seen.lock().insert(request.request_id) {
            tracing::debug!(request_id = request.request_id, "Duplicate decryption request ignored");
            return Ok(());
        }
        tracing::debug!(
            request_id = request.request_id,
            proposal_id = request.proposal_id,
            "Decryption request queued"
        );
        self.queue.lock().push_back(request);
        Ok(())
    }

    fn verify_attestation(&self, request: &DecryptionRequest, delivery: &RevealDelivery) -> bool {
        self.decryptor.verify(request, delivery)
    }
}
