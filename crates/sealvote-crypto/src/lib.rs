//! SealVote Crypto - Interfaces to the external encrypted-arithmetic engine
//! and the decryption oracle.
//!
//! This crate provides:
//! - Opaque ciphertext, input-proof and attestation containers
//! - The [`EncryptedArithmetic`] engine contract used by the ledger
//! - The [`RevealOracle`] contract for asynchronous tally decryption
//! - A keyed mock engine and queued mock oracle for tests and development

pub mod ciphertext;
pub mod engine;
pub mod oracle;
pub mod mock;
pub mod error;

pub use ciphertext::{Attestation, Ciphertext, InputProof};
pub use engine::EncryptedArithmetic;
pub use oracle::{DecryptionRequest, RevealDelivery, RevealOracle};
pub use mock::{MockDecryptor, MockEngine, QueuedOracle};
pub use error::CryptoError;
