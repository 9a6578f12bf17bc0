//! Encrypted-arithmetic engine contract.

use crate::ciphertext::{Ciphertext, InputProof};
use crate::error::CryptoError;
use sealvote_types::Address;

/// External engine supplying homomorphic addition over 32-bit unsigned
/// ciphertexts and verification of caller-submitted encrypted inputs.
///
/// Addition is modular in the engine's 32-bit domain. Callers never see
/// plaintext through this trait.
pub trait EncryptedArithmetic: Send + Sync {
    /// Publicly known encryption of `value` (used for zero accumulators).
    fn trivial_encrypt(&self, value: u32) -> Ciphertext;

    /// Homomorphic addition: `Enc(a) + Enc(b) -> Enc(a + b)`.
    fn add(&self, acc: &Ciphertext, contribution: &Ciphertext) -> Result<Ciphertext, CryptoError>;

    /// Check that `ciphertext` was honestly built by `caller` for `contract`.
    fn verify_input_proof(
        &self,
        ciphertext: &Ciphertext,
        proof: &InputProof,
        contract: &Address,
        caller: &Address,
    ) -> bool;

    /// Fresh ciphertext of the same plaintext, unlinkable to the input
    /// without the engine key.
    fn rerandomize(&self, ciphertext: &Ciphertext) -> Result<Ciphertext, CryptoError> {
        self.add(ciphertext, &self.trivial_encrypt(0))
    }

    /// Multiply a ciphertext by a plaintext scalar.
    ///
    /// Double-and-add over [`add`](Self::add); engines with a native scalar
    /// product should override it.
    fn scalar_mul(&self, ciphertext: &Ciphertext, scalar: u32) -> Result<Ciphertext, CryptoError> {
        let mut result = self.trivial_encrypt(0);
        let mut base = ciphertext.clone();
        let mut k = scalar;

        while k > 0 {
            if k & 1 == 1 {
                result = self.add(&result, &base)?;
            }
            k >>= 1;
            if k > 0 {
                base = self.add(&base, &base)?;
            }
        }

        Ok(result)
    }
}
