use thiserror::Error;

/// Errors that can occur in encrypted-arithmetic and oracle operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CryptoError {
    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    #[error("Ciphertext integrity check failed")]
    IntegrityCheckFailed,

    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Invalid hex: {0}")]
    InvalidHex(String),
}

impl From<hex::FromHexError> for CryptoError {
    fn from(e: hex::FromHexError) -> Self {
        CryptoError::InvalidHex(e.to_string())
    }
}
