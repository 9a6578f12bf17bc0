//! Opaque byte containers exchanged with the encryption engine and oracle.
//!
//! The ledger stores and forwards these values but never interprets them.

use crate::error::CryptoError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

macro_rules! opaque_bytes {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, Default)]
        pub struct $name(Vec<u8>);

        impl $name {
            pub fn from_bytes(bytes: Vec<u8>) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            pub fn to_hex(&self) -> String {
                hex::encode(&self.0)
            }

            /// Parse from hex, with or without a 0x prefix.
            pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
                let s = s.strip_prefix("0x").unwrap_or(s);
                Ok(Self(hex::decode(s)?))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let hex = self.to_hex();
                if hex.len() > 16 {
                    write!(f, "{}(0x{}..)", stringify!($name), &hex[..16])
                } else {
                    write!(f, "{}(0x{})", stringify!($name), hex)
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                format!("0x{}", self.to_hex()).serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $name::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

opaque_bytes!(
    /// Engine ciphertext handle.
    Ciphertext
);

opaque_bytes!(
    /// Proof that a submitted ciphertext was built by a given caller for a given contract.
    InputProof
);

opaque_bytes!(
    /// Oracle attestation over a batch of decrypted results.
    Attestation
);
