//! # Addresses
//!
//! An [`Address`] is the BLAKE3 hash of an account's Ed25519 public key:
//!
//! ```text
//! public_key (32 bytes)
//!     -> BLAKE3-derive-key("nova-wallet address v1", public_key) -> 32 bytes
//!     -> "0x" || hex(hash)
//! ```
//!
//! The `0x` marker is load-bearing: the transfer request's `recipient` field
//! is treated as a literal address only when it carries the marker, and as
//! a username otherwise.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{ADDRESS_LENGTH, ADDRESS_PREFIX};
use crate::crypto::hash::domain_separated_hash;
use crate::crypto::keys::NovaPublicKey;

const ADDRESS_CONTEXT: &str = "nova-wallet address v1";

/// Errors that can occur while parsing an address string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must start with '{ADDRESS_PREFIX}'")]
    MissingPrefix,

    #[error("address is not valid hex")]
    InvalidHex,

    #[error("invalid address length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

/// A fixed-length account identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Wraps raw address bytes.
    pub fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Derives the address owned by `public_key`.
    pub fn from_public_key(public_key: &NovaPublicKey) -> Self {
        let hash = domain_separated_hash(ADDRESS_CONTEXT, &[public_key.as_bytes()]);
        Self(*hash.as_bytes())
    }

    /// Returns `true` if `candidate` carries the literal-address marker.
    pub fn looks_like_address(candidate: &str) -> bool {
        candidate.contains(ADDRESS_PREFIX)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.trim().strip_prefix(ADDRESS_PREFIX).ok_or(AddressError::MissingPrefix)?;
        let raw = hex::decode(body).map_err(|_| AddressError::InvalidHex)?;
        let bytes: [u8; ADDRESS_LENGTH] =
            raw.as_slice()
                .try_into()
                .map_err(|_| AddressError::InvalidLength {
                    expected: ADDRESS_LENGTH,
                    got: raw.len(),
                })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", ADDRESS_PREFIX, hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            <[u8; ADDRESS_LENGTH]>::deserialize(deserializer).map(Self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::NovaKeypair;

    #[test]
    fn display_parse_roundtrip() {
        let addr = Address::from_public_key(&NovaKeypair::generate().public_key());
        let text = addr.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 2 + 64);
        assert_eq!(text.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn parse_accepts_uppercase_hex() {
        let addr = Address::from_bytes([0xAB; 32]);
        let upper = format!("0x{}", hex::encode_upper([0xAB; 32]));
        assert_eq!(upper.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert_eq!("abcd".parse::<Address>(), Err(AddressError::MissingPrefix));
        assert_eq!("0xzz".parse::<Address>(), Err(AddressError::InvalidHex));
        assert_eq!(
            "0xabcd".parse::<Address>(),
            Err(AddressError::InvalidLength {
                expected: 32,
                got: 2
            })
        );
    }

    #[test]
    fn address_is_stable_for_a_key() {
        let kp = NovaKeypair::from_seed(&[3u8; 32]);
        assert_eq!(
            Address::from_public_key(&kp.public_key()),
            Address::from_public_key(&kp.public_key())
        );
    }

    #[test]
    fn marker_detection() {
        assert!(Address::looks_like_address("0xdeadbeef"));
        assert!(!Address::looks_like_address("bob"));
    }

    #[test]
    fn json_uses_text_form_and_bincode_uses_bytes() {
        let addr = Address::from_bytes([1u8; 32]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr));
        assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), addr);

        let bin = bincode::serialize(&addr).unwrap();
        assert_eq!(bin.len(), 32);
        assert_eq!(bincode::deserialize::<Address>(&bin).unwrap(), addr);
    }
}
