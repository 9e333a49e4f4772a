//! # Key Material
//!
//! Ed25519 keypairs and the raw secret material stored alongside each
//! wallet account.
//!
//! Account records carry their private key as opaque bytes ([`SecretKey`])
//! because the credential store is not ours to trust: the bytes may be
//! truncated, hex-mangled, or missing. Turning them into a usable
//! [`NovaKeypair`] is a fallible step, and the failure is a signing problem,
//! never an authentication one.
//!
//! Key bytes are never logged. Every `Debug` impl in this file redacts them.

use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during key operations.
///
/// Intentionally vague about *why* something failed; details about key
/// material do not belong in error messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or encoding")]
    InvalidSecretKey,

    #[error("no secret key material available")]
    MissingSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,

    #[error("invalid signature encoding")]
    InvalidSignature,
}

// ---------------------------------------------------------------------------
// SecretKey
// ---------------------------------------------------------------------------

/// Raw private key material as read from the credential store.
///
/// Holds whatever bytes the store returned, unvalidated. Call
/// [`SecretKey::keypair`] to obtain a signing keypair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKey {
    bytes: Vec<u8>,
}

impl SecretKey {
    /// Wraps raw bytes. No validation happens here.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// An empty placeholder for accounts whose key material was never
    /// provisioned.
    pub fn empty() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Returns `true` if no key material is present.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decodes the stored bytes into an Ed25519 keypair.
    pub fn keypair(&self) -> Result<NovaKeypair, KeyError> {
        if self.bytes.is_empty() {
            return Err(KeyError::MissingSecretKey);
        }
        let seed: [u8; SECRET_KEY_LENGTH] = self
            .bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(NovaKeypair::from_seed(&seed))
    }
}

impl From<&NovaKeypair> for SecretKey {
    fn from(keypair: &NovaKeypair) -> Self {
        Self::from_bytes(keypair.secret_key_bytes().to_vec())
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(<redacted {} bytes>)", self.bytes.len())
    }
}

// ---------------------------------------------------------------------------
// NovaKeypair
// ---------------------------------------------------------------------------

/// An Ed25519 signing keypair.
///
/// Deliberately not `Serialize`: persisting a private key goes through
/// [`SecretKey`], explicitly.
pub struct NovaKeypair {
    signing_key: SigningKey,
}

/// The public half of a keypair, safe to embed in transactions.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NovaPublicKey {
    bytes: [u8; 32],
}

/// An Ed25519 signature. Always 64 bytes when produced by a keypair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NovaSignature {
    bytes: Vec<u8>,
}

impl NovaKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Constructs a keypair deterministically from a 32-byte seed.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Returns the public key associated with this keypair.
    pub fn public_key(&self) -> NovaPublicKey {
        NovaPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Sign a message. Deterministic for a given (key, message) pair.
    pub fn sign(&self, message: &[u8]) -> NovaSignature {
        let sig = self.signing_key.sign(message);
        NovaSignature {
            bytes: sig.to_bytes().to_vec(),
        }
    }

    /// Exports the raw 32-byte secret key. Handle with care.
    pub fn secret_key_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.signing_key.to_bytes()
    }
}

impl Clone for NovaKeypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for NovaKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Public half only.
        write!(f, "NovaKeypair(pub={})", self.public_key().to_hex())
    }
}

// ---------------------------------------------------------------------------
// NovaPublicKey
// ---------------------------------------------------------------------------

impl NovaPublicKey {
    /// Create a public key from raw bytes without point validation.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Parse a hex-encoded public key, validating that it is a curve point.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let raw = hex::decode(s).map_err(|_| KeyError::InvalidPublicKey)?;
        let bytes: [u8; 32] = raw
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Verify a signature against this public key.
    ///
    /// Returns `false` for malformed keys or signatures rather than erroring.
    pub fn verify(&self, message: &[u8], signature: &NovaSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let sig_bytes: [u8; 64] = match signature.bytes.as_slice().try_into() {
            Ok(b) => b,
            Err(_) => return false,
        };
        let dalek_sig = DalekSignature::from_bytes(&sig_bytes);
        verifying_key.verify(message, &dalek_sig).is_ok()
    }

    /// Hex-encoded representation. 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Debug for NovaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NovaPublicKey({})", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// NovaSignature
// ---------------------------------------------------------------------------

impl NovaSignature {
    /// Wrap raw 64-byte signature bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Parse a hex-encoded signature. Length is checked at verify time.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidSignature)?;
        if bytes.len() != 64 {
            return Err(KeyError::InvalidSignature);
        }
        Ok(Self { bytes })
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hex-encoded representation. 128 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl fmt::Debug for NovaSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NovaSignature({})", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let kp = NovaKeypair::generate();
        let msg = b"send 10.5 to bob";
        let sig = kp.sign(msg);
        assert!(kp.public_key().verify(msg, &sig));
        assert!(!kp.public_key().verify(b"send 1000 to bob", &sig));
    }

    #[test]
    fn secret_key_roundtrips_to_same_keypair() {
        let kp = NovaKeypair::generate();
        let secret = SecretKey::from(&kp);
        let restored = secret.keypair().unwrap();
        assert_eq!(restored.public_key(), kp.public_key());
    }

    #[test]
    fn empty_secret_key_is_missing() {
        assert_eq!(
            SecretKey::empty().keypair().unwrap_err(),
            KeyError::MissingSecretKey
        );
    }

    #[test]
    fn truncated_secret_key_is_invalid() {
        let secret = SecretKey::from_bytes(vec![7u8; 31]);
        assert_eq!(secret.keypair().unwrap_err(), KeyError::InvalidSecretKey);
    }

    #[test]
    fn debug_output_never_contains_secret_bytes() {
        let kp = NovaKeypair::from_seed(&[0xAB; 32]);
        let secret = SecretKey::from(&kp);
        let rendered = format!("{:?} {:?}", secret, kp);
        assert!(!rendered.contains(&hex::encode([0xAB; 32])));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn public_key_hex_roundtrip() {
        let pk = NovaKeypair::generate().public_key();
        assert_eq!(NovaPublicKey::from_hex(&pk.to_hex()).unwrap(), pk);
        assert!(NovaPublicKey::from_hex("zz").is_err());
    }

    #[test]
    fn signature_hex_rejects_wrong_length() {
        assert_eq!(
            NovaSignature::from_hex("abcd").unwrap_err(),
            KeyError::InvalidSignature
        );
    }
}
