//! Salted password digests for account credentials.
//!
//! `digest = BLAKE3-derive-key("nova-wallet password v1", salt || password)`.
//! Comparison goes through `blake3::Hash`, whose `PartialEq` is constant
//! time.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::hash::domain_separated_hash;

const PASSWORD_CONTEXT: &str = "nova-wallet password v1";

/// Salt length in bytes.
pub const SALT_LENGTH: usize = 16;

/// A stored password verifier.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHash {
    salt: [u8; SALT_LENGTH],
    digest: [u8; 32],
}

impl PasswordHash {
    /// Hashes `password` under a fresh random salt.
    pub fn new(password: &str) -> Self {
        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        Self::with_salt(password, salt)
    }

    /// Hashes `password` under the given salt.
    pub fn with_salt(password: &str, salt: [u8; SALT_LENGTH]) -> Self {
        let digest = domain_separated_hash(PASSWORD_CONTEXT, &[&salt, password.as_bytes()]);
        Self {
            salt,
            digest: *digest.as_bytes(),
        }
    }

    /// Returns `true` if `candidate` matches the stored password.
    pub fn verify(&self, candidate: &str) -> bool {
        let computed =
            domain_separated_hash(PASSWORD_CONTEXT, &[&self.salt, candidate.as_bytes()]);
        computed == blake3::Hash::from(self.digest)
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}
