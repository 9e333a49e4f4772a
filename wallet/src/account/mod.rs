//! # Accounts
//!
//! Wallet accounts, the directory that stores them, and the authenticator
//! that gates outbound transfers.
//!
//! ```text
//! address.rs   — Address type and its `0x` text form
//! directory.rs — AccountDirectory trait with memory and sled backends
//! auth.rs      — AccountAuthenticator: policy, credentials, recipient lookup
//! ```

pub mod address;
pub mod auth;
pub mod directory;

pub use address::{Address, AddressError};
pub use auth::{AccountAuthenticator, AuthError, PolicyError, ResolveError};
pub use directory::{AccountDirectory, DirectoryError, MemoryDirectory, SledDirectory};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::keys::{NovaKeypair, SecretKey};
use crate::crypto::password::PasswordHash;

/// A registered wallet account.
///
/// Registration happens outside this crate; the submission core only reads
/// accounts. The private key is opaque here and may be unusable, which
/// surfaces as a signing error later.
#[derive(Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique login name.
    pub username: String,
    /// On-ledger address the account sends from.
    pub address: Address,
    /// Salted password verifier.
    pub password_hash: PasswordHash,
    /// Private key material as stored.
    pub secret_key: SecretKey,
}

impl Account {
    /// Creates an account for an existing keypair.
    pub fn new(username: &str, password: &str, keypair: &NovaKeypair) -> Self {
        Self {
            username: username.to_string(),
            address: Address::from_public_key(&keypair.public_key()),
            password_hash: PasswordHash::new(password),
            secret_key: SecretKey::from(keypair),
        }
    }

    /// Creates an account with a freshly generated keypair.
    pub fn generate(username: &str, password: &str) -> Self {
        Self::new(username, password, &NovaKeypair::generate())
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
