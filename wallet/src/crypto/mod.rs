//! # Cryptographic Primitives
//!
//! Thin, type-safe wrappers around audited implementations:
//!
//! - **Ed25519** (`ed25519-dalek`) for transaction signatures.
//! - **BLAKE3** for addresses and password digests.
//! - **double SHA-256** for transaction hashes.
//!
//! Nothing in here is clever, and that is the point.

pub mod hash;
pub mod keys;
pub mod password;

pub use hash::{blake3_hash, domain_separated_hash, double_sha256, sha256};
pub use keys::{KeyError, NovaKeypair, NovaPublicKey, NovaSignature, SecretKey};
pub use password::PasswordHash;
