//! # Hashing Utilities
//!
//! The two hash functions the wallet core relies on:
//!
//! - **BLAKE3** for addresses and password digests. Its `derive_key` mode
//!   gives us domain separation for free, so an address hash can never be
//!   confused with a password digest even over identical input bytes.
//!
//! - **double SHA-256** for transaction hashes, matching the ledger's
//!   transaction ID construction.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data as a fixed-size array.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute the double-SHA-256 hash: `SHA-256(SHA-256(data))`.
///
/// Used for transaction hashes. The outer hash closes the length-extension
/// hole that a single SHA-256 leaves open.
///
/// # Example
///
/// ```
/// use nova_wallet::crypto::double_sha256;
///
/// let hash = double_sha256(b"NOVA wallet");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Compute the BLAKE3 hash of the input data.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Domain-separated BLAKE3 over several input parts.
///
/// Uses BLAKE3's `derive_key` mode with `context` as the domain tag. Two
/// calls with different contexts never collide, whatever the data.
pub fn domain_separated_hash(context: &str, parts: &[&[u8]]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
