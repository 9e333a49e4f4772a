//! Transaction signing with Ed25519 keypairs.
//!
//! Signing is a separate step from building because the key comes from the
//! account record, not the request, and may turn out to be unusable. The
//! signing data is the canonical [`Transaction::signable_bytes`] output;
//! the content hash is computed right after, over the signable bytes and
//! the signature.

use thiserror::Error;

use super::builder::Transaction;
use crate::account::Address;
use crate::crypto::keys::{KeyError, NovaKeypair, SecretKey};

/// Failures raised while signing a transaction.
///
/// A key problem here means the stored credentials are corrupt. It is not
/// an authentication failure and is reported separately.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigningError {
    #[error("account key material is unusable: {0}")]
    Key(#[from] KeyError),

    #[error("account key does not belong to sender {sender}")]
    KeyMismatch { sender: Address },
}

/// Produces signed transactions.
///
/// Implementations receive the key by reference and must not retain or
/// expose it.
pub trait Signer: Send + Sync {
    fn sign(&self, tx: Transaction, key: &SecretKey) -> Result<Transaction, SigningError>;
}

/// The default [`Signer`]: Ed25519 over the canonical signable bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Signer;

impl Signer for Ed25519Signer {
    fn sign(&self, mut tx: Transaction, key: &SecretKey) -> Result<Transaction, SigningError> {
        let keypair = key.keypair()?;
        if Address::from_public_key(&keypair.public_key()) != tx.sender {
            return Err(SigningError::KeyMismatch { sender: tx.sender });
        }
        sign_transaction(&mut tx, &keypair);
        Ok(tx)
    }
}

/// Signs a transaction in place.
///
/// 1. Compute `signable_bytes()`.
/// 2. Produce an Ed25519 signature over those bytes.
/// 3. Store the hex-encoded signature and public key.
/// 4. Assign the content hash.
///
/// The caller is responsible for ensuring `keypair` matches `tx.sender`.
pub fn sign_transaction<'a>(tx: &'a mut Transaction, keypair: &NovaKeypair) -> &'a Transaction {
    let signature = keypair.sign(&tx.signable_bytes());
    tx.signature = Some(signature.to_hex());
    tx.sender_public_key = Some(keypair.public_key().to_hex());
    tx.hash = tx.compute_hash();
    tx
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
