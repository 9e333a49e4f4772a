//! Transaction construction via the builder pattern.
//!
//! The [`TransactionBuilder`] takes the chain-derived fields (nonce and
//! parent link) plus the caller's transfer, runs the cheap local checks, and
//! hands back an unsigned [`Transaction`]. Signing happens in
//! [`super::signing`]; the content hash is only assigned there, once the
//! signature exists.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{Amount, TransactionHash};
use crate::account::Address;
use crate::config::{DEFAULT_MAX_PAYLOAD_BYTES, TRANSACTION_VERSION};
use crate::crypto::hash::double_sha256;

/// Local validation failures raised by [`TransactionBuilder::build`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("transaction sender is not set")]
    MissingSender,

    #[error("transaction recipient is not set")]
    MissingRecipient,

    #[error("transaction amount is not set")]
    MissingAmount,

    #[error("payload is {size} bytes, limit is {max}")]
    PayloadTooLarge { size: usize, max: usize },
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A value transfer from one account chain.
///
/// Immutable once signed. The JSON form of this struct, in field order, is
/// the canonical text handed back to the caller (see
/// [`Transaction::to_canonical_string`]).
///
/// # Canonical Byte Format
///
/// [`Transaction::signable_bytes`] covers version, sender, recipient,
/// nonce, amount, payload, parent hash and timestamp. The public key,
/// signature and hash are excluded. The hash is then
/// `double_sha256(signable_bytes || signature)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sending account.
    pub sender: Address,

    /// Receiving account.
    pub recipient: Address,

    /// Position in the sender's chain, starting at 0.
    pub nonce: u64,

    /// Transfer amount.
    pub amount: Amount,

    /// Opaque application payload. Hex in JSON.
    #[serde(with = "payload_serde")]
    pub payload: Vec<u8>,

    /// Hash of the previous transaction in the sender's chain. `None` for
    /// the first transaction.
    pub parent_hash: Option<TransactionHash>,

    /// Unix timestamp in milliseconds when the transaction was built.
    pub timestamp: u64,

    /// Transaction format version.
    pub version: u16,

    /// Hex-encoded sender public key, set during signing.
    pub sender_public_key: Option<String>,

    /// Hex-encoded Ed25519 signature over [`Transaction::signable_bytes`].
    pub signature: Option<String>,

    /// Content hash, set during signing.
    pub hash: Option<TransactionHash>,
}

impl Transaction {
    /// Returns the canonical byte representation covered by the signature.
    ///
    /// Fixed-width little-endian integers, raw address bytes, and
    /// length-prefixed variable fields. JSON is not used here because its
    /// field ordering is a property of the encoder, not of the data.
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(160 + self.payload.len());

        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(self.sender.as_bytes());
        buf.extend_from_slice(self.recipient.as_bytes());
        buf.extend_from_slice(&self.nonce.to_le_bytes());

        let amount = self.amount.to_string();
        buf.extend_from_slice(&(amount.len() as u32).to_le_bytes());
        buf.extend_from_slice(amount.as_bytes());

        buf.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.payload);

        match self.parent_hash {
            Some(parent) => {
                buf.push(0x01);
                buf.extend_from_slice(parent.as_bytes());
            }
            None => buf.push(0x00),
        }

        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf
    }

    /// Computes the content hash from the current field values.
    ///
    /// Returns `None` for an unsigned transaction.
    pub fn compute_hash(&self) -> Option<TransactionHash> {
        let signature = self.signature.as_ref()?;
        let mut data = self.signable_bytes();
        data.extend_from_slice(signature.as_bytes());
        Some(TransactionHash::from_bytes(double_sha256(&data)))
    }

    /// Returns `true` if the transaction carries a signature.
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Canonical JSON text of the transaction.
    pub fn to_canonical_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

mod payload_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(bytes))
        } else {
            serializer.serialize_bytes(bytes)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            hex::decode(s).map_err(serde::de::Error::custom)
        } else {
            Vec::<u8>::deserialize(deserializer)
        }
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for unsigned [`Transaction`] instances.
///
/// ```rust,no_run
/// use nova_wallet::account::Address;
/// use nova_wallet::transaction::{parse_amount, TransactionBuilder};
///
/// let tx = TransactionBuilder::new()
///     .sender(Address::from_bytes([1; 32]))
///     .recipient(Address::from_bytes([2; 32]))
///     .amount(parse_amount("10.5").unwrap())
///     .nonce(0)
///     .build()
///     .unwrap();
/// assert!(tx.parent_hash.is_none());
/// ```
///
/// `timestamp` defaults to the current UTC time at build time. Sender and
/// recipient equality is not checked here; the validator owns that rule.
pub struct TransactionBuilder {
    version: u16,
    sender: Option<Address>,
    recipient: Option<Address>,
    amount: Option<Amount>,
    nonce: u64,
    parent_hash: Option<TransactionHash>,
    timestamp: Option<u64>,
    payload: Vec<u8>,
    max_payload_bytes: usize,
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self {
            version: TRANSACTION_VERSION,
            sender: None,
            recipient: None,
            amount: None,
            nonce: 0,
            parent_hash: None,
            timestamp: None,
            payload: Vec::new(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    /// Sets the format version. Only needed for testing version upgrades.
    pub fn version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    pub fn sender(mut self, address: Address) -> Self {
        self.sender = Some(address);
        self
    }

    pub fn recipient(mut self, address: Address) -> Self {
        self.recipient = Some(address);
        self
    }

    pub fn amount(mut self, amount: Amount) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Links to the previous transaction in the sender's chain.
    pub fn parent(mut self, parent: Option<&Transaction>) -> Self {
        self.parent_hash = parent.and_then(|p| p.hash);
        self
    }

    /// Links to a parent by hash.
    pub fn parent_hash(mut self, hash: Option<TransactionHash>) -> Self {
        self.parent_hash = hash;
        self
    }

    /// Sets the timestamp explicitly (Unix milliseconds).
    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn payload(mut self, data: Vec<u8>) -> Self {
        self.payload = data;
        self
    }

    /// Overrides the payload size limit.
    pub fn max_payload_bytes(mut self, max: usize) -> Self {
        self.max_payload_bytes = max;
        self
    }

    /// Consumes the builder and produces an unsigned [`Transaction`].
    pub fn build(self) -> Result<Transaction, BuildError> {
        let sender = self.sender.ok_or(BuildError::MissingSender)?;
        let recipient = self.recipient.ok_or(BuildError::MissingRecipient)?;
        let amount = self.amount.ok_or(BuildError::MissingAmount)?;

        if self.payload.len() > self.max_payload_bytes {
            return Err(BuildError::PayloadTooLarge {
                size: self.payload.len(),
                max: self.max_payload_bytes,
            });
        }

        let timestamp = self
            .timestamp
            .unwrap_or_else(|| Utc::now().timestamp_millis().max(0) as u64);

        Ok(Transaction {
            sender,
            recipient,
            nonce: self.nonce,
            amount,
            payload: self.payload,
            parent_hash: self.parent_hash,
            timestamp,
            version: self.version,
            sender_public_key: None,
            signature: None,
            hash: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
