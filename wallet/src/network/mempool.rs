//! Durable pending-transaction store.
//!
//! Every transaction that passes validation is recorded here before it is
//! appended to its chain or published. A recorded-but-unpublished entry can
//! be republished later without re-signing.
//!
//! ## Design
//!
//! - sled is the source of truth; every write is flushed before it returns.
//! - A `DashMap` index mirrors the `pending` tree for lookups and listings
//!   without touching disk. It is rebuilt from sled on open.
//! - Once acknowledged, an entry leaves the index and moves to the
//!   `published` tree, so memory holds only what still needs publishing.

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use super::publish::Acknowledgment;
use crate::account::Address;
use crate::storage::db::{DbError, WalletDB};
use crate::transaction::{Transaction, TransactionHash};

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// Publish status of a recorded transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PendingStatus {
    /// Recorded, not yet acknowledged by the ledger node.
    Pending,
    /// Acknowledged by the ledger node.
    Published,
}

impl fmt::Display for PendingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Published => write!(f, "Published"),
        }
    }
}

/// A recorded transaction together with its publish bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEntry {
    /// The signed, validated transaction.
    pub transaction: Transaction,

    pub status: PendingStatus,

    /// Unix milliseconds when the entry was recorded.
    pub recorded_at_ms: u64,

    /// Publish attempts so far.
    pub attempts: u32,

    /// Set once the ledger node acknowledged the transaction.
    pub acknowledgment: Option<Acknowledgment>,
}

impl PendingEntry {
    pub fn new(transaction: Transaction) -> Self {
        Self {
            transaction,
            status: PendingStatus::Pending,
            recorded_at_ms: Utc::now().timestamp_millis().max(0) as u64,
            attempts: 0,
            acknowledgment: None,
        }
    }

    pub fn hash(&self) -> Option<TransactionHash> {
        self.transaction.hash
    }

    pub fn is_published(&self) -> bool {
        self.status == PendingStatus::Published
    }
}

// ---------------------------------------------------------------------------
// PendingError
// ---------------------------------------------------------------------------

/// Errors returned by pending store operations.
#[derive(Debug, Error)]
pub enum PendingError {
    #[error("transaction {hash} is already recorded")]
    Duplicate { hash: TransactionHash },

    #[error("transaction has no hash and cannot be recorded")]
    MissingHash,

    #[error("transaction {hash} is not recorded")]
    NotFound { hash: TransactionHash },

    #[error("pending store storage error: {0}")]
    Storage(#[from] DbError),
}

// ---------------------------------------------------------------------------
// PendingStore
// ---------------------------------------------------------------------------

/// Durable holding area for accepted transactions.
pub trait PendingStore: Send + Sync {
    /// Records `tx` durably. Returns only once the entry is on disk.
    fn record(&self, tx: &Transaction) -> Result<(), PendingError>;

    /// Removes an entry. Only used to undo a record whose chain append
    /// failed in the same critical section.
    fn discard(&self, hash: &TransactionHash) -> Result<bool, PendingError>;

    /// Counts one publish attempt and returns the new total.
    fn note_attempt(&self, hash: &TransactionHash) -> Result<u32, PendingError>;

    /// Marks an entry as acknowledged by the ledger node. It no longer
    /// counts towards [`len`](Self::len) but stays readable through
    /// [`get`](Self::get).
    fn mark_published(
        &self,
        hash: &TransactionHash,
        ack: Acknowledgment,
    ) -> Result<(), PendingError>;

    /// Looks an entry up, published or not.
    fn get(&self, hash: &TransactionHash) -> Result<Option<PendingEntry>, PendingError>;

    /// Entries not yet published, ordered by sender then nonce.
    fn unpublished(&self) -> Result<Vec<PendingEntry>, PendingError>;

    /// Unpublished entries for `sender`, in nonce order.
    fn pending_for_sender(&self, sender: &Address) -> Result<Vec<PendingEntry>, PendingError>;

    /// Number of entries awaiting publish.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The default [`PendingStore`], backed by the `pending` and `published`
/// trees of a [`WalletDB`].
pub struct SledPendingStore {
    db: WalletDB,
    index: DashMap<TransactionHash, PendingEntry>,
}

impl fmt::Debug for SledPendingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SledPendingStore")
            .field("size", &self.index.len())
            .finish()
    }
}

impl SledPendingStore {
    /// Opens the store and rebuilds the in-memory index from disk.
    pub fn open(db: WalletDB) -> Result<Self, PendingError> {
        let index = DashMap::new();
        for entry in db.pending_entries()? {
            if let Some(hash) = entry.hash() {
                index.insert(hash, entry);
            }
        }
        debug!(entries = index.len(), "pending store opened");
        Ok(Self { db, index })
    }

    fn update<F>(&self, hash: &TransactionHash, change: F) -> Result<PendingEntry, PendingError>
    where
        F: FnOnce(&mut PendingEntry),
    {
        let mut entry = self
            .index
            .get(hash)
            .map(|e| e.value().clone())
            .ok_or(PendingError::NotFound { hash: *hash })?;
        change(&mut entry);
        self.db.put_pending(&entry)?;
        self.index.insert(*hash, entry.clone());
        Ok(entry)
    }
}

fn by_sender_then_nonce(entries: &mut [PendingEntry]) {
    entries.sort_by(|a, b| {
        a.transaction
            .sender
            .cmp(&b.transaction.sender)
            .then_with(|| a.transaction.nonce.cmp(&b.transaction.nonce))
    });
}

impl PendingStore for SledPendingStore {
    fn record(&self, tx: &Transaction) -> Result<(), PendingError> {
        let hash = tx.hash.ok_or(PendingError::MissingHash)?;
        if self.index.contains_key(&hash) || self.db.get_published(&hash)?.is_some() {
            return Err(PendingError::Duplicate { hash });
        }
        let entry = PendingEntry::new(tx.clone());
        self.db.put_pending(&entry)?;
        self.index.insert(hash, entry);
        Ok(())
    }

    fn discard(&self, hash: &TransactionHash) -> Result<bool, PendingError> {
        let existed = self.db.remove_pending(hash)?;
        self.index.remove(hash);
        Ok(existed)
    }

    fn note_attempt(&self, hash: &TransactionHash) -> Result<u32, PendingError> {
        let entry = self.update(hash, |e| e.attempts = e.attempts.saturating_add(1))?;
        Ok(entry.attempts)
    }

    fn mark_published(
        &self,
        hash: &TransactionHash,
        ack: Acknowledgment,
    ) -> Result<(), PendingError> {
        let Some(mut entry) = self.index.get(hash).map(|e| e.value().clone()) else {
            if self.db.get_published(hash)?.is_some() {
                return Ok(());
            }
            return Err(PendingError::NotFound { hash: *hash });
        };
        entry.status = PendingStatus::Published;
        entry.acknowledgment = Some(ack);
        self.db.archive_published(&entry)?;
        self.index.remove(hash);
        Ok(())
    }

    fn get(&self, hash: &TransactionHash) -> Result<Option<PendingEntry>, PendingError> {
        if let Some(entry) = self.index.get(hash) {
            return Ok(Some(entry.value().clone()));
        }
        Ok(self.db.get_published(hash)?)
    }

    fn unpublished(&self) -> Result<Vec<PendingEntry>, PendingError> {
        let mut entries: Vec<PendingEntry> =
            self.index.iter().map(|e| e.value().clone()).collect();
        by_sender_then_nonce(&mut entries);
        Ok(entries)
    }

    fn pending_for_sender(&self, sender: &Address) -> Result<Vec<PendingEntry>, PendingError> {
        let mut entries: Vec<PendingEntry> = self
            .index
            .iter()
            .filter(|e| e.value().transaction.sender == *sender)
            .map(|e| e.value().clone())
            .collect();
        by_sender_then_nonce(&mut entries);
        Ok(entries)
    }

    fn len(&self) -> usize {
        self.index.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
