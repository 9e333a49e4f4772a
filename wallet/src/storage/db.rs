//! # WalletDB — Persistent Storage Engine
//!
//! The persistence layer of the wallet, built on sled's embedded key-value
//! store. Chains, pending transactions and account records all flow through
//! this module.
//!
//! ## Tree Layout
//!
//! | Tree       | Key                                  | Value                  |
//! |------------|--------------------------------------|------------------------|
//! | `chains`   | `address` (32B) `\|\|` `nonce` (8B BE) | `bincode(Transaction)` |
//! | `pending`  | `tx_hash` (32B)                      | `bincode(PendingEntry)`|
//! | `published`| `tx_hash` (32B)                      | `bincode(PendingEntry)`|
//! | `accounts` | `username` (UTF-8)                   | `bincode(Account)`     |
//!
//! An entry lives in exactly one of `pending` and `published`; it moves
//! between them in a single sled transaction.
//!
//! Nonces are stored big-endian so that sled's lexicographic ordering
//! matches numeric ordering. A prefix scan over an address therefore yields
//! its chain in nonce order.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use std::path::Path;

use crate::account::{Account, Address};
use crate::config::ADDRESS_LENGTH;
use crate::network::mempool::PendingEntry;
use crate::transaction::{Transaction, TransactionHash};

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("transaction has no hash and cannot be stored")]
    MissingHash,
}

pub type DbResult<T> = Result<T, DbError>;

fn encode<T: Serialize>(value: &T) -> DbResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| DbError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> DbResult<T> {
    bincode::deserialize(bytes).map_err(|e| DbError::Serialization(e.to_string()))
}

/// `address || nonce_be`.
fn chain_key(address: &Address, nonce: u64) -> [u8; ADDRESS_LENGTH + 8] {
    let mut key = [0u8; ADDRESS_LENGTH + 8];
    key[..ADDRESS_LENGTH].copy_from_slice(address.as_bytes());
    key[ADDRESS_LENGTH..].copy_from_slice(&nonce.to_be_bytes());
    key
}

// ---------------------------------------------------------------------------
// WalletDB
// ---------------------------------------------------------------------------

/// Persistent storage engine for the wallet.
///
/// Cloning is cheap; every clone shares the same sled handle.
#[derive(Debug, Clone)]
pub struct WalletDB {
    db: Db,
    /// Per-address transaction chains.
    chains: Tree,
    /// Accepted, not-yet-confirmed transactions keyed by hash.
    pending: Tree,
    /// Acknowledged transactions, moved out of `pending`.
    published: Tree,
    /// Account records keyed by username.
    accounts: Tree,
}

impl WalletDB {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is removed when dropped.
    pub fn open_temporary() -> DbResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let chains = db.open_tree("chains")?;
        let pending = db.open_tree("pending")?;
        let published = db.open_tree("published")?;
        let accounts = db.open_tree("accounts")?;

        Ok(Self {
            db,
            chains,
            pending,
            published,
            accounts,
        })
    }

    // -- Chain operations ---------------------------------------------------

    /// Persist one chain entry under `sender || nonce`.
    ///
    /// Ordering is the caller's responsibility; this only writes.
    pub fn put_chain_transaction(&self, tx: &Transaction) -> DbResult<()> {
        if tx.hash.is_none() {
            return Err(DbError::MissingHash);
        }
        let key = chain_key(&tx.sender, tx.nonce);
        self.chains.insert(key, encode(tx)?)?;
        self.chains.flush()?;
        Ok(())
    }

    /// Load an address's chain in nonce order.
    pub fn load_chain(&self, address: &Address) -> DbResult<Vec<Transaction>> {
        let mut transactions = Vec::new();
        for item in self.chains.scan_prefix(address.as_bytes()) {
            let (_key, value) = item?;
            transactions.push(decode(&value)?);
        }
        Ok(transactions)
    }

    /// Number of persisted transactions for `address`.
    pub fn chain_len(&self, address: &Address) -> DbResult<u64> {
        let mut count = 0u64;
        for item in self.chains.scan_prefix(address.as_bytes()).keys() {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// Retrieve a single chain entry.
    pub fn get_chain_transaction(
        &self,
        address: &Address,
        nonce: u64,
    ) -> DbResult<Option<Transaction>> {
        match self.chains.get(chain_key(address, nonce))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    // -- Pending operations -------------------------------------------------

    /// Persist a pending entry and flush it to disk before returning.
    pub fn put_pending(&self, entry: &PendingEntry) -> DbResult<()> {
        let hash = entry.transaction.hash.ok_or(DbError::MissingHash)?;
        self.pending.insert(hash.as_bytes(), encode(entry)?)?;
        self.pending.flush()?;
        Ok(())
    }

    pub fn get_pending(&self, hash: &TransactionHash) -> DbResult<Option<PendingEntry>> {
        match self.pending.get(hash.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Remove a pending entry. Returns `true` if one existed.
    pub fn remove_pending(&self, hash: &TransactionHash) -> DbResult<bool> {
        let existed = self.pending.remove(hash.as_bytes())?.is_some();
        self.pending.flush()?;
        Ok(existed)
    }

    /// Every pending entry, in hash order.
    pub fn pending_entries(&self) -> DbResult<Vec<PendingEntry>> {
        let mut entries = Vec::new();
        for item in self.pending.iter() {
            let (_key, value) = item?;
            entries.push(decode(&value)?);
        }
        Ok(entries)
    }

    /// Move an acknowledged entry from `pending` to `published`, atomically.
    pub fn archive_published(&self, entry: &PendingEntry) -> DbResult<()> {
        let hash = entry.transaction.hash.ok_or(DbError::MissingHash)?;
        let key = hash.as_bytes().to_vec();
        let value = encode(entry)?;

        (&self.pending, &self.published)
            .transaction(|(pending, published)| {
                pending.remove(key.as_slice())?;
                published.insert(key.as_slice(), value.as_slice())?;
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(|e| match e {
                TransactionError::Storage(e) => DbError::Sled(e),
                TransactionError::Abort(()) => {
                    DbError::Serialization("archive transaction aborted".into())
                }
            })?;
        self.db.flush()?;
        Ok(())
    }

    pub fn get_published(&self, hash: &TransactionHash) -> DbResult<Option<PendingEntry>> {
        match self.published.get(hash.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    // -- Account operations -------------------------------------------------

    /// Persist an account record under its username.
    pub fn put_account(&self, account: &Account) -> DbResult<()> {
        self.accounts
            .insert(account.username.as_bytes(), encode(account)?)?;
        self.accounts.flush()?;
        Ok(())
    }

    pub fn get_account(&self, username: &str) -> DbResult<Option<Account>> {
        match self.accounts.get(username.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    // -- Utility operations -------------------------------------------------

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn published_count(&self) -> usize {
        self.published.len()
    }

    /// Total chain entries across all addresses.
    pub fn chain_transaction_count(&self) -> usize {
        self.chains.len()
    }

    /// Force a flush of all pending writes to disk.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
