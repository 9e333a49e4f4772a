//! Per-address transaction chains with ordering enforcement.
//!
//! Each address owns an append-only [`TransactionChain`]. The
//! [`ChainStore`] keeps loaded chains in a keyed map of async mutexes; the
//! owned guard returned by [`ChainStore::lock`] is the reservation on the
//! chain's next nonce and is held for the whole submission.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use super::db::{DbError, WalletDB};
use crate::account::Address;
use crate::transaction::{Transaction, TransactionHash};

/// Errors raised by chain reads and appends.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("nonce out of order for {address}: expected {expected}, got {got}")]
    Ordering {
        address: Address,
        expected: u64,
        got: u64,
    },

    #[error("parent hash of nonce {nonce} does not match the tip of {address}")]
    ParentMismatch { address: Address, nonce: u64 },

    #[error("transaction from {sender} cannot be appended to the chain of {chain}")]
    WrongChain { chain: Address, sender: Address },

    #[error("chain storage error: {0}")]
    Storage(#[from] DbError),
}

impl ChainError {
    /// `true` when the chain moved underneath the caller and a rebuild from
    /// a fresh nonce may succeed.
    pub fn is_ordering(&self) -> bool {
        matches!(self, Self::Ordering { .. } | Self::ParentMismatch { .. })
    }
}

// ---------------------------------------------------------------------------
// TransactionChain
// ---------------------------------------------------------------------------

/// An address's ordered transaction history.
///
/// Nonces run 0, 1, 2, ... with no gaps, and every entry's parent hash is
/// the hash of the entry before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionChain {
    address: Address,
    transactions: Vec<Transaction>,
}

impl TransactionChain {
    /// An empty chain for `address`.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            transactions: Vec::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// The nonce the next appended transaction must carry.
    pub fn next_nonce(&self) -> u64 {
        self.transactions.len() as u64
    }

    /// The transaction the next one must link to.
    pub fn parent(&self) -> Option<&Transaction> {
        self.transactions.last()
    }

    pub fn tip_hash(&self) -> Option<TransactionHash> {
        self.parent().and_then(|tx| tx.hash)
    }

    pub fn get(&self, nonce: u64) -> Option<&Transaction> {
        usize::try_from(nonce)
            .ok()
            .and_then(|i| self.transactions.get(i))
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    fn check_append(&self, tx: &Transaction) -> Result<(), ChainError> {
        if tx.sender != self.address {
            return Err(ChainError::WrongChain {
                chain: self.address,
                sender: tx.sender,
            });
        }
        if tx.nonce != self.next_nonce() {
            return Err(ChainError::Ordering {
                address: self.address,
                expected: self.next_nonce(),
                got: tx.nonce,
            });
        }
        if tx.parent_hash != self.tip_hash() {
            return Err(ChainError::ParentMismatch {
                address: self.address,
                nonce: tx.nonce,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ChainStore
// ---------------------------------------------------------------------------

/// Shared handle to one address's chain.
pub type ChainHandle = Arc<Mutex<TransactionChain>>;

/// Exclusive access to one address's chain, independent of the store's
/// lifetime.
pub type ChainGuard = OwnedMutexGuard<TransactionChain>;

/// Loaded chains plus their sled backing.
#[derive(Debug)]
pub struct ChainStore {
    db: WalletDB,
    chains: DashMap<Address, ChainHandle>,
}

impl ChainStore {
    pub fn new(db: WalletDB) -> Self {
        Self {
            db,
            chains: DashMap::new(),
        }
    }

    /// Returns the chain for `address`, loading it from disk on first
    /// access. An address never seen before yields an empty chain.
    pub fn get_or_create_chain(&self, address: &Address) -> Result<ChainHandle, ChainError> {
        match self.chains.entry(*address) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let transactions = self.db.load_chain(address)?;
                debug!(%address, len = transactions.len(), "chain loaded");
                let handle = Arc::new(Mutex::new(TransactionChain {
                    address: *address,
                    transactions,
                }));
                entry.insert(handle.clone());
                Ok(handle)
            }
        }
    }

    /// Waits for exclusive access to the chain of `address`.
    pub async fn lock(&self, address: &Address) -> Result<ChainGuard, ChainError> {
        let handle = self.get_or_create_chain(address)?;
        Ok(handle.lock_owned().await)
    }

    /// Appends `tx` to `chain`, on disk first and then in memory.
    ///
    /// Fails with an ordering error when the nonce is not the chain's next
    /// nonce or the parent hash is not the tip's hash. Nothing is written in
    /// that case.
    pub fn append(&self, chain: &mut TransactionChain, tx: Transaction) -> Result<(), ChainError> {
        chain.check_append(&tx)?;
        self.db.put_chain_transaction(&tx)?;
        debug!(address = %chain.address, nonce = tx.nonce, "chain advanced");
        chain.transactions.push(tx);
        Ok(())
    }

    /// Replaces the cached copy of `chain` with what is on disk.
    pub fn reload(&self, chain: &mut TransactionChain) -> Result<(), ChainError> {
        chain.transactions = self.db.load_chain(&chain.address)?;
        Ok(())
    }

    /// Persisted chain length for `address`.
    pub fn chain_len(&self, address: &Address) -> Result<u64, ChainError> {
        Ok(self.db.chain_len(address)?)
    }

    /// `true` if the chain of `address` has been read into memory.
    pub fn is_loaded(&self, address: &Address) -> bool {
        self.chains.contains_key(address)
    }

    pub fn loaded_count(&self) -> usize {
        self.chains.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{parse_amount, TransactionBuilder};
    use std::time::Duration;

    fn next_tx(chain: &TransactionChain) -> Transaction {
        let mut tx = TransactionBuilder::new()
            .sender(chain.address())
            .recipient(Address::from_bytes([0xEE; 32]))
            .amount(parse_amount("1").unwrap())
            .nonce(chain.next_nonce())
            .parent(chain.parent())
            .timestamp(1_700_000_000_000)
            .build()
            .unwrap();
        tx.hash = Some(TransactionHash::from_bytes(
            [chain.next_nonce() as u8 + 1; 32],
        ));
        tx
    }

    fn store() -> ChainStore {
        ChainStore::new(WalletDB::open_temporary().unwrap())
    }

    #[tokio::test]
    async fn unseen_address_yields_empty_chain() {
        let store = store();
        let alice = Address::from_bytes([1; 32]);
        assert!(!store.is_loaded(&alice));

        let chain = store.lock(&alice).await.unwrap();
        assert!(chain.is_empty());
        assert_eq!(chain.next_nonce(), 0);
        assert!(chain.parent().is_none());
        assert!(store.is_loaded(&alice));
    }

    #[tokio::test]
    async fn append_links_nonces_and_parents() {
        let store = store();
        let alice = Address::from_bytes([1; 32]);
        let mut chain = store.lock(&alice).await.unwrap();

        for _ in 0..3 {
            let tx = next_tx(&chain);
            store.append(&mut chain, tx).unwrap();
        }

        assert_eq!(chain.next_nonce(), 3);
        assert_eq!(chain.get(1).unwrap().parent_hash, chain.get(0).unwrap().hash);
        assert_eq!(store.chain_len(&alice).unwrap(), 3);
    }

    #[tokio::test]
    async fn stale_nonce_is_ordering_error() {
        let store = store();
        let alice = Address::from_bytes([1; 32]);
        let mut chain = store.lock(&alice).await.unwrap();

        let first = next_tx(&chain);
        let duplicate = first.clone();
        store.append(&mut chain, first).unwrap();

        let err = store.append(&mut chain, duplicate).unwrap_err();
        assert!(err.is_ordering());
        match err {
            ChainError::Ordering { expected, got, .. } => {
                assert_eq!(expected, 1);
                assert_eq!(got, 0);
            }
            other => panic!("expected Ordering, got {:?}", other),
        }
        assert_eq!(store.chain_len(&alice).unwrap(), 1);
    }

    #[tokio::test]
    async fn wrong_parent_is_ordering_error() {
        let store = store();
        let alice = Address::from_bytes([1; 32]);
        let mut chain = store.lock(&alice).await.unwrap();
        let first = next_tx(&chain);
        store.append(&mut chain, first).unwrap();

        let mut tx = next_tx(&chain);
        tx.parent_hash = Some(TransactionHash::from_bytes([0xFF; 32]));
        let err = store.append(&mut chain, tx).unwrap_err();
        assert!(matches!(err, ChainError::ParentMismatch { nonce: 1, .. }));
        assert_eq!(chain.len(), 1);
    }

    #[tokio::test]
    async fn foreign_sender_is_refused() {
        let store = store();
        let mut chain = store.lock(&Address::from_bytes([1; 32])).await.unwrap();
        let mut tx = next_tx(&chain);
        tx.sender = Address::from_bytes([2; 32]);
        let err = store.append(&mut chain, tx).unwrap_err();
        assert!(matches!(err, ChainError::WrongChain { .. }));
        assert!(!err.is_ordering());
    }

    #[tokio::test]
    async fn reload_picks_up_disk_state() {
        let db = WalletDB::open_temporary().unwrap();
        let store = ChainStore::new(db.clone());
        let alice = Address::from_bytes([1; 32]);
        let mut chain = store.lock(&alice).await.unwrap();

        // Another writer advances the chain on disk.
        let tx = next_tx(&chain);
        db.put_chain_transaction(&tx).unwrap();
        assert_eq!(chain.next_nonce(), 0);

        store.reload(&mut chain).unwrap();
        assert_eq!(chain.next_nonce(), 1);
        assert_eq!(chain.tip_hash(), tx.hash);
    }

    #[tokio::test]
    async fn chains_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let alice = Address::from_bytes([1; 32]);
        {
            let store = ChainStore::new(WalletDB::open(dir.path()).unwrap());
            let mut chain = store.lock(&alice).await.unwrap();
            for _ in 0..2 {
                let tx = next_tx(&chain);
                store.append(&mut chain, tx).unwrap();
            }
        }

        let store = ChainStore::new(WalletDB::open(dir.path()).unwrap());
        let chain = store.lock(&alice).await.unwrap();
        assert_eq!(chain.next_nonce(), 2);
        assert_eq!(chain.get(1).unwrap().parent_hash, chain.get(0).unwrap().hash);
    }

    #[tokio::test]
    async fn same_address_serializes_different_addresses_do_not() {
        let store = Arc::new(store());
        let alice = Address::from_bytes([1; 32]);
        let bob = Address::from_bytes([2; 32]);

        let held = store.lock(&alice).await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), store.lock(&alice)).await;
        assert!(blocked.is_err(), "second lock on alice must wait");

        let other = tokio::time::timeout(Duration::from_millis(50), store.lock(&bob)).await;
        assert!(other.is_ok(), "bob must not wait on alice");

        drop(held);
        let reacquired = tokio::time::timeout(Duration::from_millis(50), store.lock(&alice)).await;
        assert!(reacquired.is_ok());
    }
}
