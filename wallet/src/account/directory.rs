//! Account directory: username → account lookups.
//!
//! The credential store's format belongs to whoever registers accounts. The
//! submission core only needs `query_by_username`, so that is the whole
//! trait. Two backends ship with the crate: an in-memory map for tests and
//! embedding, and a sled tree for the server.

use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;

use super::Account;
use crate::storage::db::{DbError, WalletDB};

/// Errors raised by a directory backend.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("account directory storage error: {0}")]
    Storage(#[from] DbError),
}

/// Read access to registered accounts.
pub trait AccountDirectory: Send + Sync {
    /// Looks up an account by username. `Ok(None)` means no such user.
    fn query_by_username(&self, username: &str) -> Result<Option<Account>, DirectoryError>;
}

// ---------------------------------------------------------------------------
// MemoryDirectory
// ---------------------------------------------------------------------------

/// A directory held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an account.
    pub fn insert(&self, account: Account) {
        self.accounts
            .write()
            .insert(account.username.clone(), account);
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

impl AccountDirectory for MemoryDirectory {
    fn query_by_username(&self, username: &str) -> Result<Option<Account>, DirectoryError> {
        Ok(self.accounts.read().get(username).cloned())
    }
}

// ---------------------------------------------------------------------------
// SledDirectory
// ---------------------------------------------------------------------------

/// A directory backed by the `accounts` tree of a [`WalletDB`].
#[derive(Debug, Clone)]
pub struct SledDirectory {
    db: WalletDB,
}

impl SledDirectory {
    pub fn new(db: WalletDB) -> Self {
        Self { db }
    }

    /// Inserts or replaces an account.
    pub fn put(&self, account: &Account) -> Result<(), DirectoryError> {
        self.db.put_account(account)?;
        Ok(())
    }
}

impl AccountDirectory for SledDirectory {
    fn query_by_username(&self, username: &str) -> Result<Option<Account>, DirectoryError> {
        Ok(self.db.get_account(username)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_directory_lookup() {
        let dir = MemoryDirectory::new();
        assert!(dir.is_empty());

        let alice = Account::generate("alice", "pw");
        dir.insert(alice.clone());

        let found = dir.query_by_username("alice").unwrap().unwrap();
        assert_eq!(found.address, alice.address);
        assert!(dir.query_by_username("bob").unwrap().is_none());
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn sled_directory_persists_accounts() {
        let tmp = tempfile::tempdir().unwrap();
        let alice = Account::generate("alice", "pw");
        {
            let dir = SledDirectory::new(WalletDB::open(tmp.path()).unwrap());
            dir.put(&alice).unwrap();
        }

        let dir = SledDirectory::new(WalletDB::open(tmp.path()).unwrap());
        let found = dir.query_by_username("alice").unwrap().unwrap();
        assert_eq!(found.address, alice.address);
        assert!(found.password_hash.verify("pw"));
        assert_eq!(found.secret_key, alice.secret_key);
    }
}
