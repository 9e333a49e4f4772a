//! # Storage Module
//!
//! Persistent storage for the wallet: per-address transaction chains and
//! the sled database underneath them.
//!
//! ## Architecture
//!
//! ```text
//! chain.rs  — TransactionChain and the keyed-lock ChainStore
//! db.rs     — sled persistence with one tree per data type
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! SubmissionPipeline → ChainStore.lock(address) → append(tx)
//!                              ↓                      ↓
//!                          WalletDB              WalletDB
//!                      (chains, load)        (chains, write)
//! ```
//!
//! Bincode is used for everything on disk. JSON is for APIs; it never
//! reaches sled.

pub mod chain;
pub mod db;

pub use chain::{ChainError, ChainGuard, ChainHandle, ChainStore, TransactionChain};
pub use db::{DbError, DbResult, WalletDB};
