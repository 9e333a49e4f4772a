//! Forwarding accepted transactions to the ledger node.
//!
//! The wallet does not gossip or produce blocks. It hands each recorded
//! transaction to a ledger node through a [`PublishClient`] and waits,
//! bounded by the pipeline's timeout, for an [`Acknowledgment`]. A failed
//! publish leaves the transaction in the pending store for a later retry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transaction::TransactionHash;

/// Receipt returned by the ledger node for a published transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgment {
    /// The transaction the node acknowledged.
    pub hash: TransactionHash,
    /// Free-form status text from the node.
    pub detail: String,
}

/// Publish failures. All of them leave the pending record in place.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("publish timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("ledger node unreachable: {0}")]
    Transport(String),

    #[error("ledger node rejected transaction (code {code}): {message}")]
    Rejected { code: i32, message: String },

    #[error("transaction {hash} is not in the pending store")]
    UnknownTransaction { hash: TransactionHash },

    #[error("malformed response from ledger node: {0}")]
    InvalidResponse(String),
}

/// Submits recorded transactions to the network.
#[async_trait]
pub trait PublishClient: Send + Sync {
    /// Publishes the recorded transaction with the given hash.
    async fn publish(&self, hash: &TransactionHash) -> Result<Acknowledgment, PublishError>;
}
