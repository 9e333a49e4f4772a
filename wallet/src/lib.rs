// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # NOVA Wallet — Transfer Submission Core
//!
//! Everything that happens between "a user asked to send money" and "the
//! ledger node has the signed transaction": authenticate the sender, pick
//! the next nonce on their chain, build and sign the transaction, validate
//! it against local state, record it durably, append it to the chain, and
//! publish it.
//!
//! ## Architecture
//!
//! - **account** — Accounts, addresses, the directory, and the authenticator.
//! - **crypto** — Ed25519 keys, BLAKE3/SHA-256 hashing, password verifiers.
//! - **transaction** — Amounts, hashes, building, signing, verification.
//! - **storage** — sled-backed database and per-address transaction chains.
//! - **network** — The pending store, publish seam, and JSON-RPC types.
//! - **pipeline** — The submission state machine tying it all together.
//! - **error** — Caller-visible errors and their stable kinds.
//! - **config** — Constants and runtime configuration.
//!
//! ## Guarantees
//!
//! 1. Per sender, nonces are contiguous from zero and each transaction names
//!    its predecessor's hash as parent.
//! 2. A transaction on a chain is always recorded in the pending store, as
//!    pending or as published.
//! 3. Failures before persistence leave no trace. A publish failure leaves
//!    the transaction pending and recoverable.

pub mod account;
pub mod config;
pub mod crypto;
pub mod error;
pub mod network;
pub mod pipeline;
pub mod storage;
pub mod transaction;

pub use account::{Account, AccountAuthenticator, Address};
pub use config::WalletConfig;
pub use error::{ErrorKind, SubmitError};
pub use pipeline::{
    PipelineSettings, RepublishReport, SubmissionPipeline, SubmissionStage, TransferRequest,
};
pub use transaction::{Amount, Transaction, TransactionHash};
