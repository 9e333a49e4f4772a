//! # Transaction Module
//!
//! Construction, signing and verification of wallet transfers. Every
//! outbound transfer is represented as a [`Transaction`] linked into its
//! sender's chain by nonce and parent hash.
//!
//! ## Architecture
//!
//! ```text
//! types.rs        — Amount, parse_amount, TransactionHash
//! builder.rs      — Transaction and the fluent TransactionBuilder
//! signing.rs      — Signer trait and the Ed25519 default
//! verification.rs — LedgerValidator trait, LedgerState, StandardValidator
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Build** with [`TransactionBuilder`] from the chain's next nonce and tip.
//! 2. **Sign** with a [`Signer`]; this also assigns the content hash.
//! 3. **Validate** with a [`LedgerValidator`] against the chain's [`LedgerState`].
//! 4. **Record** in the pending store, then append to the chain.
//! 5. **Publish** to the ledger node.
//!
//! ## Design Decisions
//!
//! - The hash is `double_sha256(signable_bytes || signature)`, so it exists
//!   only after signing and commits to the signature.
//! - Amounts are `rust_decimal` values, never floats.
//! - Timestamps are checked against a 5-minute future window.

pub mod builder;
pub mod signing;
pub mod types;
pub mod verification;

pub use builder::{BuildError, Transaction, TransactionBuilder};
pub use signing::{sign_transaction, Ed25519Signer, Signer, SigningError};
pub use types::{parse_amount, Amount, AmountError, HashParseError, TransactionHash};
pub use verification::{
    BalanceSource, LedgerState, LedgerValidator, RejectReason, StaleReason, StandardValidator,
    VerificationError,
};
