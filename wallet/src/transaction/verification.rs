//! Transaction verification against the sender's ledger state.
//!
//! Every signed transaction passes a [`LedgerValidator`] before it is
//! recorded. The [`StandardValidator`] orders its checks from cheapest to
//! most expensive (integer comparisons before signature verification) to
//! fail fast on clearly invalid transactions.
//!
//! Failures come in two flavours. [`VerificationError::Rejected`] means the
//! transaction itself is wrong and rebuilding will not help.
//! [`VerificationError::StaleState`] means the transaction was fine for a
//! chain that has since moved; the pipeline re-derives the nonce and tries
//! again.

use chrono::Utc;
use std::time::Duration;
use thiserror::Error;

use super::builder::Transaction;
use super::types::{Amount, TransactionHash};
use crate::account::Address;
use crate::config::{MAX_FUTURE_DRIFT, TRANSACTION_VERSION};
use crate::crypto::keys::{NovaPublicKey, NovaSignature};
use crate::storage::chain::TransactionChain;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Structural reasons a transaction can never be accepted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("unsupported transaction version {version}")]
    UnsupportedVersion { version: u16 },

    #[error("sender and recipient must differ: both are {address}")]
    SelfTransfer { address: Address },

    #[error("timestamp {timestamp_ms} is {delta_secs}s in the future (max allowed: {max_secs}s)")]
    TimestampTooFarInFuture {
        timestamp_ms: u64,
        delta_secs: u64,
        max_secs: u64,
    },

    #[error("insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: Amount, required: Amount },

    #[error("transaction is unsigned")]
    MissingSignature,

    #[error("malformed signature")]
    MalformedSignature,

    #[error("transaction carries no sender public key")]
    MissingPublicKey,

    #[error("sender public key is not a valid Ed25519 point")]
    InvalidPublicKey,

    #[error("sender public key does not derive sender address {sender}")]
    KeyAddressMismatch { sender: Address },

    #[error("transaction has no hash")]
    MissingHash,

    #[error("transaction hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        expected: TransactionHash,
        actual: TransactionHash,
    },

    #[error("invalid signature: does not verify against sender {sender}")]
    InvalidSignature { sender: Address },
}

/// Ways a valid transaction can be out of date.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StaleReason {
    #[error("nonce {got} is not the next nonce {expected}")]
    NonceMismatch { expected: u64, got: u64 },

    #[error("parent hash of nonce {nonce} is not the current chain tip")]
    ParentMismatch { nonce: u64 },
}

/// Outcome of a failed validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("transaction rejected: {0}")]
    Rejected(#[from] RejectReason),

    #[error("stale ledger state: {0}")]
    StaleState(#[from] StaleReason),
}

impl VerificationError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StaleState(_))
    }
}

// ---------------------------------------------------------------------------
// Ledger state
// ---------------------------------------------------------------------------

/// What the validator knows about the sender's chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerState {
    /// Nonce the transaction must carry.
    pub expected_nonce: u64,
    /// Hash the transaction's parent link must equal.
    pub tip_hash: Option<TransactionHash>,
    /// Spendable balance, when a balance source is configured.
    pub available_balance: Option<Amount>,
}

impl LedgerState {
    /// State of `chain`, with no balance information.
    pub fn from_chain(chain: &TransactionChain) -> Self {
        Self {
            expected_nonce: chain.next_nonce(),
            tip_hash: chain.tip_hash(),
            available_balance: None,
        }
    }

    pub fn with_balance(mut self, balance: Option<Amount>) -> Self {
        self.available_balance = balance;
        self
    }
}

/// Supplies spendable balances to the validator.
///
/// Balances are ledger state the wallet does not own. Without a source the
/// balance rule is skipped and left to the consensus layer.
pub trait BalanceSource: Send + Sync {
    fn available_balance(&self, address: &Address) -> Option<Amount>;
}

// ---------------------------------------------------------------------------
// Validators
// ---------------------------------------------------------------------------

/// Applies ledger rules to a signed transaction.
pub trait LedgerValidator: Send + Sync {
    fn validate(&self, tx: &Transaction, state: &LedgerState) -> Result<(), VerificationError>;
}

/// The default rule set.
///
/// The checks, in order:
///
/// 1. **Version** must be the supported format version.
/// 2. **Self-transfer**: sender must differ from recipient.
/// 3. **Timestamp** must not be more than `max_future_drift` ahead.
/// 4. **Nonce** must equal the expected next nonce (stale otherwise).
/// 5. **Parent** must equal the chain tip (stale otherwise).
/// 6. **Balance** must cover the amount, when known.
/// 7. **Signature** and **public key** must be present and well-formed.
/// 8. **Public key** must derive the sender address.
/// 9. **Hash** must equal the recomputed content hash.
/// 10. **Signature** must verify over the signable bytes.
#[derive(Debug, Clone)]
pub struct StandardValidator {
    /// Transactions stamped further ahead than this are rejected.
    pub max_future_drift: Duration,
    /// The only accepted format version.
    pub version: u16,
}

impl Default for StandardValidator {
    fn default() -> Self {
        Self {
            max_future_drift: MAX_FUTURE_DRIFT,
            version: TRANSACTION_VERSION,
        }
    }
}

impl LedgerValidator for StandardValidator {
    fn validate(&self, tx: &Transaction, state: &LedgerState) -> Result<(), VerificationError> {
        // 1. Format version.
        if tx.version != self.version {
            return Err(RejectReason::UnsupportedVersion {
                version: tx.version,
            }
            .into());
        }

        // 2. No self-transfers.
        if tx.sender == tx.recipient {
            return Err(RejectReason::SelfTransfer { address: tx.sender }.into());
        }

        // 3. Timestamp must not be unreasonably far in the future.
        let now_ms = Utc::now().timestamp_millis().max(0) as u64;
        let max_future_ms = now_ms.saturating_add(self.max_future_drift.as_millis() as u64);
        if tx.timestamp > max_future_ms {
            return Err(RejectReason::TimestampTooFarInFuture {
                timestamp_ms: tx.timestamp,
                delta_secs: (tx.timestamp - now_ms) / 1_000,
                max_secs: self.max_future_drift.as_secs(),
            }
            .into());
        }

        // 4-5. The chain may have moved since the transaction was built.
        if tx.nonce != state.expected_nonce {
            return Err(StaleReason::NonceMismatch {
                expected: state.expected_nonce,
                got: tx.nonce,
            }
            .into());
        }
        if tx.parent_hash != state.tip_hash {
            return Err(StaleReason::ParentMismatch { nonce: tx.nonce }.into());
        }

        // 6. Balance, when known.
        if let Some(available) = state.available_balance {
            if available < tx.amount {
                return Err(RejectReason::InsufficientBalance {
                    available,
                    required: tx.amount,
                }
                .into());
            }
        }

        // 7. Decode signature and public key.
        let sig_hex = tx
            .signature
            .as_ref()
            .ok_or(RejectReason::MissingSignature)?;
        let signature =
            NovaSignature::from_hex(sig_hex).map_err(|_| RejectReason::MalformedSignature)?;

        let pk_hex = tx
            .sender_public_key
            .as_ref()
            .ok_or(RejectReason::MissingPublicKey)?;
        let public_key =
            NovaPublicKey::from_hex(pk_hex).map_err(|_| RejectReason::InvalidPublicKey)?;

        // 8. Key substitution guard.
        if Address::from_public_key(&public_key) != tx.sender {
            return Err(RejectReason::KeyAddressMismatch { sender: tx.sender }.into());
        }

        // 9. Content hash integrity.
        let actual = tx.hash.ok_or(RejectReason::MissingHash)?;
        let expected = tx.compute_hash().ok_or(RejectReason::MissingSignature)?;
        if actual != expected {
            return Err(RejectReason::HashMismatch { expected, actual }.into());
        }

        // 10. Signature.
        if !public_key.verify(&tx.signable_bytes(), &signature) {
            return Err(RejectReason::InvalidSignature { sender: tx.sender }.into());
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::NovaKeypair;
    use crate::transaction::builder::TransactionBuilder;
    use crate::transaction::signing::sign_transaction;
    use crate::transaction::types::parse_amount;

    fn fresh_state() -> LedgerState {
        LedgerState {
            expected_nonce: 0,
            tip_hash: None,
            available_balance: None,
        }
    }

    fn unsigned(kp: &NovaKeypair) -> Transaction {
        TransactionBuilder::new()
            .sender(Address::from_public_key(&kp.public_key()))
            .recipient(Address::from_bytes([0xB0; 32]))
            .amount(parse_amount("10.5").unwrap())
            .nonce(0)
            .build()
            .unwrap()
    }

    /// Helper: build and sign a valid first transaction.
    fn valid_signed_tx() -> (Transaction, NovaKeypair) {
        let kp = NovaKeypair::generate();
        let mut tx = unsigned(&kp);
        sign_transaction(&mut tx, &kp);
        (tx, kp)
    }

    fn rejected(result: Result<(), VerificationError>) -> RejectReason {
        match result {
            Err(VerificationError::Rejected(reason)) => reason,
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn valid_transaction_passes() {
        let (tx, _) = valid_signed_tx();
        assert!(StandardValidator::default().validate(&tx, &fresh_state()).is_ok());
    }

    #[test]
    fn rejects_self_transfer() {
        let kp = NovaKeypair::generate();
        let sender = Address::from_public_key(&kp.public_key());
        let mut tx = unsigned(&kp);
        tx.recipient = sender;
        sign_transaction(&mut tx, &kp);

        let reason = rejected(StandardValidator::default().validate(&tx, &fresh_state()));
        assert_eq!(reason, RejectReason::SelfTransfer { address: sender });
    }

    #[test]
    fn rejects_future_timestamp() {
        let kp = NovaKeypair::generate();
        let mut tx = unsigned(&kp);
        tx.timestamp = Utc::now().timestamp_millis() as u64 + 600_000;
        sign_transaction(&mut tx, &kp);

        let reason = rejected(StandardValidator::default().validate(&tx, &fresh_state()));
        assert!(matches!(
            reason,
            RejectReason::TimestampTooFarInFuture { max_secs: 300, .. }
        ));
    }

    #[test]
    fn nonce_behind_chain_is_stale() {
        let (tx, _) = valid_signed_tx();
        let state = LedgerState {
            expected_nonce: 1,
            tip_hash: Some(TransactionHash::from_bytes([1; 32])),
            available_balance: None,
        };
        let err = StandardValidator::default().validate(&tx, &state).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(
            err,
            VerificationError::StaleState(StaleReason::NonceMismatch {
                expected: 1,
                got: 0
            })
        );
    }

    #[test]
    fn wrong_parent_is_stale() {
        let (tx, _) = valid_signed_tx();
        let state = LedgerState {
            tip_hash: Some(TransactionHash::from_bytes([1; 32])),
            ..fresh_state()
        };
        let err = StandardValidator::default().validate(&tx, &state).unwrap_err();
        assert_eq!(
            err,
            VerificationError::StaleState(StaleReason::ParentMismatch { nonce: 0 })
        );
    }

    #[test]
    fn insufficient_balance_is_rejected_not_stale() {
        let (tx, _) = valid_signed_tx();
        let state = fresh_state().with_balance(Some(parse_amount("10").unwrap()));
        let err = StandardValidator::default().validate(&tx, &state).unwrap_err();
        assert!(!err.is_retryable());
        assert!(matches!(
            err,
            VerificationError::Rejected(RejectReason::InsufficientBalance { .. })
        ));

        let enough = fresh_state().with_balance(Some(parse_amount("10.5").unwrap()));
        assert!(StandardValidator::default().validate(&tx, &enough).is_ok());
    }

    #[test]
    fn rejects_unsigned_transaction() {
        let kp = NovaKeypair::generate();
        let tx = unsigned(&kp);
        let reason = rejected(StandardValidator::default().validate(&tx, &fresh_state()));
        assert_eq!(reason, RejectReason::MissingSignature);
    }

    #[test]
    fn rejects_tampered_amount() {
        let (mut tx, _) = valid_signed_tx();
        tx.amount = parse_amount("1000").unwrap();
        let reason = rejected(StandardValidator::default().validate(&tx, &fresh_state()));
        assert!(matches!(reason, RejectReason::HashMismatch { .. }));
    }

    #[test]
    fn rejects_signature_from_another_key_with_rehash() {
        let (mut tx, _) = valid_signed_tx();
        let stranger = NovaKeypair::generate();
        tx.signature = Some(stranger.sign(&tx.signable_bytes()).to_hex());
        tx.hash = tx.compute_hash();

        let reason = rejected(StandardValidator::default().validate(&tx, &fresh_state()));
        assert_eq!(reason, RejectReason::InvalidSignature { sender: tx.sender });
    }

    #[test]
    fn rejects_substituted_public_key() {
        let (mut tx, _) = valid_signed_tx();
        let stranger = NovaKeypair::generate();
        tx.sender_public_key = Some(stranger.public_key().to_hex());

        let reason = rejected(StandardValidator::default().validate(&tx, &fresh_state()));
        assert_eq!(reason, RejectReason::KeyAddressMismatch { sender: tx.sender });
    }

    #[test]
    fn rejects_malformed_signature() {
        let (mut tx, _) = valid_signed_tx();
        tx.signature = Some("not-hex".to_string());
        let reason = rejected(StandardValidator::default().validate(&tx, &fresh_state()));
        assert_eq!(reason, RejectReason::MalformedSignature);
    }

    #[test]
    fn rejects_unknown_version() {
        let kp = NovaKeypair::generate();
        let mut tx = unsigned(&kp);
        tx.version = 9;
        sign_transaction(&mut tx, &kp);
        let reason = rejected(StandardValidator::default().validate(&tx, &fresh_state()));
        assert_eq!(reason, RejectReason::UnsupportedVersion { version: 9 });
    }

    #[test]
    fn state_from_chain_tracks_tip() {
        let chain = TransactionChain::new(Address::from_bytes([1; 32]));
        let state = LedgerState::from_chain(&chain);
        assert_eq!(state, fresh_state());
    }
}
