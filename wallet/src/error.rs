//! Caller-visible submission errors.
//!
//! Each pipeline stage has its own error enum. [`SubmitError`] wraps them
//! and classifies every failure into one stable [`ErrorKind`], which is what
//! boundary layers map to status codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::account::{Address, AuthError, PolicyError, ResolveError};
use crate::network::{PendingError, PublishError};
use crate::storage::ChainError;
use crate::transaction::{AmountError, BuildError, SigningError, TransactionHash, VerificationError};

/// Stable failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Auth,
    Policy,
    Validation,
    Signing,
    Verification,
    Ordering,
    Persistence,
    Publish,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Policy => "policy",
            Self::Validation => "validation",
            Self::Signing => "signing",
            Self::Verification => "verification",
            Self::Ordering => "ordering",
            Self::Persistence => "persistence",
            Self::Publish => "publish",
        }
    }

    /// Only a lost nonce race and a failed publish are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Ordering | Self::Publish)
    }

    pub const ALL: [ErrorKind; 8] = [
        Self::Auth,
        Self::Policy,
        Self::Validation,
        Self::Signing,
        Self::Verification,
        Self::Ordering,
        Self::Persistence,
        Self::Publish,
    ];
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a submission did not reach `Published`.
///
/// Messages never carry passwords or key bytes.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Recipient(#[from] ResolveError),

    #[error("invalid amount: {0}")]
    Amount(#[from] AmountError),

    #[error("invalid transaction: {0}")]
    Build(#[from] BuildError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// The chain kept moving for every attempt.
    #[error("could not order transaction for {address} after {attempts} attempts")]
    Ordering { address: Address, attempts: u32 },

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Pending(#[from] PendingError),

    /// The transaction is recorded and appended; only the hand-off to the
    /// ledger node failed.
    #[error("transaction {hash} recorded but not published: {source}")]
    Publish {
        hash: TransactionHash,
        #[source]
        source: PublishError,
    },
}

impl SubmitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Policy(_) => ErrorKind::Policy,
            Self::Auth(AuthError::InvalidCredentials) => ErrorKind::Auth,
            Self::Auth(AuthError::Directory(_)) => ErrorKind::Persistence,
            Self::Recipient(ResolveError::Directory(_)) => ErrorKind::Persistence,
            Self::Recipient(_) | Self::Amount(_) | Self::Build(_) => ErrorKind::Validation,
            Self::Signing(_) => ErrorKind::Signing,
            Self::Verification(e) if e.is_retryable() => ErrorKind::Ordering,
            Self::Verification(_) => ErrorKind::Verification,
            Self::Ordering { .. } => ErrorKind::Ordering,
            Self::Chain(e) if e.is_ordering() => ErrorKind::Ordering,
            Self::Chain(_) | Self::Pending(_) => ErrorKind::Persistence,
            Self::Publish { .. } => ErrorKind::Publish,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Hash of the transaction left in the pending store, if any.
    pub fn recorded_hash(&self) -> Option<TransactionHash> {
        match self {
            Self::Publish { hash, .. } => Some(*hash),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::DirectoryError;
    use crate::crypto::keys::KeyError;
    use crate::storage::DbError;
    use crate::transaction::{RejectReason, StaleReason};

    #[test]
    fn stage_errors_map_to_kinds() {
        let cases: Vec<(SubmitError, ErrorKind)> = vec![
            (
                PolicyError::ReservedAccount {
                    username: "faucet".into(),
                }
                .into(),
                ErrorKind::Policy,
            ),
            (AuthError::InvalidCredentials.into(), ErrorKind::Auth),
            (
                ResolveError::UnknownRecipient {
                    username: "carol".into(),
                }
                .into(),
                ErrorKind::Validation,
            ),
            (AmountError::Empty.into(), ErrorKind::Validation),
            (
                BuildError::PayloadTooLarge { size: 2, max: 1 }.into(),
                ErrorKind::Validation,
            ),
            (
                SigningError::Key(KeyError::InvalidSecretKey).into(),
                ErrorKind::Signing,
            ),
            (
                VerificationError::Rejected(RejectReason::MissingSignature).into(),
                ErrorKind::Verification,
            ),
            (
                VerificationError::StaleState(StaleReason::ParentMismatch { nonce: 1 }).into(),
                ErrorKind::Ordering,
            ),
            (
                SubmitError::Ordering {
                    address: Address::from_bytes([1; 32]),
                    attempts: 3,
                },
                ErrorKind::Ordering,
            ),
            (
                ChainError::Storage(DbError::MissingHash).into(),
                ErrorKind::Persistence,
            ),
            (PendingError::MissingHash.into(), ErrorKind::Persistence),
            (
                SubmitError::Publish {
                    hash: TransactionHash::from_bytes([2; 32]),
                    source: PublishError::Timeout { after_ms: 10 },
                },
                ErrorKind::Publish,
            ),
        ];

        for (err, kind) in cases {
            assert_eq!(err.kind(), kind, "{err}");
        }
    }

    #[test]
    fn directory_failures_are_persistence() {
        let failure = || DirectoryError::Storage(DbError::Serialization("bad".into()));
        assert_eq!(
            SubmitError::from(AuthError::from(failure())).kind(),
            ErrorKind::Persistence
        );
        assert_eq!(
            SubmitError::from(ResolveError::from(failure())).kind(),
            ErrorKind::Persistence
        );
    }

    #[test]
    fn only_ordering_and_publish_are_retryable() {
        let retryable: Vec<ErrorKind> = ErrorKind::ALL
            .into_iter()
            .filter(|k| k.is_retryable())
            .collect();
        assert_eq!(retryable, vec![ErrorKind::Ordering, ErrorKind::Publish]);
    }

    #[test]
    fn publish_error_exposes_recorded_hash() {
        let hash = TransactionHash::from_bytes([9; 32]);
        let err = SubmitError::Publish {
            hash,
            source: PublishError::Transport("connection refused".into()),
        };
        assert_eq!(err.recorded_hash(), Some(hash));
        assert!(err.is_retryable());
        assert!(err.to_string().contains(&hash.to_hex()));
    }

    #[test]
    fn kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::Persistence).unwrap(),
            "\"persistence\""
        );
        assert_eq!(ErrorKind::Auth.to_string(), "auth");
    }
}
