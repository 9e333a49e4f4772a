//! Authentication and recipient resolution for outbound transfers.
//!
//! Three questions, asked in this order by the pipeline:
//!
//! 1. **May this username send at all?** Reserved accounts (the faucet) are
//!    refused here, before any directory, chain, or lock access. Credential
//!    validity is irrelevant to this answer.
//! 2. **Are the credentials right?** Unknown user and wrong password produce
//!    the same error so callers cannot tell which usernames exist.
//! 3. **Who is the recipient?** A `0x` value is parsed as a literal address,
//!    anything else is looked up as a username.

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::address::{Address, AddressError};
use super::directory::{AccountDirectory, DirectoryError};
use super::Account;

/// Credential failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Sender policy failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("account '{username}' is not permitted to send transfers")]
    ReservedAccount { username: String },
}

/// Recipient resolution failures.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("malformed recipient address: {0}")]
    MalformedAddress(#[from] AddressError),

    #[error("recipient '{username}' does not exist")]
    UnknownRecipient { username: String },

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Gatekeeper for the sending side of a transfer.
#[derive(Clone)]
pub struct AccountAuthenticator {
    directory: Arc<dyn AccountDirectory>,
    reserved_usernames: Vec<String>,
}

impl AccountAuthenticator {
    pub fn new(directory: Arc<dyn AccountDirectory>, reserved_usernames: Vec<String>) -> Self {
        Self {
            directory,
            reserved_usernames,
        }
    }

    /// Refuses reserved usernames. Touches no storage.
    pub fn ensure_may_send(&self, username: &str) -> Result<(), PolicyError> {
        if self.reserved_usernames.iter().any(|r| r == username) {
            return Err(PolicyError::ReservedAccount {
                username: username.to_string(),
            });
        }
        Ok(())
    }

    /// Verifies `password` for `username` and returns the account.
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Account, AuthError> {
        let account = self
            .directory
            .query_by_username(username)?
            .ok_or(AuthError::InvalidCredentials)?;

        if !account.password_hash.verify(password) {
            debug!(username, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(account)
    }

    /// Resolves the `recipient` field of a transfer request to an address.
    pub fn resolve_recipient(&self, recipient: &str) -> Result<Address, ResolveError> {
        if Address::looks_like_address(recipient) {
            return Ok(recipient.parse::<Address>()?);
        }

        match self.directory.query_by_username(recipient)? {
            Some(account) => Ok(account.address),
            None => Err(ResolveError::UnknownRecipient {
                username: recipient.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::directory::MemoryDirectory;

    fn authenticator() -> (AccountAuthenticator, Account, Account) {
        let dir = Arc::new(MemoryDirectory::new());
        let alice = Account::generate("alice", "alice-pw");
        let faucet = Account::generate("faucet", "faucet-pw");
        dir.insert(alice.clone());
        dir.insert(faucet.clone());
        (
            AccountAuthenticator::new(dir, vec!["faucet".to_string()]),
            alice,
            faucet,
        )
    }

    #[test]
    fn valid_credentials_return_account() {
        let (auth, alice, _) = authenticator();
        let account = auth.authenticate("alice", "alice-pw").unwrap();
        assert_eq!(account.address, alice.address);
    }

    #[test]
    fn wrong_password_and_unknown_user_look_identical() {
        let (auth, _, _) = authenticator();
        let wrong = auth.authenticate("alice", "nope").unwrap_err().to_string();
        let unknown = auth.authenticate("mallory", "nope").unwrap_err().to_string();
        assert_eq!(wrong, unknown);
        assert_eq!(wrong, "invalid username or password");
    }

    #[test]
    fn reserved_account_refused_even_with_valid_credentials() {
        let (auth, _, _) = authenticator();
        assert!(auth.authenticate("faucet", "faucet-pw").is_ok());
        assert_eq!(
            auth.ensure_may_send("faucet"),
            Err(PolicyError::ReservedAccount {
                username: "faucet".to_string()
            })
        );
        assert!(auth.ensure_may_send("alice").is_ok());
    }

    #[test]
    fn recipient_username_resolves_to_address() {
        let (auth, alice, _) = authenticator();
        assert_eq!(auth.resolve_recipient("alice").unwrap(), alice.address);
    }

    #[test]
    fn recipient_literal_address_is_parsed() {
        let (auth, _, _) = authenticator();
        let addr = Address::from_bytes([9u8; 32]);
        assert_eq!(auth.resolve_recipient(&addr.to_string()).unwrap(), addr);
    }

    #[test]
    fn unknown_recipient_username_fails() {
        let (auth, _, _) = authenticator();
        match auth.resolve_recipient("carol") {
            Err(ResolveError::UnknownRecipient { username }) => {
                assert_eq!(username, "carol")
            }
            other => panic!("expected UnknownRecipient, got {:?}", other),
        }
    }

    #[test]
    fn malformed_literal_address_fails() {
        let (auth, _, _) = authenticator();
        assert!(matches!(
            auth.resolve_recipient("0x1234"),
            Err(ResolveError::MalformedAddress(_))
        ));
    }
}
