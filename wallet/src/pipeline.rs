//! # Submission Pipeline
//!
//! Turns an authenticated transfer request into a published transaction.
//!
//! ```text
//! policy → authenticate → resolve recipient → parse amount
//!        → lock sender chain ─┬─ build → sign → validate → record → append ─┐
//!                             └──────── reload + rebuild on ordering race ◄─┘
//!        → publish earlier unpublished nonces → publish (bounded by timeout)
//!        → unlock
//! ```
//!
//! The sender's chain lock is taken after every check that needs no chain
//! state, and held until publish returns. Recording in the pending store and
//! appending to the chain happen back to back with no await point between
//! them, so a cancelled request either did both or neither. Anything that
//! fails before the record leaves no trace; a publish failure leaves the
//! transaction recorded and appended, to be picked up by the next
//! submission from the same sender or by
//! [`SubmissionPipeline::republish_pending`].
//!
//! The ledger node only ever sees a sender's nonces in ascending order: a
//! transaction is published after every earlier nonce of its sender.
//!
//! A pending record whose chain slot holds a different transaction (or
//! nothing) is an orphan left by a failed undo. It is never published.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::account::{Account, AccountAuthenticator, Address};
use crate::config::WalletConfig;
use crate::error::{ErrorKind, SubmitError};
use crate::network::{Acknowledgment, PendingError, PendingStore, PublishClient, PublishError};
use crate::storage::{ChainStore, TransactionChain};
use crate::transaction::{
    parse_amount, Amount, BalanceSource, Ed25519Signer, LedgerState, LedgerValidator, Signer,
    StandardValidator, Transaction, TransactionBuilder, TransactionHash,
};

// ---------------------------------------------------------------------------
// Request & stages
// ---------------------------------------------------------------------------

/// An inbound transfer request, as received from the boundary layer.
#[derive(Clone)]
pub struct TransferRequest {
    pub username: String,
    pub password: String,
    /// A `0x` address or a username.
    pub recipient: String,
    /// Decimal string.
    pub amount: String,
    pub payload: Vec<u8>,
}

impl fmt::Debug for TransferRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferRequest")
            .field("username", &self.username)
            .field("recipient", &self.recipient)
            .field("amount", &self.amount)
            .field("payload_len", &self.payload.len())
            .finish_non_exhaustive()
    }
}

/// Progress of a submission. Each stage is reached only after the
/// previous one succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubmissionStage {
    Authenticated,
    ChainLoaded,
    Built,
    Signed,
    Validated,
    Persisted,
    Published,
}

impl fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Authenticated => "authenticated",
            Self::ChainLoaded => "chain_loaded",
            Self::Built => "built",
            Self::Signed => "signed",
            Self::Validated => "validated",
            Self::Persisted => "persisted",
            Self::Published => "published",
        };
        f.write_str(name)
    }
}

/// Tunables the pipeline reads from [`WalletConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub max_payload_bytes: usize,
    pub max_ordering_attempts: u32,
    pub publish_timeout: Duration,
}

impl From<&WalletConfig> for PipelineSettings {
    fn from(config: &WalletConfig) -> Self {
        Self {
            max_payload_bytes: config.max_payload_bytes,
            max_ordering_attempts: config.max_ordering_attempts,
            publish_timeout: config.publish_timeout(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&WalletConfig::default())
    }
}

/// Outcome of a [`SubmissionPipeline::republish_pending`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepublishReport {
    /// Acknowledged during this pass.
    pub published: Vec<TransactionHash>,
    /// Attempted and failed again.
    pub failed: Vec<TransactionHash>,
    /// Not attempted because an earlier nonce of the same sender failed.
    pub deferred: Vec<TransactionHash>,
    /// Recorded but not on the sender's chain; removed without publishing.
    pub orphaned: Vec<TransactionHash>,
}

impl RepublishReport {
    /// Hashes still waiting to be published.
    pub fn still_pending(&self) -> usize {
        self.failed.len() + self.deferred.len()
    }
}

// ---------------------------------------------------------------------------
// SubmissionPipeline
// ---------------------------------------------------------------------------

/// Orchestrates authentication, chain ordering, signing, validation,
/// persistence and publish for outbound transfers.
pub struct SubmissionPipeline {
    authenticator: AccountAuthenticator,
    chains: Arc<ChainStore>,
    signer: Arc<dyn Signer>,
    validator: Arc<dyn LedgerValidator>,
    pending: Arc<dyn PendingStore>,
    publisher: Arc<dyn PublishClient>,
    balances: Option<Arc<dyn BalanceSource>>,
    settings: PipelineSettings,
}

impl SubmissionPipeline {
    /// A pipeline with the Ed25519 signer, the standard validator and no
    /// balance source.
    pub fn new(
        authenticator: AccountAuthenticator,
        chains: Arc<ChainStore>,
        pending: Arc<dyn PendingStore>,
        publisher: Arc<dyn PublishClient>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            authenticator,
            chains,
            signer: Arc::new(Ed25519Signer),
            validator: Arc::new(StandardValidator::default()),
            pending,
            publisher,
            balances: None,
            settings,
        }
    }

    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = signer;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn LedgerValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_balance_source(mut self, balances: Arc<dyn BalanceSource>) -> Self {
        self.balances = Some(balances);
        self
    }

    pub fn chains(&self) -> &Arc<ChainStore> {
        &self.chains
    }

    pub fn pending(&self) -> &Arc<dyn PendingStore> {
        &self.pending
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Runs one transfer to completion or to its first failure.
    ///
    /// On success the returned transaction is signed, recorded, appended to
    /// the sender's chain and acknowledged by the ledger node.
    #[instrument(skip_all, fields(username = %request.username))]
    pub async fn submit(&self, request: TransferRequest) -> Result<Transaction, SubmitError> {
        self.authenticator.ensure_may_send(&request.username)?;
        let account = self
            .authenticator
            .authenticate(&request.username, &request.password)?;
        debug!(stage = %SubmissionStage::Authenticated, sender = %account.address);

        let recipient = self.authenticator.resolve_recipient(&request.recipient)?;
        let amount = parse_amount(&request.amount)?;

        let mut chain = self.chains.lock(&account.address).await?;
        debug!(
            stage = %SubmissionStage::ChainLoaded,
            next_nonce = chain.next_nonce()
        );

        let max_attempts = self.settings.max_ordering_attempts.max(1);
        let mut attempt = 1;
        let tx = loop {
            let outcome = self
                .prepare(&account, recipient, amount, &request.payload, &chain)
                .and_then(|tx| self.persist(&mut chain, tx));

            match outcome {
                Ok(tx) => break tx,
                Err(err) if err.kind() == ErrorKind::Ordering => {
                    if attempt >= max_attempts {
                        warn!(attempts = attempt, error = %err, "giving up on ordering");
                        return Err(SubmitError::Ordering {
                            address: account.address,
                            attempts: attempt,
                        });
                    }
                    warn!(attempt, error = %err, "sender chain moved, rebuilding");
                    self.chains.reload(&mut chain)?;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        };

        let hash = tx.hash.ok_or(PendingError::MissingHash)?;
        self.publish_backlog(&chain, &tx, hash).await?;

        match self.publish_recorded(&hash).await {
            Ok(ack) => {
                debug!(stage = %SubmissionStage::Published, detail = %ack.detail);
                info!(
                    hash = %hash,
                    nonce = tx.nonce,
                    sender = %tx.sender,
                    "transaction published"
                );
                Ok(tx)
            }
            Err(source) => {
                warn!(hash = %hash, nonce = tx.nonce, error = %source, "publish failed, transaction stays pending");
                Err(SubmitError::Publish { hash, source })
            }
        }
    }

    /// Build, sign and validate against the current chain state.
    fn prepare(
        &self,
        account: &Account,
        recipient: Address,
        amount: Amount,
        payload: &[u8],
        chain: &TransactionChain,
    ) -> Result<Transaction, SubmitError> {
        let unsigned = TransactionBuilder::new()
            .sender(account.address)
            .recipient(recipient)
            .amount(amount)
            .nonce(chain.next_nonce())
            .parent(chain.parent())
            .payload(payload.to_vec())
            .max_payload_bytes(self.settings.max_payload_bytes)
            .build()?;
        debug!(stage = %SubmissionStage::Built, nonce = unsigned.nonce);

        let signed = self.signer.sign(unsigned, &account.secret_key)?;
        debug!(stage = %SubmissionStage::Signed);

        let balance = self
            .balances
            .as_ref()
            .and_then(|source| source.available_balance(&account.address));
        let state = LedgerState::from_chain(chain).with_balance(balance);
        self.validator.validate(&signed, &state)?;
        debug!(stage = %SubmissionStage::Validated);

        Ok(signed)
    }

    /// Record, then append. The record is undone if the append fails.
    fn persist(
        &self,
        chain: &mut TransactionChain,
        tx: Transaction,
    ) -> Result<Transaction, SubmitError> {
        self.pending.record(&tx)?;

        if let Err(err) = self.chains.append(chain, tx.clone()) {
            if let Some(hash) = tx.hash {
                if let Err(undo) = self.pending.discard(&hash) {
                    warn!(hash = %hash, error = %undo, "could not discard pending record");
                }
            }
            return Err(err.into());
        }

        debug!(stage = %SubmissionStage::Persisted, nonce = tx.nonce);
        Ok(tx)
    }

    /// Publishes the sender's unpublished transactions below `tx`, in nonce
    /// order. A failure there fails the submission of `tx`, which stays
    /// recorded under `hash` and is not attempted.
    async fn publish_backlog(
        &self,
        chain: &TransactionChain,
        tx: &Transaction,
        hash: TransactionHash,
    ) -> Result<(), SubmitError> {
        for entry in self.pending.pending_for_sender(&tx.sender)? {
            let earlier = &entry.transaction;
            if earlier.nonce >= tx.nonce || !is_on_chain(chain, earlier) {
                continue;
            }
            let Some(earlier_hash) = entry.hash() else {
                continue;
            };
            if let Err(source) = self.publish_recorded(&earlier_hash).await {
                warn!(
                    hash = %hash,
                    blocked_by = %earlier_hash,
                    nonce = tx.nonce,
                    error = %source,
                    "earlier nonce still unpublished, transaction stays pending"
                );
                return Err(SubmitError::Publish { hash, source });
            }
            info!(hash = %earlier_hash, nonce = earlier.nonce, "published earlier nonce");
        }
        Ok(())
    }

    /// One bounded publish attempt for a recorded transaction.
    async fn publish_recorded(&self, hash: &TransactionHash) -> Result<Acknowledgment, PublishError> {
        if let Err(err) = self.pending.note_attempt(hash) {
            warn!(hash = %hash, error = %err, "could not count publish attempt");
        }

        let timeout = self.settings.publish_timeout;
        let ack = match tokio::time::timeout(timeout, self.publisher.publish(hash)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(PublishError::Timeout {
                    after_ms: timeout.as_millis() as u64,
                })
            }
        };

        if let Err(err) = self.pending.mark_published(hash, ack.clone()) {
            warn!(hash = %hash, error = %err, "published but could not mark pending entry");
        }
        Ok(ack)
    }

    /// Retries publish for every recorded, unpublished transaction.
    ///
    /// Entries are visited in nonce order per sender, under that sender's
    /// chain lock. After a failure, later nonces of the same sender are
    /// deferred to the next pass. Records that are not on their sender's
    /// chain are discarded instead of published. Nothing is re-signed.
    #[instrument(skip_all)]
    pub async fn republish_pending(&self) -> Result<RepublishReport, SubmitError> {
        let mut report = RepublishReport::default();
        let mut blocked: HashSet<Address> = HashSet::new();

        for entry in self.pending.unpublished()? {
            let Some(hash) = entry.hash() else {
                continue;
            };
            let sender = entry.transaction.sender;
            if blocked.contains(&sender) {
                report.deferred.push(hash);
                continue;
            }

            let chain = self.chains.lock(&sender).await?;

            // A concurrent submission may have published it meanwhile.
            match self.pending.get(&hash)? {
                Some(current) if !current.is_published() => {}
                _ => continue,
            }

            if !is_on_chain(&chain, &entry.transaction) {
                warn!(hash = %hash, nonce = entry.transaction.nonce, "pending record is not on its chain, discarding");
                if let Err(err) = self.pending.discard(&hash) {
                    warn!(hash = %hash, error = %err, "could not discard orphaned record");
                }
                report.orphaned.push(hash);
                continue;
            }

            match self.publish_recorded(&hash).await {
                Ok(_) => {
                    info!(hash = %hash, nonce = entry.transaction.nonce, "republished");
                    report.published.push(hash);
                }
                Err(err) => {
                    warn!(hash = %hash, error = %err, "republish failed");
                    report.failed.push(hash);
                    blocked.insert(sender);
                }
            }
        }

        Ok(report)
    }
}

/// Whether `tx` is the transaction stored at its nonce on `chain`.
fn is_on_chain(chain: &TransactionChain, tx: &Transaction) -> bool {
    tx.hash.is_some() && chain.get(tx.nonce).and_then(|stored| stored.hash) == tx.hash
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::MemoryDirectory;
    use crate::crypto::keys::SecretKey;
    use crate::network::{PendingEntry, SledPendingStore};
    use crate::storage::db::DbError;
    use crate::storage::WalletDB;
    use crate::transaction::{sign_transaction, SigningError, StaleReason, VerificationError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct AlwaysAck;

    #[async_trait]
    impl PublishClient for AlwaysAck {
        async fn publish(&self, hash: &TransactionHash) -> Result<Acknowledgment, PublishError> {
            Ok(Acknowledgment {
                hash: *hash,
                detail: "ok".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct Recording {
        published: parking_lot::Mutex<Vec<TransactionHash>>,
    }

    #[async_trait]
    impl PublishClient for Recording {
        async fn publish(&self, hash: &TransactionHash) -> Result<Acknowledgment, PublishError> {
            self.published.lock().push(*hash);
            Ok(Acknowledgment {
                hash: *hash,
                detail: "ok".to_string(),
            })
        }
    }

    struct Hangs;

    #[async_trait]
    impl PublishClient for Hangs {
        async fn publish(&self, _hash: &TransactionHash) -> Result<Acknowledgment, PublishError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(PublishError::Transport("unreachable".to_string()))
        }
    }

    /// Reports a stale chain for the first `stale_for` calls.
    struct StaleThenOk {
        calls: AtomicU32,
        stale_for: u32,
    }

    impl LedgerValidator for StaleThenOk {
        fn validate(&self, tx: &Transaction, state: &LedgerState) -> Result<(), VerificationError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.stale_for {
                return Err(StaleReason::NonceMismatch {
                    expected: state.expected_nonce + 1,
                    got: tx.nonce,
                }
                .into());
            }
            Ok(())
        }
    }

    struct AcceptAll;

    impl LedgerValidator for AcceptAll {
        fn validate(&self, _: &Transaction, _: &LedgerState) -> Result<(), VerificationError> {
            Ok(())
        }
    }

    /// Signs a transaction whose nonce is one ahead of the chain.
    struct SkipsANonce;

    impl Signer for SkipsANonce {
        fn sign(&self, mut tx: Transaction, key: &SecretKey) -> Result<Transaction, SigningError> {
            tx.nonce += 1;
            let keypair = key.keypair()?;
            sign_transaction(&mut tx, &keypair);
            Ok(tx)
        }
    }

    /// A sled store whose first `failures` discards report a storage error.
    struct FailingDiscard {
        inner: SledPendingStore,
        failures: AtomicU32,
    }

    impl PendingStore for FailingDiscard {
        fn record(&self, tx: &Transaction) -> Result<(), PendingError> {
            self.inner.record(tx)
        }

        fn discard(&self, hash: &TransactionHash) -> Result<bool, PendingError> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(PendingError::Storage(DbError::Serialization(
                    "disk unplugged".to_string(),
                )));
            }
            self.inner.discard(hash)
        }

        fn note_attempt(&self, hash: &TransactionHash) -> Result<u32, PendingError> {
            self.inner.note_attempt(hash)
        }

        fn mark_published(
            &self,
            hash: &TransactionHash,
            ack: Acknowledgment,
        ) -> Result<(), PendingError> {
            self.inner.mark_published(hash, ack)
        }

        fn get(&self, hash: &TransactionHash) -> Result<Option<PendingEntry>, PendingError> {
            self.inner.get(hash)
        }

        fn unpublished(&self) -> Result<Vec<PendingEntry>, PendingError> {
            self.inner.unpublished()
        }

        fn pending_for_sender(&self, sender: &Address) -> Result<Vec<PendingEntry>, PendingError> {
            self.inner.pending_for_sender(sender)
        }

        fn len(&self) -> usize {
            self.inner.len()
        }
    }

    fn request(amount: &str) -> TransferRequest {
        TransferRequest {
            username: "alice".to_string(),
            password: "alice-pw".to_string(),
            recipient: "bob".to_string(),
            amount: amount.to_string(),
            payload: Vec::new(),
        }
    }

    fn pipeline(publisher: Arc<dyn PublishClient>, settings: PipelineSettings) -> SubmissionPipeline {
        let db = WalletDB::open_temporary().unwrap();
        let pending = Arc::new(SledPendingStore::open(db.clone()).unwrap());
        pipeline_with(db, pending, publisher, settings)
    }

    fn pipeline_with(
        db: WalletDB,
        pending: Arc<dyn PendingStore>,
        publisher: Arc<dyn PublishClient>,
        settings: PipelineSettings,
    ) -> SubmissionPipeline {
        let directory = Arc::new(MemoryDirectory::new());
        directory.insert(Account::generate("alice", "alice-pw"));
        directory.insert(Account::generate("bob", "bob-pw"));
        let authenticator = AccountAuthenticator::new(directory, vec!["faucet".to_string()]);
        SubmissionPipeline::new(
            authenticator,
            Arc::new(ChainStore::new(db)),
            pending,
            publisher,
            settings,
        )
    }

    #[tokio::test]
    async fn stale_state_is_retried_with_reload() {
        let pipeline = pipeline(Arc::new(AlwaysAck), PipelineSettings::default()).with_validator(
            Arc::new(StaleThenOk {
                calls: AtomicU32::new(0),
                stale_for: 2,
            }),
        );

        let tx = pipeline.submit(request("1")).await.unwrap();
        assert_eq!(tx.nonce, 0);
        assert_eq!(pipeline.chains().chain_len(&tx.sender).unwrap(), 1);
    }

    #[tokio::test]
    async fn persistent_staleness_surfaces_ordering_error() {
        let settings = PipelineSettings {
            max_ordering_attempts: 2,
            ..Default::default()
        };
        let pipeline = pipeline(Arc::new(AlwaysAck), settings).with_validator(Arc::new(
            StaleThenOk {
                calls: AtomicU32::new(0),
                stale_for: u32::MAX,
            },
        ));

        let err = pipeline.submit(request("1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Ordering);
        assert!(err.is_retryable());
        assert!(matches!(err, SubmitError::Ordering { attempts: 2, .. }));
        assert!(pipeline.pending().is_empty());
    }

    #[tokio::test]
    async fn failed_append_discards_pending_record() {
        let pipeline = pipeline(Arc::new(AlwaysAck), PipelineSettings::default())
            .with_signer(Arc::new(SkipsANonce))
            .with_validator(Arc::new(AcceptAll));

        let err = pipeline.submit(request("1")).await.unwrap_err();
        assert!(matches!(err, SubmitError::Ordering { attempts: 3, .. }));
        assert!(pipeline.pending().is_empty());
        assert_eq!(pipeline.chains().loaded_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn publish_timeout_keeps_transaction_pending() {
        let settings = PipelineSettings {
            publish_timeout: Duration::from_millis(250),
            ..Default::default()
        };
        let pipeline = pipeline(Arc::new(Hangs), settings);

        let err = pipeline.submit(request("3")).await.unwrap_err();
        match &err {
            SubmitError::Publish {
                source: PublishError::Timeout { after_ms },
                ..
            } => assert_eq!(*after_ms, 250),
            other => panic!("expected publish timeout, got {:?}", other),
        }

        let hash = err.recorded_hash().unwrap();
        let entry = pipeline.pending().get(&hash).unwrap().unwrap();
        assert!(!entry.is_published());
        assert_eq!(entry.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_submit_keeps_recorded_transaction() {
        let settings = PipelineSettings {
            publish_timeout: Duration::from_secs(600),
            ..Default::default()
        };
        let pipeline = Arc::new(pipeline(Arc::new(Hangs), settings));

        let submitting = {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.submit(request("2")).await })
        };
        // Lets the task run until it parks inside publish.
        tokio::time::sleep(Duration::from_millis(10)).await;
        submitting.abort();
        assert!(submitting.await.unwrap_err().is_cancelled());

        let unpublished = pipeline.pending().unpublished().unwrap();
        assert_eq!(unpublished.len(), 1);
        assert_eq!(unpublished[0].attempts, 1);
        let sender = unpublished[0].transaction.sender;
        assert_eq!(pipeline.chains().chain_len(&sender).unwrap(), 1);

        // The lock went with the cancelled task.
        let chain = pipeline.chains().lock(&sender).await.unwrap();
        assert_eq!(chain.next_nonce(), 1);
        assert_eq!(chain.tip_hash(), unpublished[0].hash());
    }

    #[tokio::test]
    async fn orphaned_record_is_discarded_not_published() {
        let db = WalletDB::open_temporary().unwrap();
        let pending = Arc::new(FailingDiscard {
            inner: SledPendingStore::open(db.clone()).unwrap(),
            failures: AtomicU32::new(1),
        });
        let publisher = Arc::new(Recording::default());
        let settings = PipelineSettings {
            max_ordering_attempts: 1,
            ..Default::default()
        };
        let pipeline = pipeline_with(db, pending.clone(), publisher.clone(), settings)
            .with_signer(Arc::new(SkipsANonce))
            .with_validator(Arc::new(AcceptAll));

        let err = pipeline.submit(request("1")).await.unwrap_err();
        assert!(matches!(err, SubmitError::Ordering { attempts: 1, .. }));

        // The undo failed, so the record outlived its append.
        let orphan = pending.unpublished().unwrap();
        assert_eq!(orphan.len(), 1);
        let sender = orphan[0].transaction.sender;
        let orphan = orphan[0].hash().unwrap();
        assert_eq!(pipeline.chains().chain_len(&sender).unwrap(), 0);

        let report = pipeline.republish_pending().await.unwrap();
        assert_eq!(report.orphaned, vec![orphan]);
        assert!(report.published.is_empty());
        assert!(publisher.published.lock().is_empty());
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn earlier_unpublished_nonce_is_published_first() {
        let db = WalletDB::open_temporary().unwrap();
        let pending = Arc::new(SledPendingStore::open(db.clone()).unwrap());
        let publisher = Arc::new(Recording::default());
        let pipeline = pipeline_with(db, pending, publisher.clone(), PipelineSettings::default());

        let first = pipeline.submit(request("1")).await.unwrap();
        let sender = first.sender;
        publisher.published.lock().clear();

        // Nonce 1 is recorded and appended, never published.
        let second = {
            let mut chain = pipeline.chains().lock(&sender).await.unwrap();
            let account = pipeline.authenticator.authenticate("alice", "alice-pw").unwrap();
            let recipient = pipeline.authenticator.resolve_recipient("bob").unwrap();
            let tx = pipeline
                .prepare(&account, recipient, parse_amount("2").unwrap(), &[], &chain)
                .unwrap();
            pipeline.persist(&mut chain, tx).unwrap()
        };

        let third = pipeline.submit(request("3")).await.unwrap();
        assert_eq!(third.nonce, 2);
        assert_eq!(
            *publisher.published.lock(),
            vec![second.hash.unwrap(), third.hash.unwrap()]
        );
        assert!(pipeline.pending().is_empty());
    }

    #[test]
    fn request_debug_hides_password() {
        let debug = format!("{:?}", request("1"));
        assert!(debug.contains("alice"));
        assert!(!debug.contains("alice-pw"));
    }

    #[test]
    fn stages_are_ordered() {
        assert!(SubmissionStage::Authenticated < SubmissionStage::ChainLoaded);
        assert!(SubmissionStage::Persisted < SubmissionStage::Published);
        assert_eq!(SubmissionStage::ChainLoaded.to_string(), "chain_loaded");
    }

    #[test]
    fn settings_follow_config() {
        let config = WalletConfig {
            max_ordering_attempts: 7,
            publish_timeout_ms: 1_500,
            ..Default::default()
        };
        let settings = PipelineSettings::from(&config);
        assert_eq!(settings.max_ordering_attempts, 7);
        assert_eq!(settings.publish_timeout, Duration::from_millis(1_500));
        assert_eq!(settings.max_payload_bytes, 16 * 1024);
    }
}
