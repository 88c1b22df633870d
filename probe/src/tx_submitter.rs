//! substrate transaction submitter
use core::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use node_keyring::{KeyRecord, Keyring};
use snafu::ResultExt;
use subxt_signer::sr25519::Keypair;

use crate::call::CallRequest;
use crate::chain_client::{ChainClient, TxParams};
use crate::error::{BroadcastSnafu, EncodeSnafu, Result, SignSnafu, SignerLookupSnafu};
use crate::signer::{keypair_from_record, keypair_from_uri};
use crate::tx_progress::{ResolvePolicy, SubmissionHandle};

/// Default upper bound on the wait for a resolving status.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Who signs a transaction.
#[derive(Clone)]
pub enum SignerRef {
    /// A chain address looked up in the submitter's keyring.
    Address(String),
    /// A key record supplied directly.
    Record(KeyRecord),
    /// A secret URI such as `//Alice`.
    Uri(String),
    /// An externally derived keypair.
    Keypair(Keypair),
}

impl fmt::Debug for SignerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignerRef::Address(address) => f.debug_tuple("Address").field(address).finish(),
            SignerRef::Record(record) => f.debug_tuple("Record").field(record).finish(),
            SignerRef::Uri(_) => f.write_str("Uri(<redacted>)"),
            SignerRef::Keypair(keypair) => f
                .debug_tuple("Keypair")
                .field(&keypair.public_key().to_account_id())
                .finish(),
        }
    }
}

/// A call to submit together with its signer and signing parameters.
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    /// The call to dispatch.
    pub call: CallRequest,
    /// The signing account.
    pub signer: SignerRef,
    /// Nonce and mortality overrides.
    pub params: TxParams,
}

impl TransactionRequest {
    /// Creates a request with default signing parameters.
    pub fn new(call: CallRequest, signer: SignerRef) -> Self {
        Self {
            call,
            signer,
            params: TxParams::default(),
        }
    }

    /// Replaces the signing parameters.
    pub fn with_params(mut self, params: TxParams) -> Self {
        self.params = params;
        self
    }
}

/// How submitted transactions are tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitterConfig {
    /// When tracking reports success.
    pub policy: ResolvePolicy,
    /// How long tracking waits for a resolving status.
    pub timeout: Duration,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            policy: ResolvePolicy::Finalized,
            timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }
}

/// Signs and broadcasts transactions, handing back a tracked [`SubmissionHandle`] for each.
///
/// Submission never waits for inclusion and never retries: every failure is returned to the
/// caller, who decides whether to submit again.
#[derive(Clone)]
pub struct TransactionSubmitter {
    /// Connection shared with every tracker.
    client: Arc<dyn ChainClient>,
    /// Signers available by address.
    keyring: Arc<Keyring>,
    /// Tracking configuration applied to every submission.
    config: SubmitterConfig,
}

impl TransactionSubmitter {
    /// Creates a submitter.
    ///
    /// # Arguments
    /// * `client` - The connection shared by every submission and its tracker.
    /// * `keyring` - Signers available through [`SignerRef::Address`].
    /// * `config` - Resolution policy and confirmation timeout applied to every submission.
    pub fn new(client: Arc<dyn ChainClient>, keyring: Arc<Keyring>, config: SubmitterConfig) -> Self {
        Self {
            client,
            keyring,
            config,
        }
    }

    /// The tracking configuration.
    pub fn config(&self) -> SubmitterConfig {
        self.config
    }

    /// Turns a signer reference into a keypair.
    pub fn resolve_signer(&self, signer: SignerRef) -> Result<Keypair> {
        match signer {
            SignerRef::Address(address) => {
                let record = self.keyring.get(&address).context(SignerLookupSnafu)?;
                keypair_from_record(record)
            }
            SignerRef::Record(record) => keypair_from_record(&record),
            SignerRef::Uri(uri) => keypair_from_uri(&uri),
            SignerRef::Keypair(keypair) => Ok(keypair),
        }
    }

    /// Signs and broadcasts a transaction.
    ///
    /// Returns as soon as the node accepted the transaction for watching; the confirmation
    /// deadline starts at that point.
    ///
    /// # Arguments
    /// * `request` - The call, its signer and the nonce and mortality overrides.
    ///
    /// # Returns
    /// * `Ok(SubmissionHandle)` - A handle tracking the broadcast transaction.
    /// * `Err(SubmissionError)` - The signer could not be resolved, or encoding, signing or
    ///   broadcasting failed. Nothing is tracked in that case.
    pub async fn submit(&self, request: TransactionRequest) -> Result<SubmissionHandle> {
        let TransactionRequest {
            call,
            signer,
            params,
        } = request;

        let keypair = self.resolve_signer(signer)?;
        let signer_id = keypair.public_key().to_account_id();

        let call_data = self
            .client
            .encode_call(&call)
            .context(EncodeSnafu {
                call: call.to_string(),
            })?;
        debug!("Encoded {} into {} bytes", call, call_data.len());

        let signed = self
            .client
            .sign(&call, &keypair, params)
            .await
            .context(SignSnafu)?;
        let tx_hash = signed.hash;

        let subscription = match self.client.submit(signed).await {
            Ok(subscription) => subscription,
            Err(err) => {
                error!("❌ Failed to submit {} signed by {}: {}", call, signer_id, err);
                return Err(err).context(BroadcastSnafu { tx_hash });
            }
        };

        info!(
            "✅ Submitted {} signed by {} as {:?}, waiting for {:?}",
            call, signer_id, tx_hash, self.config.policy
        );

        Ok(SubmissionHandle::new(
            Arc::clone(&self.client),
            subscription,
            self.config.policy,
            self.config.timeout,
        ))
    }
}
