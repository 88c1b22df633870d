//! # Chain Client
//!
//! The narrow surface the submitter and trackers need from a node: encode a call, sign it,
//! broadcast it with a status subscription, and release that subscription.
//!
//! - [`ChainClient`]: the capability trait, shared as `Arc<dyn ChainClient>` by every tracker.
//! - [`SubxtChainClient`]: the implementation backed by a `subxt` [`OnlineClient`].
//! - [`Subscription`]: a live, cancellable stream of [`StatusEvent`]s for one transaction.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use log::{debug, info};
use snafu::ResultExt;
use subxt::backend::rpc::reconnecting_rpc_client::{PingConfig, RpcClient};
use subxt::config::polkadot::PolkadotExtrinsicParamsBuilder as Params;
use subxt::tx::{SubmittableExtrinsic, TxStatus};
use subxt::utils::H256;
use subxt::{OnlineClient, PolkadotConfig};
use subxt_signer::sr25519::Keypair;
use url::Url;

use crate::call::CallRequest;
use crate::error::{ChainConnectionSnafu, ConnectError};
use crate::tx_progress::StatusEvent;

/// Transaction metadata the signer needs beyond the call itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxParams {
    /// Explicit nonce; the node's next account index is used when `None`.
    pub nonce: Option<u64>,
    /// Mortality in blocks counted from the latest block; immortal when `None`.
    pub mortality: Option<u64>,
}

/// A signed, encoded transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Hash of the encoded transaction.
    pub hash: H256,
    /// SCALE encoded extrinsic bytes.
    pub encoded: Vec<u8>,
}

/// Identifier of a status subscription, unique per client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A live stream of status events for one broadcast transaction.
///
/// Dropping the subscription stops the underlying watch; trackers hand it back through
/// [`ChainClient::cancel`] so the client can account for it.
pub struct Subscription {
    /// Client-assigned identifier.
    id: SubscriptionId,
    /// Hash of the watched transaction.
    tx_hash: H256,
    /// Pending status events.
    events: BoxStream<'static, StatusEvent>,
}

impl Subscription {
    /// Wraps a status event stream.
    pub fn new(id: SubscriptionId, tx_hash: H256, events: BoxStream<'static, StatusEvent>) -> Self {
        Self {
            id,
            tx_hash,
            events,
        }
    }

    /// The subscription identifier.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Hash of the watched transaction.
    pub fn tx_hash(&self) -> H256 {
        self.tx_hash
    }

    /// Waits for the next status event; `None` once the node closed the stream.
    pub async fn next(&mut self) -> Option<StatusEvent> {
        self.events.next().await
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("tx_hash", &self.tx_hash)
            .finish_non_exhaustive()
    }
}

/// Capabilities consumed from a connected node.
///
/// Implementations must be safe to share between any number of concurrent trackers.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Encodes the call data, validating the call against the node's metadata.
    fn encode_call(&self, call: &CallRequest) -> Result<Vec<u8>, subxt::Error>;

    /// Signs the call with `signer`, filling in nonce, era and genesis information.
    async fn sign(
        &self,
        call: &CallRequest,
        signer: &Keypair,
        params: TxParams,
    ) -> Result<SignedTransaction, subxt::Error>;

    /// Broadcasts a signed transaction and subscribes to its status.
    async fn submit(&self, transaction: SignedTransaction) -> Result<Subscription, subxt::Error>;

    /// Releases a subscription. Events still in flight are discarded.
    fn cancel(&self, subscription: Subscription);
}

/// Builds the dynamic payload for a call.
fn payload(call: &CallRequest) -> subxt::tx::DynamicPayload {
    subxt::dynamic::tx(call.pallet.as_str(), call.call.as_str(), call.values())
}

/// [`ChainClient`] over a `subxt` connection to a Substrate node.
pub struct SubxtChainClient {
    /// The connected client.
    api: OnlineClient<PolkadotConfig>,
    /// Source of subscription identifiers.
    next_subscription: AtomicU64,
}

impl SubxtChainClient {
    /// Wraps an existing client.
    pub fn new(api: OnlineClient<PolkadotConfig>) -> Self {
        Self {
            api,
            next_subscription: AtomicU64::new(0),
        }
    }

    /// Connects to a node over a reconnecting websocket RPC client.
    pub async fn connect(rpc_url: &Url) -> Result<Self, ConnectError> {
        info!("🔵 Connecting to Substrate node at: {}", rpc_url);

        let rpc_client = RpcClient::builder()
            .request_timeout(Duration::from_secs(60))
            .connection_timeout(Duration::from_secs(10))
            .enable_ws_ping(PingConfig::new())
            .build(rpc_url.to_string())
            .await
            .map_err(|err| ConnectError::RpcClient {
                url: rpc_url.to_string(),
                message: err.to_string(),
            })?;

        let api = OnlineClient::<PolkadotConfig>::from_rpc_client(rpc_client)
            .await
            .context(ChainConnectionSnafu)?;

        info!("🟢 Substrate client connected");
        Ok(Self::new(api))
    }

    /// The underlying `subxt` client.
    pub fn api(&self) -> &OnlineClient<PolkadotConfig> {
        &self.api
    }
}

#[async_trait]
impl ChainClient for SubxtChainClient {
    fn encode_call(&self, call: &CallRequest) -> Result<Vec<u8>, subxt::Error> {
        self.api.tx().call_data(&payload(call))
    }

    async fn sign(
        &self,
        call: &CallRequest,
        signer: &Keypair,
        params: TxParams,
    ) -> Result<SignedTransaction, subxt::Error> {
        let mut builder = Params::<PolkadotConfig>::new();

        if let Some(nonce) = params.nonce {
            builder = builder.nonce(nonce);
        }

        if let Some(lifespan) = params.mortality {
            let latest = self.api.blocks().at_latest().await?;
            builder = builder.mortal(latest.header(), lifespan);
        }

        let extrinsic = self
            .api
            .tx()
            .create_signed(&payload(call), signer, builder.build())
            .await?;

        Ok(SignedTransaction {
            hash: extrinsic.hash(),
            encoded: extrinsic.encoded().to_vec(),
        })
    }

    async fn submit(&self, transaction: SignedTransaction) -> Result<Subscription, subxt::Error> {
        let extrinsic = SubmittableExtrinsic::from_bytes(self.api.clone(), transaction.encoded);
        let progress = extrinsic.submit_and_watch().await?;

        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        debug!("Watching transaction {:?} as {}", transaction.hash, id);

        let events = progress
            .map(|status| match status {
                Ok(status) => StatusEvent::from_tx_status(status),
                Err(err) => StatusEvent::Error(err.to_string()),
            })
            .boxed();

        Ok(Subscription::new(id, transaction.hash, events))
    }

    fn cancel(&self, subscription: Subscription) {
        debug!(
            "Unsubscribing {} for transaction {:?}",
            subscription.id(),
            subscription.tx_hash()
        );
        drop(subscription);
    }
}

impl StatusEvent {
    /// Maps a node status onto the tracker's event set.
    fn from_tx_status(status: TxStatus<PolkadotConfig, OnlineClient<PolkadotConfig>>) -> Self {
        match status {
            TxStatus::Validated => StatusEvent::Ready,
            TxStatus::Broadcasted { num_peers } => StatusEvent::Broadcast(num_peers),
            TxStatus::NoLongerInBestBlock => StatusEvent::Retracted,
            TxStatus::InBestBlock(details) => StatusEvent::InBlock(details.block_hash()),
            TxStatus::InFinalizedBlock(details) => StatusEvent::Finalized(details.block_hash()),
            TxStatus::Error { message } => StatusEvent::Error(message),
            TxStatus::Dropped { message } => StatusEvent::Dropped(message),
            // The node reports replacement by a same-nonce transaction as invalidity.
            TxStatus::Invalid { message } if message.to_ascii_lowercase().contains("usurped") => {
                StatusEvent::Usurped(message)
            }
            TxStatus::Invalid { message } => StatusEvent::Invalid(message),
        }
    }
}
