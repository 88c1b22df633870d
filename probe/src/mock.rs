use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedSender};
use futures::StreamExt;
use node_keyring::Keyring;
use subxt::utils::H256;
use subxt_signer::sr25519::Keypair;

use crate::call::CallRequest;
use crate::chain_client::{ChainClient, SignedTransaction, Subscription, SubscriptionId, TxParams};
use crate::signer::tests::alice_record;
use crate::tx_progress::StatusEvent;
use crate::tx_submitter::{SubmitterConfig, TransactionSubmitter};

/// Pallet name the mock refuses to encode.
pub const UNKNOWN_PALLET: &str = "Unknown";

/// In-memory chain: every broadcast gets a status feed the test pushes events into.
#[derive(Default)]
pub struct MockChain {
    /// Refuse to sign.
    fail_sign: bool,
    /// Refuse to broadcast.
    fail_submit: bool,
    /// Senders for each subscription, by subscription id.
    feeds: Mutex<Vec<UnboundedSender<StatusEvent>>>,
    /// Subscriptions handed back through `cancel`, in order.
    canceled: Mutex<Vec<SubscriptionId>>,
    /// Nonces used by signed transactions.
    nonces: Mutex<Vec<Option<u64>>>,
    /// Source of transaction hashes.
    signed: AtomicU64,
}

impl MockChain {
    /// A chain that refuses to sign.
    pub fn failing_sign() -> Self {
        Self {
            fail_sign: true,
            ..Self::default()
        }
    }

    /// A chain that refuses to broadcast.
    pub fn failing_submit() -> Self {
        Self {
            fail_submit: true,
            ..Self::default()
        }
    }

    /// Pushes a status event to a subscription's feed.
    pub fn push(&self, subscription: SubscriptionId, event: StatusEvent) {
        let feeds = self.feeds.lock().unwrap();
        let _ = feeds[subscription.0 as usize].unbounded_send(event);
    }

    /// Ends a subscription's feed, as a node closing the watch would.
    pub fn close(&self, subscription: SubscriptionId) {
        self.feeds.lock().unwrap()[subscription.0 as usize].close_channel();
    }

    /// Subscriptions canceled so far.
    pub fn canceled(&self) -> Vec<SubscriptionId> {
        self.canceled.lock().unwrap().clone()
    }

    /// Number of subscriptions opened so far.
    pub fn subscriptions(&self) -> usize {
        self.feeds.lock().unwrap().len()
    }

    /// Nonce overrides seen by `sign`.
    pub fn nonces(&self) -> Vec<Option<u64>> {
        self.nonces.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn encode_call(&self, call: &CallRequest) -> Result<Vec<u8>, subxt::Error> {
        if call.pallet == UNKNOWN_PALLET {
            return Err(subxt::Error::Other(format!("pallet {} not found", call.pallet)));
        }
        Ok(call.to_string().into_bytes())
    }

    async fn sign(
        &self,
        call: &CallRequest,
        _signer: &Keypair,
        params: TxParams,
    ) -> Result<SignedTransaction, subxt::Error> {
        if self.fail_sign {
            return Err(subxt::Error::Other("nonce unavailable".to_string()));
        }
        self.nonces.lock().unwrap().push(params.nonce);

        let count = self.signed.fetch_add(1, Ordering::SeqCst);
        Ok(SignedTransaction {
            hash: H256::from_low_u64_be(count + 1),
            encoded: call.to_string().into_bytes(),
        })
    }

    async fn submit(&self, transaction: SignedTransaction) -> Result<Subscription, subxt::Error> {
        if self.fail_submit {
            return Err(subxt::Error::Other("connection closed".to_string()));
        }

        let (sender, receiver) = unbounded();
        let mut feeds = self.feeds.lock().unwrap();
        let id = SubscriptionId(feeds.len() as u64);
        feeds.push(sender);

        Ok(Subscription::new(id, transaction.hash, receiver.boxed()))
    }

    fn cancel(&self, subscription: Subscription) {
        self.canceled.lock().unwrap().push(subscription.id());
    }
}

/// A keyring holding the `//Alice` record.
pub fn alice_keyring() -> Keyring {
    let mut keyring = Keyring::new();
    keyring.import([alice_record()]);
    keyring
}

/// A submitter over `chain` with the `//Alice` keyring.
pub fn new_submitter(chain: &Arc<MockChain>, config: SubmitterConfig) -> TransactionSubmitter {
    TransactionSubmitter::new(chain.clone(), Arc::new(alice_keyring()), config)
}
