//! Tracking of submitted transactions until they reach a terminal outcome.
//!
//! [`StatusTracker`] is a pure state machine fed with [`StatusEvent`]s. It resolves at most once,
//! at the first event that satisfies its [`ResolvePolicy`] or at the first failure.
//! [`SubmissionHandle`] drives a tracker from a live [`Subscription`] under a deadline and
//! releases the subscription exactly once.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use subxt::utils::H256;
use tokio::time::{timeout_at, Instant};

use crate::chain_client::{ChainClient, Subscription, SubscriptionId};
use crate::error::ConfirmationError;

/// A status notification for one submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// The transaction was validated and sits in the pool.
    Ready,
    /// The transaction was gossiped to this many peers.
    Broadcast(u32),
    /// The transaction was included in this (best) block.
    InBlock(H256),
    /// The block that included the transaction is no longer the best block.
    Retracted,
    /// The block that included the transaction was finalized.
    Finalized(H256),
    /// The pool dropped the transaction.
    Dropped(String),
    /// The transaction is invalid.
    Invalid(String),
    /// Another transaction with the same nonce took its place.
    Usurped(String),
    /// The node or the transport reported an error.
    Error(String),
}

/// When a tracker reports success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolvePolicy {
    /// As soon as the transaction is in a block.
    InBlock,
    /// Only once the including block is finalized.
    #[default]
    Finalized,
}

/// Where a tracked transaction currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TxState {
    /// Broadcast, nothing heard yet.
    Submitted,
    /// Accepted into the pool.
    Ready,
    /// Included in a block.
    InBlock,
    /// Included in a finalized block.
    Finalized,
    /// Dropped by the pool.
    Dropped,
    /// Rejected as invalid.
    Invalid,
    /// Replaced by a same-nonce transaction.
    Usurped,
    /// Watching failed.
    Error,
    /// No resolving status before the deadline.
    TimedOut,
    /// Tracking stopped by the caller.
    Canceled,
}

impl TxState {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TxState::Submitted | TxState::Ready | TxState::InBlock)
    }
}

/// A successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// Hash of the transaction.
    pub tx_hash: H256,
    /// Block the transaction was included in.
    pub block_hash: H256,
    /// State at resolution, `InBlock` or `Finalized`.
    pub state: TxState,
    /// Every event observed up to and including the resolving one.
    pub history: Vec<StatusEvent>,
}

/// The outcome of a tracked submission.
pub type Resolution = Result<Confirmation, ConfirmationError>;

/// Per-submission state machine.
#[derive(Debug, Clone)]
pub struct StatusTracker {
    /// Hash of the tracked transaction.
    tx_hash: H256,
    /// When success is reported.
    policy: ResolvePolicy,
    /// Current state; only ever moves forward.
    state: TxState,
    /// Events observed before resolution.
    history: Vec<StatusEvent>,
    /// Set by the step that produces the resolution.
    resolved: bool,
}

impl StatusTracker {
    /// Creates a tracker for a freshly broadcast transaction.
    pub fn new(tx_hash: H256, policy: ResolvePolicy) -> Self {
        Self {
            tx_hash,
            policy,
            state: TxState::Submitted,
            history: Vec::new(),
            resolved: false,
        }
    }

    /// Hash of the tracked transaction.
    pub fn tx_hash(&self) -> H256 {
        self.tx_hash
    }

    /// The configured policy.
    pub fn policy(&self) -> ResolvePolicy {
        self.policy
    }

    /// Current state.
    pub fn state(&self) -> TxState {
        self.state
    }

    /// Whether a resolution has already been produced.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Events observed so far.
    pub fn history(&self) -> &[StatusEvent] {
        &self.history
    }

    /// Moves forward to `state`; never backwards.
    fn advance(&mut self, state: TxState) {
        if state > self.state {
            self.state = state;
        }
    }

    /// Produces the resolution unless one was produced already.
    fn resolve(&mut self, state: TxState, outcome: Result<H256, ConfirmationError>) -> Option<Resolution> {
        if self.resolved {
            return None;
        }
        self.resolved = true;
        self.state = state;

        Some(outcome.map(|block_hash| Confirmation {
            tx_hash: self.tx_hash,
            block_hash,
            state,
            history: self.history.clone(),
        }))
    }

    /// Feeds one status event.
    ///
    /// Events after resolution are ignored.
    ///
    /// # Arguments
    /// * `event` - The next status reported for the tracked transaction.
    ///
    /// # Returns
    /// * `Some(Resolution)` - The first time an event satisfies the policy or reports a failure.
    /// * `None` - If the transaction is still pending or was already resolved.
    pub fn observe(&mut self, event: StatusEvent) -> Option<Resolution> {
        if self.resolved {
            debug!(
                "Ignoring {:?} for already resolved transaction {:?}",
                event, self.tx_hash
            );
            return None;
        }

        self.history.push(event.clone());
        let tx_hash = self.tx_hash;

        match event {
            StatusEvent::Ready => {
                info!("📄 Transaction {:?} has been validated.", tx_hash);
                self.advance(TxState::Ready);
                None
            }
            StatusEvent::Broadcast(num_peers) => {
                info!("📡 Transaction {:?} broadcasted to {} peers.", tx_hash, num_peers);
                self.advance(TxState::Ready);
                None
            }
            StatusEvent::InBlock(block_hash) => {
                info!("📦 Transaction {:?} is in the best block {:?}", tx_hash, block_hash);
                self.advance(TxState::InBlock);
                match self.policy {
                    ResolvePolicy::InBlock => self.resolve(TxState::InBlock, Ok(block_hash)),
                    ResolvePolicy::Finalized => None,
                }
            }
            StatusEvent::Retracted => {
                warn!("⚠️ Transaction {:?} is no longer in the best block. It might have been replaced or forked.", tx_hash);
                None
            }
            StatusEvent::Finalized(block_hash) => {
                info!("✅ Transaction {:?} finalized in block {:?}", tx_hash, block_hash);
                self.resolve(TxState::Finalized, Ok(block_hash))
            }
            StatusEvent::Dropped(message) => {
                error!("❌ Error transaction {:?} dropped: {}", tx_hash, message);
                self.resolve(
                    TxState::Dropped,
                    Err(ConfirmationError::Dropped { tx_hash, message }),
                )
            }
            StatusEvent::Invalid(message) => {
                error!("❌ Error transaction {:?} invalid: {}", tx_hash, message);
                self.resolve(
                    TxState::Invalid,
                    Err(ConfirmationError::Invalid { tx_hash, message }),
                )
            }
            StatusEvent::Usurped(message) => {
                error!("❌ Error transaction {:?} usurped: {}", tx_hash, message);
                self.resolve(
                    TxState::Usurped,
                    Err(ConfirmationError::Usurped { tx_hash, message }),
                )
            }
            StatusEvent::Error(message) => {
                error!("❌ Error while watching transaction {:?}: {}", tx_hash, message);
                self.resolve(
                    TxState::Error,
                    Err(ConfirmationError::Watch { tx_hash, message }),
                )
            }
        }
    }

    /// Resolves with [`ConfirmationError::TimedOut`] if nothing resolved within `timeout`.
    pub fn expire(&mut self, timeout: Duration) -> Option<Resolution> {
        if !self.resolved {
            warn!(
                "⏱️ Transaction {:?} not confirmed within {:?} (last state {:?})",
                self.tx_hash, timeout, self.state
            );
        }
        let tx_hash = self.tx_hash;
        self.resolve(
            TxState::TimedOut,
            Err(ConfirmationError::TimedOut { tx_hash, timeout }),
        )
    }

    /// Resolves with an error if the event stream ended before resolution.
    pub fn close(&mut self) -> Option<Resolution> {
        let tx_hash = self.tx_hash;
        self.resolve(
            TxState::Error,
            Err(ConfirmationError::Watch {
                tx_hash,
                message: "subscription closed before a terminal status".to_string(),
            }),
        )
    }

    /// Resolves with [`ConfirmationError::Canceled`].
    pub fn abandon(&mut self) -> Option<Resolution> {
        let tx_hash = self.tx_hash;
        self.resolve(TxState::Canceled, Err(ConfirmationError::Canceled { tx_hash }))
    }
}

/// Caller-owned handle to one broadcast transaction.
///
/// Consumed by [`SubmissionHandle::wait`] or [`SubmissionHandle::cancel`]. Either way, and also
/// when the handle is simply dropped, the subscription is returned to the client exactly once.
pub struct SubmissionHandle {
    /// Resolution state machine.
    tracker: StatusTracker,
    /// Live subscription, taken when released.
    subscription: Option<Subscription>,
    /// Client that owns the subscription.
    client: Arc<dyn ChainClient>,
    /// Upper bound on the wait for a resolving event.
    timeout: Duration,
    /// Broadcast time plus `timeout`.
    deadline: Instant,
}

impl SubmissionHandle {
    /// Binds a subscription to a new tracker.
    ///
    /// The confirmation deadline starts counting here, at broadcast, not when the caller
    /// starts waiting.
    ///
    /// # Arguments
    /// * `client` - The client that owns `subscription` and receives it back once released.
    /// * `subscription` - The status subscription returned by the broadcast.
    /// * `policy` - When the submission counts as successful.
    /// * `timeout` - How long after broadcast a resolving event may arrive.
    ///
    /// # Returns
    /// A handle tracking the transaction the subscription watches.
    pub fn new(
        client: Arc<dyn ChainClient>,
        subscription: Subscription,
        policy: ResolvePolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            tracker: StatusTracker::new(subscription.tx_hash(), policy),
            subscription: Some(subscription),
            client,
            timeout,
            deadline: Instant::now() + timeout,
        }
    }

    /// Hash of the tracked transaction.
    pub fn tx_hash(&self) -> H256 {
        self.tracker.tx_hash()
    }

    /// Identifier of the live subscription, if not yet released.
    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.subscription.as_ref().map(Subscription::id)
    }

    /// Current tracker state.
    pub fn state(&self) -> TxState {
        self.tracker.state()
    }

    /// Hands the subscription back to the client, once.
    fn release(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.client.cancel(subscription);
        }
    }

    /// Waits for the transaction to resolve.
    ///
    /// Resolves at the first event satisfying the policy, at the first failure, when the event
    /// stream ends, or when the deadline set at broadcast passes, whichever comes first. The
    /// subscription is released before returning.
    ///
    /// # Returns
    /// * `Ok(Confirmation)` - The transaction reached the block state the policy asks for.
    /// * `Err(ConfirmationError)` - The transaction failed, the watch broke, or the deadline
    ///   passed.
    pub async fn wait(mut self) -> Resolution {
        let deadline = self.deadline;

        loop {
            let Some(subscription) = self.subscription.as_mut() else {
                let tx_hash = self.tracker.tx_hash();
                return Err(ConfirmationError::Canceled { tx_hash });
            };

            let resolution = match timeout_at(deadline, subscription.next()).await {
                Ok(Some(event)) => self.tracker.observe(event),
                Ok(None) => self.tracker.close(),
                Err(_) => self.tracker.expire(self.timeout),
            };

            if let Some(resolution) = resolution {
                self.release();
                return resolution;
            }
        }
    }

    /// Stops tracking without waiting.
    ///
    /// The transaction may still be included later; nothing will report it.
    pub fn cancel(mut self) {
        if self.tracker.abandon().is_some() {
            info!("🛑 Stopped tracking transaction {:?}", self.tracker.tx_hash());
        }
        self.release();
    }
}

impl Drop for SubmissionHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(byte: u8) -> H256 {
        H256::repeat_byte(byte)
    }

    fn feed(tracker: &mut StatusTracker, events: Vec<StatusEvent>) -> Vec<Resolution> {
        events
            .into_iter()
            .filter_map(|event| tracker.observe(event))
            .collect()
    }

    #[test]
    fn in_block_policy_resolves_at_inclusion() {
        let mut tracker = StatusTracker::new(hash(9), ResolvePolicy::InBlock);

        let resolutions = feed(
            &mut tracker,
            vec![StatusEvent::Ready, StatusEvent::InBlock(hash(1))],
        );

        assert_eq!(
            resolutions,
            vec![Ok(Confirmation {
                tx_hash: hash(9),
                block_hash: hash(1),
                state: TxState::InBlock,
                history: vec![StatusEvent::Ready, StatusEvent::InBlock(hash(1))],
            })]
        );
        assert!(tracker.is_resolved());
    }

    #[test]
    fn finalized_policy_waits_past_inclusion() {
        let mut tracker = StatusTracker::new(hash(9), ResolvePolicy::Finalized);

        assert_eq!(tracker.observe(StatusEvent::Ready), None);
        assert_eq!(tracker.observe(StatusEvent::InBlock(hash(1))), None);
        assert_eq!(tracker.state(), TxState::InBlock);
        assert!(!tracker.is_resolved());

        let resolution = tracker.observe(StatusEvent::Finalized(hash(1))).unwrap().unwrap();
        assert_eq!(resolution.block_hash, hash(1));
        assert_eq!(resolution.state, TxState::Finalized);
        assert_eq!(resolution.history.len(), 3);
    }

    #[test]
    fn finalization_also_satisfies_the_in_block_policy() {
        let mut tracker = StatusTracker::new(hash(9), ResolvePolicy::InBlock);

        let resolution = tracker.observe(StatusEvent::Finalized(hash(2))).unwrap().unwrap();

        assert_eq!(resolution.state, TxState::Finalized);
    }

    #[test]
    fn dropped_resolves_once_and_later_events_are_ignored() {
        let mut tracker = StatusTracker::new(hash(9), ResolvePolicy::Finalized);

        let resolutions = feed(
            &mut tracker,
            vec![
                StatusEvent::Dropped("pool full".to_string()),
                StatusEvent::InBlock(hash(1)),
                StatusEvent::Finalized(hash(1)),
                StatusEvent::Invalid("late".to_string()),
            ],
        );

        assert_eq!(
            resolutions,
            vec![Err(ConfirmationError::Dropped {
                tx_hash: hash(9),
                message: "pool full".to_string(),
            })]
        );
        assert_eq!(tracker.state(), TxState::Dropped);
        assert_eq!(tracker.history().len(), 1);
        assert_eq!(tracker.expire(Duration::from_secs(1)), None);
        assert_eq!(tracker.close(), None);
        assert_eq!(tracker.abandon(), None);
    }

    #[test]
    fn failures_resolve_regardless_of_policy() {
        for policy in [ResolvePolicy::InBlock, ResolvePolicy::Finalized] {
            let cases = [
                (StatusEvent::Invalid("bad".to_string()), TxState::Invalid),
                (StatusEvent::Usurped("same nonce".to_string()), TxState::Usurped),
                (StatusEvent::Error("rpc".to_string()), TxState::Error),
                (StatusEvent::Dropped("gone".to_string()), TxState::Dropped),
            ];

            for (event, state) in cases {
                let mut tracker = StatusTracker::new(hash(3), policy);
                tracker.observe(StatusEvent::Ready);

                assert!(matches!(tracker.observe(event), Some(Err(_))));
                assert_eq!(tracker.state(), state);
                assert!(state.is_terminal());
            }
        }
    }

    #[test]
    fn state_never_moves_backwards() {
        let mut tracker = StatusTracker::new(hash(4), ResolvePolicy::Finalized);

        tracker.observe(StatusEvent::InBlock(hash(1)));
        tracker.observe(StatusEvent::Ready);
        tracker.observe(StatusEvent::Broadcast(3));
        tracker.observe(StatusEvent::Retracted);

        assert_eq!(tracker.state(), TxState::InBlock);
        assert!(!tracker.is_resolved());
    }

    #[test]
    fn expiry_resolves_with_timed_out() {
        let mut tracker = StatusTracker::new(hash(5), ResolvePolicy::Finalized);
        tracker.observe(StatusEvent::InBlock(hash(1)));

        assert_eq!(
            tracker.expire(Duration::from_secs(30)),
            Some(Err(ConfirmationError::TimedOut {
                tx_hash: hash(5),
                timeout: Duration::from_secs(30),
            }))
        );
        assert_eq!(tracker.state(), TxState::TimedOut);
        assert_eq!(tracker.observe(StatusEvent::Finalized(hash(1))), None);
    }
}
