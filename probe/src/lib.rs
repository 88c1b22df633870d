//! # Node Probe Library
//!
//! This library provides utilities for operating a Substrate-based node from the outside:
//! signing transactions with keys imported from `subkey` dumps, submitting them, and tracking
//! each submission until it resolves exactly once.

/// Error handling module.
///
/// Defines custom error types using the `snafu` crate for connection, submission,
/// confirmation and peer-identity failures.
pub mod error;

/// Dynamic call descriptions and typed call arguments.
pub mod call;

/// Chain client capability and its `subxt` implementation.
pub mod chain_client;

/// Cryptographic signer module.
///
/// Derives sr25519 keypairs from key records and secret URIs.
pub mod signer;

/// Transaction submission module.
///
/// Resolves signers, encodes, signs and broadcasts transactions, returning a tracked handle.
pub mod tx_submitter;

/// Tx progress tracking
pub mod tx_progress;

/// Peer identity scraping
pub mod peer_identity;

pub use call::{CallArg, CallRequest};
pub use chain_client::{ChainClient, SignedTransaction, Subscription, SubscriptionId, SubxtChainClient, TxParams};
pub use error::{ConfirmationError, ConnectError, PeerIdError, SubmissionError};
pub use tx_progress::{Confirmation, Resolution, ResolvePolicy, StatusEvent, StatusTracker, SubmissionHandle, TxState};
pub use tx_submitter::{SignerRef, SubmitterConfig, TransactionRequest, TransactionSubmitter};

#[cfg(test)]
mod mock;
