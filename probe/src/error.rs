use std::time::Duration;

use node_keyring::{KeyField, LookupError};
use snafu::Snafu;
use subxt::utils::H256;

/// Errors raised while connecting to a node.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConnectError {
    /// The RPC transport could not be established.
    #[snafu(display("Failed to build RPC client for {url}: {message}"))]
    RpcClient {
        /// The endpoint that was dialed.
        url: String,
        /// Transport error message.
        message: String,
    },

    /// The chain client could not be initialized over the RPC transport.
    #[snafu(display("Error connecting to chain: {source}"))]
    ChainConnection {
        /// The underlying error from the `subxt` library.
        source: subxt::Error,
    },
}

/// Local, immediate failures of [`crate::tx_submitter::TransactionSubmitter::submit`].
///
/// When one of these is returned no transaction is being tracked.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SubmissionError {
    /// The signer address is not in the keyring.
    #[snafu(display("Failed to resolve signer: {source}"))]
    SignerLookup {
        /// The keyring lookup failure.
        source: LookupError,
    },

    /// The signer record is missing key material.
    #[snafu(display("Key record {address} cannot sign, missing fields: {missing:?}"))]
    InvalidSigner {
        /// Address of the unusable record.
        address: String,
        /// The empty fields.
        missing: Vec<KeyField>,
    },

    /// A hex field of the signer record could not be decoded.
    #[snafu(display("Failed to parse {field} as hex: {source}"))]
    SecretDecode {
        /// The field that failed to decode.
        field: KeyField,
        /// The underlying hex parsing error.
        source: hex::FromHexError,
    },

    /// A decoded key has the wrong size.
    #[snafu(display("Invalid key length: expected 32 bytes, got {length}"))]
    InvalidKeyLength {
        /// The actual length of the decoded key.
        length: usize,
    },

    /// The key pair could not be derived from the secret material.
    #[snafu(display("Failed to derive keypair: {message}"))]
    KeyDerivation {
        /// Error message from the signer library.
        message: String,
    },

    /// The derived public key does not match the one recorded in the dump.
    #[snafu(display("Secret seed of {address} does not derive the recorded public key"))]
    KeyMismatch {
        /// Address of the inconsistent record.
        address: String,
    },

    /// The call could not be encoded against the node's metadata.
    #[snafu(display("Error encoding call {call}: {source}"))]
    Encode {
        /// The `Pallet.call` that failed.
        call: String,
        /// The underlying error from the `subxt` library.
        source: subxt::Error,
    },

    /// Signing failed, including fetching the nonce or the mortality checkpoint.
    #[snafu(display("Error signing tx: {source}"))]
    Sign {
        /// The underlying error from the `subxt` library.
        source: subxt::Error,
    },

    /// The node did not accept the signed transaction for watching.
    #[snafu(display("Error submitting tx {tx_hash:?}: {source}"))]
    Broadcast {
        /// Hash of the signed transaction.
        tx_hash: H256,
        /// The underlying error from the `subxt` library.
        source: subxt::Error,
    },
}

/// Terminal failures of a tracked submission.
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
#[snafu(visibility(pub))]
pub enum ConfirmationError {
    /// The transaction pool dropped the transaction.
    #[snafu(display("Transaction {tx_hash:?} was dropped: {message}"))]
    Dropped {
        /// Hash of the transaction.
        tx_hash: H256,
        /// Reason reported by the node.
        message: String,
    },

    /// The node considers the transaction invalid.
    #[snafu(display("Transaction {tx_hash:?} is invalid: {message}"))]
    Invalid {
        /// Hash of the transaction.
        tx_hash: H256,
        /// Reason reported by the node.
        message: String,
    },

    /// Another transaction with the same nonce replaced this one.
    #[snafu(display("Transaction {tx_hash:?} was usurped: {message}"))]
    Usurped {
        /// Hash of the transaction.
        tx_hash: H256,
        /// Reason reported by the node.
        message: String,
    },

    /// Watching the transaction failed.
    #[snafu(display("Error while watching transaction {tx_hash:?}: {message}"))]
    Watch {
        /// Hash of the transaction.
        tx_hash: H256,
        /// Transport or node error message.
        message: String,
    },

    /// No resolving status arrived in time.
    #[snafu(display("Transaction {tx_hash:?} not confirmed within {timeout:?}"))]
    TimedOut {
        /// Hash of the transaction.
        tx_hash: H256,
        /// The configured confirmation timeout.
        timeout: Duration,
    },

    /// The caller stopped tracking the transaction.
    #[snafu(display("Tracking of transaction {tx_hash:?} was canceled"))]
    Canceled {
        /// Hash of the transaction.
        tx_hash: H256,
    },
}

/// Errors raised when scraping the node's peer identity.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PeerIdError {
    /// The log file could not be read.
    #[snafu(display("Failed to read node log '{}': {}", path, source))]
    ReadLog {
        /// The path of the log.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The log does not contain a node identity line yet.
    #[snafu(display("No local node identity found in '{path}'"))]
    IdentityNotFound {
        /// The path of the log.
        path: String,
    },
}

/// Type alias for results that fail with a [`SubmissionError`].
pub type Result<T, E = SubmissionError> = std::result::Result<T, E>;
