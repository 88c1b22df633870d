use snafu::Snafu;

/// Failure to obtain the dump text.
///
/// Content problems never surface here; they show up as invalid records or rejected groups.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ParseError {
    /// The dump file could not be read.
    #[snafu(display("Failed to read key dump from file '{}': {}", path, source))]
    ReadDump {
        /// The path of the dump that could not be read.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors raised when querying the keyring.
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub))]
pub enum LookupError {
    /// No record is indexed under the requested address.
    #[snafu(display("No key record found for address {address}"))]
    NotFound {
        /// The address that was looked up.
        address: String,
    },
}
