//! # Key Dump Keyring
//!
//! Turns the text printed by `subkey generate` / `subkey inspect` into a structured,
//! queryable keyring. Parsing never fails on content: malformed groups produce invalid
//! records (or rejected groups when labels are checked) that callers can inspect.

/// Error types for reading dumps and querying the keyring.
pub mod error;

/// The six-field key record and its validity query.
pub mod record;

/// Fixed-layout dump parser.
///
/// Splits the dump into groups of six lines and assigns values positionally,
/// optionally verifying each line's label.
pub mod parser;

/// Append-only keyring with address lookup.
pub mod index;

#[cfg(test)]
mod dump_directory;

pub use error::{LookupError, ParseError};
pub use index::Keyring;
pub use parser::{load_dump, parse_dump, GroupRejection, LabelPolicy, ParsedDump};
pub use record::{KeyField, KeyRecord};
