use std::str::FromStr;

use hex::FromHex;
use node_keyring::{KeyField, KeyRecord};
use snafu::ResultExt;
use subxt_signer::sr25519::Keypair;
use subxt_signer::SecretUri;

use crate::error::*;

/// Decodes a `0x` prefixed 32 byte hex field of a key record.
fn decode_key_field(record: &KeyRecord, field: KeyField) -> Result<[u8; 32]> {
    let key_bytes =
        Vec::from_hex(record.field(field).trim_start_matches("0x")).context(SecretDecodeSnafu { field })?;

    let length = key_bytes.len();
    key_bytes
        .try_into()
        .map_err(|_| SubmissionError::InvalidKeyLength { length })
}

/// Derives the sr25519 keypair of a dump record.
///
/// The secret seed is the mini secret key printed by `subkey`; the resulting public key has to
/// match the record's public key, otherwise the record is treated as corrupt.
pub fn keypair_from_record(record: &KeyRecord) -> Result<Keypair> {
    if !record.is_valid() {
        return Err(SubmissionError::InvalidSigner {
            address: record.address.clone(),
            missing: record.missing_fields(),
        });
    }

    let seed = decode_key_field(record, KeyField::SecretSeed)?;
    let keypair = Keypair::from_secret_key(seed).map_err(|err| SubmissionError::KeyDerivation {
        message: err.to_string(),
    })?;

    let expected = decode_key_field(record, KeyField::PublicKeyHex)?;
    if keypair.public_key().0 != expected {
        return Err(SubmissionError::KeyMismatch {
            address: record.address.clone(),
        });
    }

    Ok(keypair)
}

/// Derives a keypair from a secret URI such as `//Alice` or `<phrase>//hard/soft`.
pub fn keypair_from_uri(uri: &str) -> Result<Keypair> {
    let uri = SecretUri::from_str(uri).map_err(|err| SubmissionError::KeyDerivation {
        message: err.to_string(),
    })?;

    Keypair::from_uri(&uri).map_err(|err| SubmissionError::KeyDerivation {
        message: err.to_string(),
    })
}
