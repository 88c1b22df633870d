use core::fmt;

/// The fields of a key record, in the order they appear in a dump group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyField {
    /// Mnemonic secret phrase.
    SecretPhrase,
    /// Hex encoded secret seed (mini secret key).
    SecretSeed,
    /// Hex encoded public key.
    PublicKeyHex,
    /// Hex encoded account id.
    AccountId,
    /// SS58 encoded public key.
    PublicKeySs58,
    /// SS58 chain address.
    Address,
}

impl KeyField {
    /// Every field, indexed by its line offset within a group.
    pub const ALL: [KeyField; 6] = [
        KeyField::SecretPhrase,
        KeyField::SecretSeed,
        KeyField::PublicKeyHex,
        KeyField::AccountId,
        KeyField::PublicKeySs58,
        KeyField::Address,
    ];

    /// The label `subkey` prints in front of this field.
    pub fn label(self) -> &'static str {
        match self {
            KeyField::SecretPhrase => "Secret phrase:",
            KeyField::SecretSeed => "Secret seed:",
            KeyField::PublicKeyHex => "Public key (hex):",
            KeyField::AccountId => "Account ID:",
            KeyField::PublicKeySs58 => "Public key (SS58):",
            KeyField::Address => "SS58 Address:",
        }
    }
}

impl fmt::Display for KeyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label().trim_end_matches(':'))
    }
}

/// One key pair as printed by `subkey`.
///
/// A record is only usable for signing when every field is present, see [`KeyRecord::is_valid`].
/// Its identity is the chain address.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct KeyRecord {
    /// Mnemonic secret phrase.
    pub secret_phrase: String,
    /// Hex encoded secret seed.
    pub secret_seed: String,
    /// Hex encoded public key.
    pub public_key_hex: String,
    /// Hex encoded account id.
    pub account_id: String,
    /// SS58 encoded public key.
    pub public_key_ss58: String,
    /// SS58 chain address.
    pub address: String,
}

impl KeyRecord {
    /// Builds a record from the six values of a group, in [`KeyField::ALL`] order.
    pub fn from_values(values: [String; 6]) -> Self {
        let [secret_phrase, secret_seed, public_key_hex, account_id, public_key_ss58, address] =
            values;
        Self {
            secret_phrase,
            secret_seed,
            public_key_hex,
            account_id,
            public_key_ss58,
            address,
        }
    }

    /// Returns the value stored for `field`.
    pub fn field(&self, field: KeyField) -> &str {
        match field {
            KeyField::SecretPhrase => &self.secret_phrase,
            KeyField::SecretSeed => &self.secret_seed,
            KeyField::PublicKeyHex => &self.public_key_hex,
            KeyField::AccountId => &self.account_id,
            KeyField::PublicKeySs58 => &self.public_key_ss58,
            KeyField::Address => &self.address,
        }
    }

    /// Fields that are empty in this record.
    pub fn missing_fields(&self) -> Vec<KeyField> {
        KeyField::ALL
            .into_iter()
            .filter(|field| self.field(*field).is_empty())
            .collect()
    }

    /// Whether the record carries all six fields and can be used as a signer.
    pub fn is_valid(&self) -> bool {
        KeyField::ALL
            .into_iter()
            .all(|field| !self.field(field).is_empty())
    }
}

// Secrets stay out of logs.
impl fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRecord")
            .field("secret_phrase", &redacted(&self.secret_phrase))
            .field("secret_seed", &redacted(&self.secret_seed))
            .field("public_key_hex", &self.public_key_hex)
            .field("account_id", &self.account_id)
            .field("public_key_ss58", &self.public_key_ss58)
            .field("address", &self.address)
            .finish()
    }
}

/// Placeholder shown instead of secret material.
fn redacted(value: &str) -> &'static str {
    if value.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}
