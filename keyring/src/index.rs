use std::collections::HashMap;
use std::path::Path;

use log::{info, warn};

use crate::error::{LookupError, ParseError};
use crate::parser::{load_dump, LabelPolicy, ParsedDump};
use crate::record::KeyRecord;

/// An append-only collection of key records, indexed by chain address.
///
/// Every imported record is kept in import order. When two records share an address the
/// newer one is returned by lookups while both remain visible through [`Keyring::all`].
#[derive(Debug, Clone, Default)]
pub struct Keyring {
    /// Records in import order.
    records: Vec<KeyRecord>,
    /// Address to position in `records`.
    by_address: HashMap<String, usize>,
}

impl Keyring {
    /// Creates an empty keyring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a keyring from the records of a parsed dump.
    pub fn from_dump(dump: ParsedDump) -> Self {
        let mut keyring = Self::new();
        keyring.import(dump.records);
        keyring
    }

    /// Reads, parses and imports a dump file.
    pub async fn load(path: impl AsRef<Path>, policy: LabelPolicy) -> Result<Self, ParseError> {
        let dump = load_dump(path, policy).await?;
        Ok(Self::from_dump(dump))
    }

    /// Appends records and indexes each one that has an address.
    pub fn import(&mut self, records: impl IntoIterator<Item = KeyRecord>) {
        for record in records {
            let position = self.records.len();

            if record.address.is_empty() {
                warn!("⚠️ Importing key record {position} without an address; it cannot be looked up");
            } else if let Some(previous) = self.by_address.insert(record.address.clone(), position)
            {
                warn!(
                    "⚠️ Address {} already imported at position {}; lookups now return position {}",
                    record.address, previous, position
                );
            }

            self.records.push(record);
        }

        info!("🔑 Keyring holds {} records", self.records.len());
    }

    /// Returns the most recently imported record for `address`.
    pub fn lookup(&self, address: &str) -> Option<&KeyRecord> {
        self.by_address
            .get(address)
            .map(|&position| &self.records[position])
    }

    /// Like [`Keyring::lookup`], but reports a missing address as an error.
    pub fn get(&self, address: &str) -> Result<&KeyRecord, LookupError> {
        self.lookup(address).ok_or_else(|| LookupError::NotFound {
            address: address.to_string(),
        })
    }

    /// All records in import order, duplicates and invalid records included.
    pub fn all(&self) -> &[KeyRecord] {
        &self.records
    }

    /// Records that can be used as signers.
    pub fn valid(&self) -> impl Iterator<Item = &KeyRecord> {
        self.records.iter().filter(|record| record.is_valid())
    }

    /// Number of imported records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been imported.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_dump;
    use crate::parser::tests::dump_group;
    use crate::dump_directory::DumpDirectory;

    fn keyring_of(groups: impl IntoIterator<Item = u8>) -> Keyring {
        let text: String = groups.into_iter().map(dump_group).collect();
        Keyring::from_dump(parse_dump(&text, LabelPolicy::Labeled))
    }

    #[test]
    fn every_imported_record_can_be_looked_up() {
        let keyring = keyring_of(0..5);

        assert_eq!(keyring.len(), 5);
        for record in keyring.all() {
            assert_eq!(keyring.lookup(&record.address), Some(record));
            assert_eq!(keyring.get(&record.address), Ok(record));
        }
    }

    #[test]
    fn absent_addresses_are_not_found() {
        let keyring = keyring_of(0..2);

        assert_eq!(keyring.lookup("5Nowhere"), None);
        assert_eq!(
            keyring.get("5Nowhere"),
            Err(LookupError::NotFound {
                address: "5Nowhere".to_string()
            })
        );
    }

    #[test]
    fn newer_records_win_lookups_but_history_is_kept() {
        let mut keyring = keyring_of([1]);
        let replacement = KeyRecord {
            secret_phrase: "another phrase".to_string(),
            ..keyring.all()[0].clone()
        };

        keyring.import([replacement.clone()]);

        assert_eq!(keyring.len(), 2);
        assert_eq!(keyring.lookup("5Address1"), Some(&replacement));
        assert_eq!(keyring.all()[0].secret_phrase, "phrase number 1");
        assert_eq!(keyring.all()[1], replacement);
    }

    #[test]
    fn records_without_an_address_are_kept_but_not_indexed() {
        let mut keyring = Keyring::new();
        assert!(keyring.is_empty());

        keyring.import([KeyRecord::default()]);

        assert_eq!(keyring.len(), 1);
        assert_eq!(keyring.lookup(""), None);
        assert_eq!(keyring.valid().count(), 0);
    }

    #[test]
    fn iteration_preserves_file_order() {
        let keyring = keyring_of([7, 3, 9]);

        let addresses: Vec<_> = keyring.all().iter().map(|r| r.address.clone()).collect();
        assert_eq!(addresses, vec!["5Address7", "5Address3", "5Address9"]);
        assert_eq!(keyring.valid().count(), 3);
    }

    #[tokio::test]
    async fn we_can_load_a_keyring_from_disk() {
        let directory = DumpDirectory::random(&mut rand::thread_rng());
        let path = directory.write_dump("keys.txt", [4, 5]).await;

        let keyring = Keyring::load(&path, LabelPolicy::Labeled).await.unwrap();

        assert_eq!(keyring.len(), 2);
        assert!(keyring.lookup("5Address5").is_some());
    }
}
