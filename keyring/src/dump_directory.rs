use std::path::PathBuf;

use rand::Rng;

use crate::parser::tests::dump_group;

/// Scratch directory for key dump files, removed when dropped.
pub struct DumpDirectory {
    /// Where the dumps are written.
    pub path: PathBuf,
}

impl DumpDirectory {
    /// Creates a uniquely named directory under `test_directory/`.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let name: u128 = rng.gen();
        let path = PathBuf::from(format!("test_directory/keyring-{name:032x}"));

        std::fs::create_dir_all(&path).unwrap();

        DumpDirectory { path }
    }

    /// Writes a dump holding one group per seed byte and returns its path.
    pub async fn write_dump(&self, name: &str, seeds: impl IntoIterator<Item = u8>) -> PathBuf {
        let path = self.path.join(name);
        let text: String = seeds.into_iter().map(dump_group).collect();

        tokio::fs::write(&path, text).await.unwrap();
        path
    }
}

impl Drop for DumpDirectory {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.path).unwrap();
    }
}

mod tests {
    use super::*;

    #[tokio::test]
    async fn dump_directories_are_removed_with_their_files() {
        let directory = DumpDirectory::random(&mut rand::thread_rng());
        let root = directory.path.clone();
        let dump = directory.write_dump("keys.txt", [1, 2]).await;
        assert!(dump.exists());

        drop(directory);

        assert!(!root.exists());
    }
}
