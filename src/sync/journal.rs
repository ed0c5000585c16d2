use std::path::{Path, PathBuf};

use bincode::{Decode, Encode};
use compio::fs;
use snafu::{ResultExt, Snafu};
use tracing::{debug, info};

use crate::changes::Change;
use crate::sitemap::{SitemapTree, TreeError};

const JOURNAL_FILE_NAME: &str = "journal.bin.zst";
const COMPRESSION_LEVEL: i32 = 3;

fn get_journal_path(state_dir: &Path) -> PathBuf {
    state_dir.join(JOURNAL_FILE_NAME)
}

/// Every batch of changes saved so far, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Encode, Decode)]
pub struct Journal {
    batches: Vec<Vec<Change>>,
}

impl Journal {
    /// Reads the journal from `state_dir`, starting empty if there is none.
    pub async fn read(state_dir: &Path) -> Result<Self, JournalError> {
        let path = get_journal_path(state_dir);
        debug!("Reading save journal from {}", path.display());
        let compressed = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!("No existing save journal found, starting fresh");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).context(ReadSnafu {
                    path: path.display().to_string(),
                });
            }
        };

        let raw = zstd::decode_all(compressed.as_slice()).context(DecompressSnafu)?;
        let (journal, _) = bincode::decode_from_slice::<Self, _>(&raw, bincode::config::standard())
            .context(DecodeSnafu)?;
        debug!("Read save journal with {} batches", journal.batches.len());
        Ok(journal)
    }

    pub async fn write(&self, state_dir: &Path) -> Result<(), JournalError> {
        let path = get_journal_path(state_dir);
        let raw = bincode::encode_to_vec(self, bincode::config::standard()).context(EncodeSnafu)?;
        let compressed = zstd::encode_all(raw.as_slice(), COMPRESSION_LEVEL).context(CompressSnafu)?;

        fs::create_dir_all(state_dir).await.context(WriteSnafu {
            path: state_dir.display().to_string(),
        })?;
        fs::write(&path, compressed).await.0.context(WriteSnafu {
            path: path.display().to_string(),
        })?;
        debug!("Wrote save journal to {}", path.display());
        Ok(())
    }

    pub fn push(&mut self, batch: Vec<Change>) {
        self.batches.push(batch);
    }

    pub fn batches(&self) -> &[Vec<Change>] {
        &self.batches
    }

    /// Re-applies every saved change to `tree`, in save order.
    pub fn replay(&self, tree: &mut SitemapTree) -> Result<(), JournalError> {
        for change in self.batches.iter().flatten() {
            change.apply(tree).context(ReplaySnafu {
                change: change.to_string(),
            })?;
        }
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum JournalError {
    #[snafu(display("Failed to read the save journal {}", path))]
    ReadError {
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to write the save journal {}", path))]
    WriteError {
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to decompress the save journal"))]
    DecompressError { source: std::io::Error },
    #[snafu(display("Failed to compress the save journal"))]
    CompressError { source: std::io::Error },
    #[snafu(display("Failed to decode the save journal"))]
    DecodeError { source: bincode::error::DecodeError },
    #[snafu(display("Failed to encode the save journal"))]
    EncodeError { source: bincode::error::EncodeError },
    #[snafu(display("Saved change '{}' no longer applies to the sitemap", change))]
    ReplayError { change: String, source: TreeError },
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::sitemap::{SitemapEntry, sample_tree};

    #[compio::test]
    async fn missing_journal_reads_as_empty() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let journal = Journal::read(dir.path()).await.expect("read should succeed");
        assert!(journal.batches().is_empty());
    }

    #[compio::test]
    async fn written_journal_is_read_back() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let state_dir = dir.path().join("nested");
        let mut journal = Journal::default();
        journal.push(vec![Change::New {
            entry: SitemapEntry::new("/a/n").with_property("k", "v"),
        }]);

        journal.write(&state_dir).await.expect("write should succeed");
        let read = Journal::read(&state_dir).await.expect("read should succeed");

        assert_eq!(read, journal);
    }

    #[compio::test]
    async fn corrupt_journal_is_reported() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(get_journal_path(dir.path()), b"definitely not zstd")
            .expect("Failed to write corrupt journal");

        let result = Journal::read(dir.path()).await;

        assert!(matches!(result, Err(JournalError::DecompressError { .. })));
    }

    #[test]
    fn replay_applies_batches_in_order() {
        let mut journal = Journal::default();
        journal.push(vec![Change::New {
            entry: SitemapEntry::new("/a/n"),
        }]);
        journal.push(vec![Change::Move {
            source_path: "/a/n".into(),
            source_position: 2,
            destination_path: "/d/n".into(),
            destination_position: 0,
        }]);
        let mut tree = sample_tree();

        journal.replay(&mut tree).expect("replay should succeed");

        assert!(tree.contains("/d/n"));
        assert!(!tree.contains("/a/n"));
    }

    #[test]
    fn replay_reports_changes_that_no_longer_apply() {
        let mut journal = Journal::default();
        journal.push(vec![Change::Delete {
            entry: SitemapEntry::new("/missing"),
        }]);

        let result = journal.replay(&mut sample_tree());

        assert!(matches!(result, Err(JournalError::ReplayError { .. })));
    }
}
