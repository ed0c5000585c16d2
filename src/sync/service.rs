use snafu::Snafu;

use crate::changes::Change;
use crate::sitemap::{SitemapEntry, TreeError};
use crate::sync::JournalError;

/// Remote operations backing an edit session.
///
/// Implementations report a failure through [`RemoteError`]; callers surface
/// it to the user and keep their local state.
pub trait SitemapService {
    async fn lock(&self, uri: &str) -> Result<(), RemoteError>;
    async fn unlock(&self, uri: &str) -> Result<(), RemoteError>;
    async fn save(&self, uri: &str, changes: &[Change]) -> Result<(), RemoteError>;
    async fn load_roots(&self, uri: &str) -> Result<Vec<SitemapEntry>, RemoteError>;
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RemoteError {
    #[snafu(display("Unknown sitemap resource '{}'", uri))]
    UnknownResource { uri: String },
    #[snafu(display("Resource '{}' is locked by {}", uri, owner))]
    LockedByOther { uri: String, owner: String },
    #[snafu(display("Resource '{}' is not locked by this session", uri))]
    NotLocked { uri: String },
    #[snafu(display("Change '{}' was rejected", change))]
    ChangeRejected { change: String, source: TreeError },
    #[snafu(display("Failed to access lock file {}", path))]
    LockFileError {
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to update the save journal"))]
    JournalUpdateError { source: JournalError },
}
