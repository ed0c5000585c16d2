use std::cell::RefCell;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use compio::fs;
use compio::io::AsyncWriteAtExt;
use snafu::{ResultExt, ensure};
use tracing::{debug, info};

use crate::changes::Change;
use crate::sitemap::{SitemapEntry, SitemapTree};
use crate::sync::service::{
    ChangeRejectedSnafu, JournalUpdateSnafu, LockFileSnafu, LockedByOtherSnafu, NotLockedSnafu,
    UnknownResourceSnafu,
};
use crate::sync::{Journal, JournalError, RemoteError, SitemapService};

const LOCK_FILE_NAME: &str = "lock";

/// Sitemap service keeping its state in a local directory.
///
/// The lock is a file holding the owner's name, saved changes go to the
/// [`Journal`] and are replayed on top of the initial entries when the
/// service is opened again.
#[derive(Debug)]
pub struct LocalSitemapService {
    uri: String,
    owner: String,
    state_dir: PathBuf,
    sitemap: RefCell<SitemapTree>,
    journal: RefCell<Journal>,
}

impl LocalSitemapService {
    pub async fn open(
        uri: impl Into<String>,
        initial: SitemapTree,
        state_dir: impl Into<PathBuf>,
    ) -> Result<Self, JournalError> {
        let state_dir = state_dir.into();
        let journal = Journal::read(&state_dir).await?;
        let mut sitemap = initial;
        journal.replay(&mut sitemap)?;
        debug!(
            "Opened local sitemap service with {} entries and {} saved batches",
            sitemap.len(),
            journal.batches().len()
        );

        Ok(Self {
            uri: uri.into(),
            owner: format!("session-{}", std::process::id()),
            state_dir,
            sitemap: RefCell::new(sitemap),
            journal: RefCell::new(journal),
        })
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    fn lock_path(&self) -> PathBuf {
        self.state_dir.join(LOCK_FILE_NAME)
    }

    fn ensure_uri(&self, uri: &str) -> Result<(), RemoteError> {
        ensure!(uri == self.uri, UnknownResourceSnafu { uri });
        Ok(())
    }

    /// Returns the current lock owner, `None` when the resource is unlocked.
    async fn lock_owner(&self) -> Result<Option<String>, RemoteError> {
        let path = self.lock_path();
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).trim().to_string())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).context(LockFileSnafu {
                path: path.display().to_string(),
            }),
        }
    }

    async fn ensure_locked_by_us(&self, uri: &str) -> Result<(), RemoteError> {
        match self.lock_owner().await? {
            Some(owner) if owner == self.owner => Ok(()),
            Some(owner) => LockedByOtherSnafu { uri, owner }.fail(),
            None => NotLockedSnafu { uri }.fail(),
        }
    }
}

impl SitemapService for LocalSitemapService {
    async fn lock(&self, uri: &str) -> Result<(), RemoteError> {
        self.ensure_uri(uri)?;
        let path = self.lock_path();
        let lock_file_context = || LockFileSnafu {
            path: path.display().to_string(),
        };
        fs::create_dir_all(&self.state_dir)
            .await
            .with_context(|_| lock_file_context())?;

        // Creating the file is the lock; an existing file names its owner.
        loop {
            let created = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            match created {
                Ok(mut file) => {
                    file.write_all_at(self.owner.clone().into_bytes(), 0)
                        .await
                        .0
                        .with_context(|_| lock_file_context())?;
                    file.close().await.with_context(|_| lock_file_context())?;
                    info!("'{}' locked by {}", uri, self.owner);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    match self.lock_owner().await? {
                        Some(owner) if owner == self.owner => {
                            debug!("'{}' is already locked by this session", uri);
                            return Ok(());
                        }
                        Some(owner) => return LockedByOtherSnafu { uri, owner }.fail(),
                        None => debug!("Lock file of '{}' vanished, retrying", uri),
                    }
                }
                Err(err) => return Err(err).with_context(|_| lock_file_context()),
            }
        }
    }

    async fn unlock(&self, uri: &str) -> Result<(), RemoteError> {
        self.ensure_uri(uri)?;
        self.ensure_locked_by_us(uri).await?;

        let path = self.lock_path();
        fs::remove_file(&path).await.context(LockFileSnafu {
            path: path.display().to_string(),
        })?;
        info!("'{}' unlocked by {}", uri, self.owner);
        Ok(())
    }

    async fn save(&self, uri: &str, changes: &[Change]) -> Result<(), RemoteError> {
        self.ensure_uri(uri)?;
        self.ensure_locked_by_us(uri).await?;

        let mut updated = self.sitemap.borrow().clone();
        for change in changes {
            change.apply(&mut updated).context(ChangeRejectedSnafu {
                change: change.to_string(),
            })?;
        }

        let mut journal = self.journal.borrow().clone();
        journal.push(changes.to_vec());
        journal
            .write(&self.state_dir)
            .await
            .context(JournalUpdateSnafu)?;

        *self.sitemap.borrow_mut() = updated;
        *self.journal.borrow_mut() = journal;
        info!("Saved {} changes to '{}'", changes.len(), uri);
        Ok(())
    }

    async fn load_roots(&self, uri: &str) -> Result<Vec<SitemapEntry>, RemoteError> {
        self.ensure_uri(uri)?;
        Ok(self.sitemap.borrow().roots().to_vec())
    }
}
