use std::hash::{Hash, Hasher};

use metrohash::MetroHash64;
use snafu::Snafu;
use tracing::debug;

use crate::sitemap::{EntryAttributes, SitemapEntry, site_path};

/// Client-side mirror of the sitemap being edited.
///
/// The mirror is anchored at a synthetic root entry whose site path is the
/// common parent folder of all top-level entries. The root is never returned
/// by [`SitemapTree::lookup`], but it is a valid parent for insertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapTree {
    root: SitemapEntry,
}

impl Default for SitemapTree {
    fn default() -> Self {
        Self {
            root: SitemapEntry::new(site_path::ROOT_PATH),
        }
    }
}

impl SitemapTree {
    /// A mirror anchored at `root_path`, which stays the parent of new
    /// top-level entries even while there are none.
    pub fn with_root_path(root_path: impl Into<String>, roots: Vec<SitemapEntry>) -> Self {
        let mut root = SitemapEntry::new(root_path);
        root.replace_children(roots);
        Self { root }
    }

    /// Replaces the whole mirror with the given top-level entries. An empty
    /// list keeps the current root path.
    pub fn replace_roots(&mut self, roots: Vec<SitemapEntry>) {
        let root_path = roots
            .first()
            .map(|first| site_path::parent_folder(first.site_path()))
            .unwrap_or_else(|| self.root.site_path())
            .to_string();

        let mut root = SitemapEntry::new(root_path);
        root.replace_children(roots);
        debug!(
            "Replaced sitemap roots at '{}' ({} entries)",
            root.site_path(),
            root.subtree_len() - 1
        );
        self.root = root;
    }

    pub fn root_path(&self) -> &str {
        self.root.site_path()
    }

    pub fn roots(&self) -> &[SitemapEntry] {
        self.root.children()
    }

    /// Number of entries in the mirror, the synthetic root excluded.
    pub fn len(&self) -> usize {
        self.root.subtree_len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.root.children().is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_ok()
    }

    /// Resolves `path` to an entry, walking the tree segment by segment.
    pub fn lookup(&self, path: &str) -> Result<&SitemapEntry, TreeError> {
        let segments = site_path::relative_segments(self.root.site_path(), path)
            .ok_or_else(|| not_found(path))?;
        if segments.is_empty() {
            return Err(not_found(path));
        }

        segments
            .into_iter()
            .try_fold(&self.root, |current, name| current.child(name))
            .ok_or_else(|| not_found(path))
    }

    fn lookup_mut(&mut self, path: &str) -> Result<&mut SitemapEntry, TreeError> {
        let segments = site_path::relative_segments(self.root.site_path(), path)
            .ok_or_else(|| not_found(path))?;
        if segments.is_empty() {
            return Err(not_found(path));
        }

        segments
            .into_iter()
            .try_fold(&mut self.root, |current, name| current.child_mut(name))
            .ok_or_else(|| not_found(path))
    }

    /// Resolves a folder that may receive children, the root included.
    pub fn resolve_parent(&self, parent_path: &str) -> Result<&SitemapEntry, TreeError> {
        if self.is_root_path(parent_path) {
            return Ok(&self.root);
        }
        self.lookup(parent_path)
            .map_err(|_| TreeError::ParentNotFound {
                path: parent_path.to_string(),
            })
    }

    fn resolve_parent_mut(&mut self, parent_path: &str) -> Result<&mut SitemapEntry, TreeError> {
        if self.is_root_path(parent_path) {
            return Ok(&mut self.root);
        }
        self.lookup_mut(parent_path)
            .map_err(|_| TreeError::ParentNotFound {
                path: parent_path.to_string(),
            })
    }

    fn is_root_path(&self, path: &str) -> bool {
        site_path::relative_segments(self.root.site_path(), path)
            .is_some_and(|segments| segments.is_empty())
    }

    /// Inserts `entry` below `parent_path` at `position`, shifting later siblings.
    pub fn insert_child(
        &mut self,
        parent_path: &str,
        entry: SitemapEntry,
        position: usize,
    ) -> Result<(), TreeError> {
        let parent = self.resolve_parent_mut(parent_path)?;
        let len = parent.children().len();
        if position > len {
            return Err(TreeError::PositionOutOfRange {
                parent_path: parent_path.to_string(),
                position,
                len,
            });
        }
        if parent.child(entry.name()).is_some() {
            return Err(TreeError::DuplicateName {
                parent_path: parent_path.to_string(),
                name: entry.name().to_string(),
            });
        }
        parent.insert_child(entry, position);
        Ok(())
    }

    /// Appends `entry` to the children of `parent_path` and returns its position.
    pub fn append_child(
        &mut self,
        parent_path: &str,
        entry: SitemapEntry,
    ) -> Result<usize, TreeError> {
        let position = self.resolve_parent(parent_path)?.children().len();
        self.insert_child(parent_path, entry, position)?;
        Ok(position)
    }

    pub fn remove_child(
        &mut self,
        parent_path: &str,
        position: usize,
    ) -> Result<SitemapEntry, TreeError> {
        let parent = self.resolve_parent_mut(parent_path)?;
        let len = parent.children().len();
        parent
            .remove_child(position)
            .ok_or_else(|| TreeError::PositionOutOfRange {
                parent_path: parent_path.to_string(),
                position,
                len,
            })
    }

    /// Overwrites the attributes of the entry at `path`, returning the previous ones.
    pub fn set_attributes(
        &mut self,
        path: &str,
        attributes: EntryAttributes,
    ) -> Result<EntryAttributes, TreeError> {
        let entry = self.lookup_mut(path)?;
        let previous = entry.attributes().clone();
        entry.set_attributes(attributes);
        Ok(previous)
    }

    /// Stable 64-bit digest of the whole mirror.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = MetroHash64::default();
        self.root.hash(&mut hasher);
        hasher.finish()
    }
}

fn not_found(path: &str) -> TreeError {
    TreeError::NotFound {
        path: path.to_string(),
    }
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum TreeError {
    #[snafu(display("No sitemap entry found at '{}'", path))]
    NotFound { path: String },
    #[snafu(display("Parent folder '{}' does not exist", path))]
    ParentNotFound { path: String },
    #[snafu(display(
        "Position {} is out of range below '{}' ({} children)",
        position,
        parent_path,
        len
    ))]
    PositionOutOfRange {
        parent_path: String,
        position: usize,
        len: usize,
    },
    #[snafu(display("'{}' already has a child named '{}'", parent_path, name))]
    DuplicateName { parent_path: String, name: String },
}
