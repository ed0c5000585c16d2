use bincode::{Decode, Encode};
use derive_more::Display;

use crate::sitemap::{EntryAttributes, SitemapEntry, SitemapTree, TreeError, site_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ChangeKind {
    #[display("new")]
    New,
    #[display("delete")]
    Delete,
    #[display("edit")]
    Edit,
    #[display("move")]
    Move,
}

/// A single recorded modification of the sitemap.
///
/// Every variant stores both ends of its transition, so it can be applied
/// and reverted against the current tree without any other state.
#[derive(Debug, Clone, PartialEq, Eq, Display, Encode, Decode)]
pub enum Change {
    /// A new entry, appended to the end of its parent's children.
    #[display("new {}", entry.site_path())]
    New { entry: SitemapEntry },
    /// An entry removed together with its subtree. `entry` is the snapshot
    /// taken when the change was created, including the original position.
    #[display("delete {}", entry.site_path())]
    Delete { entry: SitemapEntry },
    #[display("edit {site_path}")]
    Edit {
        site_path: String,
        old: EntryAttributes,
        new: EntryAttributes,
    },
    /// Relocation of an entry. The last segment of `destination_path` becomes
    /// the entry's name.
    #[display("move {source_path}@{source_position} -> {destination_path}@{destination_position}")]
    Move {
        source_path: String,
        source_position: usize,
        destination_path: String,
        destination_position: usize,
    },
}

impl Change {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::New { .. } => ChangeKind::New,
            Change::Delete { .. } => ChangeKind::Delete,
            Change::Edit { .. } => ChangeKind::Edit,
            Change::Move { .. } => ChangeKind::Move,
        }
    }

    /// The site path the change is about, the destination for moves.
    pub fn site_path(&self) -> &str {
        match self {
            Change::New { entry } | Change::Delete { entry } => entry.site_path(),
            Change::Edit { site_path, .. } => site_path,
            Change::Move {
                destination_path, ..
            } => destination_path,
        }
    }

    /// Applies the change to `tree`. On error the tree is left untouched.
    pub fn apply(&self, tree: &mut SitemapTree) -> Result<(), TreeError> {
        match self {
            Change::New { entry } => {
                tree.append_child(site_path::parent_folder(entry.site_path()), entry.clone())?;
                Ok(())
            }
            Change::Delete { entry } => {
                let parent = site_path::parent_folder(entry.site_path());
                ensure_child_at(tree, entry.site_path(), entry.position())?;
                tree.remove_child(parent, entry.position())?;
                Ok(())
            }
            Change::Edit { site_path, new, .. } => {
                tree.set_attributes(site_path, new.clone())?;
                Ok(())
            }
            Change::Move {
                source_path,
                source_position,
                destination_path,
                destination_position,
            } => relocate(
                tree,
                source_path,
                *source_position,
                destination_path,
                *destination_position,
            ),
        }
    }

    /// Reverts the effect of [`Change::apply`]. Must be called on the tree
    /// state right after this change was applied.
    pub fn revert(&self, tree: &mut SitemapTree) -> Result<(), TreeError> {
        match self {
            Change::New { entry } => {
                let parent_path = site_path::parent_folder(entry.site_path());
                let position = tree
                    .resolve_parent(parent_path)?
                    .child_index(entry.name())
                    .ok_or_else(|| TreeError::NotFound {
                        path: entry.site_path().to_string(),
                    })?;
                tree.remove_child(parent_path, position)?;
                Ok(())
            }
            Change::Delete { entry } => tree.insert_child(
                site_path::parent_folder(entry.site_path()),
                entry.clone(),
                entry.position(),
            ),
            Change::Edit { site_path, old, .. } => {
                tree.set_attributes(site_path, old.clone())?;
                Ok(())
            }
            Change::Move {
                source_path,
                source_position,
                destination_path,
                destination_position,
            } => relocate(
                tree,
                destination_path,
                *destination_position,
                source_path,
                *source_position,
            ),
        }
    }
}

/// Fails unless the entry named by `path` sits at `position` below its parent.
fn ensure_child_at(tree: &SitemapTree, path: &str, position: usize) -> Result<(), TreeError> {
    let parent = tree.resolve_parent(site_path::parent_folder(path))?;
    match parent.children().get(position) {
        Some(child) if child.name() == site_path::name_of(path) => Ok(()),
        _ => Err(TreeError::NotFound {
            path: path.to_string(),
        }),
    }
}

fn relocate(
    tree: &mut SitemapTree,
    from_path: &str,
    from_position: usize,
    to_path: &str,
    to_position: usize,
) -> Result<(), TreeError> {
    let from_parent = site_path::parent_folder(from_path);
    let to_parent = site_path::parent_folder(to_path);
    ensure_child_at(tree, from_path, from_position)?;
    tree.resolve_parent(to_parent)?;

    let mut moved = tree.remove_child(from_parent, from_position)?;

    let target_check = tree.resolve_parent(to_parent).and_then(|parent| {
        let len = parent.children().len();
        if to_position > len {
            Err(TreeError::PositionOutOfRange {
                parent_path: to_parent.to_string(),
                position: to_position,
                len,
            })
        } else if parent.child(site_path::name_of(to_path)).is_some() {
            Err(TreeError::DuplicateName {
                parent_path: to_parent.to_string(),
                name: site_path::name_of(to_path).to_string(),
            })
        } else {
            Ok(())
        }
    });
    if let Err(err) = target_check {
        tree.insert_child(from_parent, moved, from_position)?;
        return Err(err);
    }

    moved.set_site_path(to_path);
    tree.insert_child(to_parent, moved, to_position)
}
