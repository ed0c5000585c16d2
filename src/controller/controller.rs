use std::collections::BTreeMap;
use std::rc::Rc;

use snafu::{ResultExt, Snafu, ensure};
use tracing::{debug, info, warn};

use crate::changes::{Change, ChangeLog};
use crate::controller::{ChangeDirection, ChangeListener};
use crate::sitemap::{SitemapEntry, SitemapTree, TreeError, site_path};
use crate::sync::{SyncEvent, SyncHandle, SyncRequest};
use crate::ui::{Control, EditorUi};

/// Owns the tree mirror and the change log of one sitemap edit session.
///
/// The session is Clean while no change is applied and Dirty otherwise. The
/// first change of a Clean session queues a lock request, returning to Clean
/// queues an unlock. Remote requests never block local edits: the tree and
/// the listeners are updated before any remote answer arrives.
pub struct SitemapController {
    uri: String,
    tree: SitemapTree,
    log: ChangeLog,
    listeners: Vec<Box<dyn ChangeListener>>,
    ui: Rc<dyn EditorUi>,
    sync: SyncHandle,
    save_in_flight: bool,
}

impl SitemapController {
    pub fn new(uri: impl Into<String>, ui: Rc<dyn EditorUi>, sync: SyncHandle) -> Self {
        Self {
            uri: uri.into(),
            tree: SitemapTree::default(),
            log: ChangeLog::new(),
            listeners: Vec::new(),
            ui,
            sync,
            save_in_flight: false,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn tree(&self) -> &SitemapTree {
        &self.tree
    }

    /// The applied changes, oldest first.
    pub fn changes(&self) -> &[Change] {
        self.log.applied()
    }

    /// The undone changes, the next one to redo last.
    pub fn undone(&self) -> &[Change] {
        self.log.undone()
    }

    pub fn is_dirty(&self) -> bool {
        self.log.is_dirty()
    }

    pub fn is_saving(&self) -> bool {
        self.save_in_flight
    }

    pub fn add_listener(&mut self, listener: Box<dyn ChangeListener>) {
        self.listeners.push(listener);
    }

    /// Installs the initial mirror, root path included.
    pub fn set_tree(&mut self, tree: SitemapTree) {
        self.tree = tree;
        self.log_loaded();
    }

    /// Replaces the tree mirror with freshly loaded top-level entries.
    pub fn set_roots(&mut self, roots: Vec<SitemapEntry>) {
        self.tree.replace_roots(roots);
        self.log_loaded();
    }

    fn log_loaded(&self) {
        debug!(
            "Loaded sitemap '{}' with {} entries (fingerprint {:016x})",
            self.uri,
            self.tree.len(),
            self.tree.fingerprint()
        );
    }

    /// Registers a new entry, always appended to its parent's children.
    pub fn create(&mut self, entry: SitemapEntry) -> Result<(), ControllerError> {
        self.ensure_not_saving()?;
        let path = entry.site_path().to_string();
        ensure!(!entry.name().is_empty(), InvalidPathSnafu { path });
        ensure!(!self.tree.contains(&path), EntryExistsSnafu { path });

        let position = self
            .tree
            .resolve_parent(site_path::parent_folder(&path))
            .map_err(|_| missing_parent(&path))?
            .children()
            .len();

        self.add_change(Change::New {
            entry: entry.with_position(position),
        })
    }

    /// Deletes the entry at `path` together with all its descendants.
    pub fn delete(&mut self, path: &str) -> Result<(), ControllerError> {
        self.ensure_not_saving()?;
        let entry = self.lookup(path)?.clone();
        self.add_change(Change::Delete { entry })
    }

    /// Edits the entry at `path`. `None` keeps the current value; title and
    /// VFS reference are compared and stored trimmed. At least one value has
    /// to differ from the current one.
    pub fn edit(
        &mut self,
        path: &str,
        title: Option<&str>,
        vfs_reference: Option<&str>,
        properties: Option<BTreeMap<String, String>>,
    ) -> Result<(), ControllerError> {
        self.ensure_not_saving()?;
        let entry = self.lookup(path)?;
        let site_path = entry.site_path().to_string();
        let old = entry.attributes().clone();

        let mut new = old.clone();
        if let Some(title) = title.map(str::trim) {
            new.title = title.to_string();
        }
        if let Some(vfs_reference) = vfs_reference.map(str::trim) {
            new.vfs_reference = vfs_reference.to_string();
        }
        if let Some(properties) = properties {
            new.properties = properties;
        }
        ensure!(new != old, NoOpEditSnafu { path: site_path });

        self.add_change(Change::Edit {
            site_path,
            old,
            new,
        })
    }

    /// Moves the entry at `path` with all its descendants to
    /// `destination_path`, at `position` among its new siblings. The last
    /// segment of `destination_path` becomes the entry's name.
    pub fn move_entry(
        &mut self,
        path: &str,
        destination_path: &str,
        position: usize,
    ) -> Result<(), ControllerError> {
        self.ensure_not_saving()?;
        let entry = self.lookup(path)?;
        let source_path = entry.site_path().to_string();
        let source_position = entry.position();
        let source_parent = site_path::parent_folder(&source_path);

        let destination_parent = site_path::parent_folder(destination_path);
        let destination_name = site_path::name_of(destination_path);
        let destination = site_path::join(destination_parent, destination_name);
        ensure!(
            !destination_name.is_empty(),
            InvalidPathSnafu {
                path: destination_path
            }
        );
        ensure!(
            destination != source_path || position != source_position,
            NoOpMoveSnafu {
                path: source_path.as_str(),
                position
            }
        );
        ensure!(
            !is_within(destination_parent, &source_path),
            MoveIntoSubtreeSnafu {
                path: source_path.as_str(),
                destination: destination.as_str()
            }
        );

        let parent = self
            .tree
            .resolve_parent(destination_parent)
            .map_err(|_| missing_parent(&destination))?;
        let same_parent = destination_parent == source_parent;
        let max = parent.children().len() - usize::from(same_parent);
        ensure!(
            position <= max,
            PositionOutOfRangeSnafu {
                destination: destination.as_str(),
                position,
                max
            }
        );
        if let Some(occupant) = parent.child(destination_name) {
            ensure!(
                occupant.site_path() == source_path,
                DestinationOccupiedSnafu {
                    destination: destination.as_str()
                }
            );
        }

        self.add_change(Change::Move {
            source_path,
            source_position,
            destination_path: destination,
            destination_position: position,
        })
    }

    /// Reverts the last applied change. Returns `false` when there is nothing
    /// to undo.
    pub fn undo(&mut self) -> Result<bool, ControllerError> {
        self.ensure_not_saving()?;
        let Some(change) = self.log.pop_applied() else {
            return Ok(false);
        };

        if let Err(source) = change.revert(&mut self.tree) {
            let description = change.to_string();
            self.log.push_applied(change, true);
            return Err(source).context(StaleReferenceSnafu {
                change: description,
            });
        }

        if !self.log.can_redo() {
            self.ui.set_enabled(Control::Redo, true);
        }
        self.notify(&change, ChangeDirection::Undone);
        self.log.push_undone(change);

        if !self.is_dirty() {
            debug!("All changes undone, '{}' is clean again", self.uri);
            self.internal_reset(false);
        }
        Ok(true)
    }

    /// Re-applies the last undone change. Returns `false` when there is
    /// nothing to redo.
    pub fn redo(&mut self) -> Result<bool, ControllerError> {
        self.ensure_not_saving()?;
        let Some(change) = self.log.pop_undone() else {
            return Ok(false);
        };

        if let Err(source) = change.apply(&mut self.tree) {
            let description = change.to_string();
            self.log.push_undone(change);
            return Err(source).context(StaleReferenceSnafu {
                change: description,
            });
        }
        self.record_applied(change, true);

        if !self.log.can_redo() {
            self.ui.set_enabled(Control::Redo, false);
        }
        Ok(true)
    }

    /// Sends every applied change to the save endpoint. Returns `false` when
    /// there is nothing to save.
    ///
    /// Until the outcome arrives through [`SitemapController::process_sync_events`]
    /// the session refuses further edits. A successful save empties the applied
    /// log and releases the lock, a failed one leaves everything in place.
    pub fn commit(&mut self) -> Result<bool, ControllerError> {
        self.ensure_not_saving()?;
        if !self.is_dirty() {
            debug!("Nothing to commit for '{}'", self.uri);
            return Ok(false);
        }

        self.save_in_flight = true;
        self.sync.request(SyncRequest::Save {
            changes: self.log.applied().to_vec(),
        });
        Ok(true)
    }

    /// Discards all changes, unlocks the resource and reloads the sitemap.
    ///
    /// The mirror is only restored by the reload. If the unlock fails no
    /// reload arrives, and the mirror keeps showing the discarded edits
    /// although the session is Clean.
    pub fn reset(&mut self) {
        debug!(
            "Resetting '{}', discarding {} applied and {} undone changes",
            self.uri,
            self.log.applied().len(),
            self.log.undone().len()
        );
        self.log.clear();
        self.save_in_flight = false;
        self.ui.set_enabled(Control::Redo, false);
        self.internal_reset(true);
    }

    /// Reacts to every remote outcome received so far and returns their number.
    pub fn process_sync_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.sync.try_next_event() {
            handled += 1;
            match event {
                SyncEvent::Saved { count } => {
                    if !self.save_in_flight {
                        warn!("Ignoring save confirmation for '{}' without a pending commit", self.uri);
                        continue;
                    }
                    self.save_in_flight = false;
                    info!("Committed {} changes to '{}'", count, self.uri);
                    self.log.clear_applied();
                    self.internal_reset(false);
                }
                SyncEvent::SaveFailed => {
                    if self.save_in_flight {
                        debug!("Save of '{}' failed, keeping local changes", self.uri);
                    }
                    self.save_in_flight = false;
                }
                SyncEvent::Reloaded { roots } => {
                    if self.is_dirty() {
                        warn!("Ignoring reloaded sitemap for '{}', the session has new changes", self.uri);
                        continue;
                    }
                    self.set_roots(roots);
                }
            }
        }
        handled
    }

    fn lookup(&self, path: &str) -> Result<&SitemapEntry, ControllerError> {
        self.tree
            .lookup(path)
            .map_err(|_| ControllerError::EntryNotFound {
                path: path.to_string(),
            })
    }

    fn ensure_not_saving(&self) -> Result<(), ControllerError> {
        ensure!(!self.save_in_flight, SaveInFlightSnafu { uri: self.uri.as_str() });
        Ok(())
    }

    /// Applies a forward change and records it.
    fn add_change(&mut self, change: Change) -> Result<(), ControllerError> {
        change
            .apply(&mut self.tree)
            .with_context(|_| StaleReferenceSnafu {
                change: change.to_string(),
            })?;
        self.record_applied(change, false);
        Ok(())
    }

    fn record_applied(&mut self, change: Change, redo: bool) {
        if !self.is_dirty() {
            self.start_edit();
        }
        if !redo {
            self.ui.set_enabled(Control::Redo, false);
        }

        let direction = if redo {
            ChangeDirection::Redone
        } else {
            ChangeDirection::Applied
        };
        self.notify(&change, direction);
        self.log.push_applied(change, redo);
    }

    fn notify(&mut self, change: &Change, direction: ChangeDirection) {
        debug!("Change {} {}", direction, change);
        for listener in &mut self.listeners {
            listener.on_change(change, direction);
        }
    }

    fn start_edit(&self) {
        debug!("Starting to edit '{}'", self.uri);
        self.sync.request(SyncRequest::Lock);
    }

    fn internal_reset(&self, reload: bool) {
        self.ui.set_enabled(Control::Save, false);
        self.ui.set_enabled(Control::Reset, false);
        self.ui.set_enabled(Control::Undo, false);
        self.sync.request(SyncRequest::Unlock { reload });
    }
}

fn missing_parent(path: &str) -> ControllerError {
    ControllerError::MissingParent {
        path: site_path::parent_folder(path).to_string(),
    }
}

/// Whether `path` is `ancestor` or lies below it.
fn is_within(path: &str, ancestor: &str) -> bool {
    path == ancestor
        || path
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[derive(Debug, Snafu)]
pub enum ControllerError {
    #[snafu(display("An entry already exists at '{}'", path))]
    EntryExists { path: String },
    #[snafu(display("No entry exists at '{}'", path))]
    EntryNotFound { path: String },
    #[snafu(display("Parent folder '{}' does not exist", path))]
    MissingParent { path: String },
    #[snafu(display("'{}' is not a valid entry path", path))]
    InvalidPath { path: String },
    #[snafu(display("Edit of '{}' does not change anything", path))]
    NoOpEdit { path: String },
    #[snafu(display("'{}' is already at position {}", path, position))]
    NoOpMove { path: String, position: usize },
    #[snafu(display("Cannot move '{}' into its own subtree at '{}'", path, destination))]
    MoveIntoSubtree { path: String, destination: String },
    #[snafu(display("Destination '{}' is already taken", destination))]
    DestinationOccupied { destination: String },
    #[snafu(display(
        "Position {} is out of range for '{}' (at most {})",
        position,
        destination,
        max
    ))]
    PositionOutOfRange {
        destination: String,
        position: usize,
        max: usize,
    },
    #[snafu(display("Change '{}' refers to a stale tree state", change))]
    StaleReference { change: String, source: TreeError },
    #[snafu(display("A save of '{}' is still in flight", uri))]
    SaveInFlight { uri: String },
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use rstest::rstest;

    use super::*;
    use crate::sitemap::sample_tree;
    use crate::sync::{FakeService, SyncEndpoint, SyncWorker, channel};
    use crate::ui::{RecordingUi, UiEvent};

    type Seen = Rc<RefCell<Vec<(String, ChangeDirection)>>>;

    struct Session {
        controller: SitemapController,
        endpoint: SyncEndpoint,
        ui: Rc<RecordingUi>,
        seen: Seen,
    }

    impl Session {
        fn new(roots: Vec<SitemapEntry>) -> Self {
            let ui = Rc::new(RecordingUi::default());
            let (handle, endpoint) = channel();
            let mut controller = SitemapController::new("/sitemap", ui.clone(), handle);
            controller.set_roots(roots);

            let seen: Seen = Rc::default();
            let sink = seen.clone();
            controller.add_listener(Box::new(move |change: &Change, direction: ChangeDirection| {
                sink.borrow_mut().push((change.to_string(), direction));
            }));

            Self {
                controller,
                endpoint,
                ui,
                seen,
            }
        }

        fn sample() -> Self {
            Self::new(sample_tree().roots().to_vec())
        }

        fn requests(&mut self) -> Vec<SyncRequest> {
            std::iter::from_fn(|| self.endpoint.try_next_request()).collect()
        }
    }

    fn children_of(tree: &SitemapTree, path: &str) -> Vec<(String, usize)> {
        tree.resolve_parent(path)
            .expect("parent should exist")
            .children()
            .iter()
            .map(|child| (child.name().to_string(), child.position()))
            .collect()
    }

    fn owned(pairs: &[(&str, usize)]) -> Vec<(String, usize)> {
        pairs.iter().map(|(n, p)| (n.to_string(), *p)).collect()
    }

    #[test]
    fn create_appends_regardless_of_requested_position() {
        let mut session = Session::new(vec![
            SitemapEntry::new("/a").with_child(SitemapEntry::new("/a/b")),
        ]);

        session
            .controller
            .create(SitemapEntry::new("/a/c").with_position(7))
            .expect("create should succeed");

        let tree = session.controller.tree();
        assert_eq!(children_of(tree, "/a"), owned(&[("b", 0), ("c", 1)]));
        assert!(session.controller.is_dirty());
    }

    #[test]
    fn move_below_sibling_and_undo() {
        let mut session = Session::new(vec![
            SitemapEntry::new("/a")
                .with_child(SitemapEntry::new("/a/b"))
                .with_child(SitemapEntry::new("/a/c")),
        ]);
        let before = session.controller.tree().clone();

        session
            .controller
            .move_entry("/a/b", "/a/c/b", 0)
            .expect("move should succeed");

        let tree = session.controller.tree();
        assert_eq!(children_of(tree, "/a"), owned(&[("c", 0)]));
        assert_eq!(children_of(tree, "/a/c"), owned(&[("b", 0)]));
        assert!(!tree.contains("/a/b"));

        assert_eq!(session.controller.undo().ok(), Some(true));

        let tree = session.controller.tree();
        assert_eq!(children_of(tree, "/a"), owned(&[("b", 0), ("c", 1)]));
        assert!(children_of(tree, "/a/c").is_empty());
        assert_eq!(*tree, before);
    }

    #[rstest]
    #[case(Some("X"), None, None)]
    #[case(Some("  X "), None, None)]
    #[case(None, Some("/x.html"), None)]
    #[case(None, None, Some(BTreeMap::from([("k".to_string(), "v".to_string())])))]
    #[case(None, None, None)]
    fn noop_edit_is_rejected(
        #[case] title: Option<&str>,
        #[case] vfs_reference: Option<&str>,
        #[case] properties: Option<BTreeMap<String, String>>,
    ) {
        let mut session = Session::new(vec![
            SitemapEntry::new("/x")
                .with_title("X")
                .with_vfs_reference("/x.html")
                .with_property("k", "v"),
        ]);

        let result = session
            .controller
            .edit("/x", title, vfs_reference, properties);

        assert!(matches!(result, Err(ControllerError::NoOpEdit { .. })));
        assert!(!session.controller.is_dirty());
        assert!(session.requests().is_empty());
    }

    #[test]
    fn edit_trims_and_reverts() {
        let mut session = Session::sample();
        let before = session.controller.tree().clone();

        session
            .controller
            .edit("/a/c", Some("  New title "), None, None)
            .expect("edit should succeed");
        assert_eq!(
            session.controller.tree().lookup("/a/c").map(|e| e.title().to_string()),
            Ok("New title".to_string())
        );

        session.controller.undo().expect("undo should succeed");
        assert_eq!(*session.controller.tree(), before);
    }

    #[test]
    fn lock_once_per_dirty_period_and_unlock_on_clean() {
        let mut session = Session::sample();

        session
            .controller
            .create(SitemapEntry::new("/a/n"))
            .expect("create should succeed");
        assert_eq!(session.requests(), vec![SyncRequest::Lock]);

        session
            .controller
            .edit("/a/n", Some("N"), None, None)
            .expect("edit should succeed");
        assert!(session.requests().is_empty());

        session.controller.undo().expect("undo should succeed");
        assert!(session.requests().is_empty());

        session.controller.undo().expect("undo should succeed");
        assert_eq!(
            session.requests(),
            vec![SyncRequest::Unlock { reload: false }]
        );
        assert!(!session.controller.is_dirty());
    }

    #[test]
    fn delete_removes_and_undo_restores_subtree() {
        let mut session = Session::sample();
        let before = session.controller.tree().clone();
        let entries_before = before.len();

        session
            .controller
            .delete("/a/b")
            .expect("delete should succeed");

        let tree = session.controller.tree();
        assert_eq!(tree.len(), entries_before - 3);
        for path in ["/a/b", "/a/b/b1", "/a/b/b2"] {
            assert!(!tree.contains(path), "{path} should be gone");
        }
        assert_eq!(children_of(tree, "/a"), owned(&[("c", 0)]));

        session.controller.undo().expect("undo should succeed");

        let tree = session.controller.tree();
        assert_eq!(children_of(tree, "/a"), owned(&[("b", 0), ("c", 1)]));
        assert_eq!(children_of(tree, "/a/b"), owned(&[("b1", 0), ("b2", 1)]));
        assert_eq!(*tree, before);
    }

    #[test]
    fn undo_and_redo_walk_the_history_both_ways() {
        let mut session = Session::sample();
        let mut states = vec![session.controller.tree().clone()];

        session
            .controller
            .create(SitemapEntry::new("/a/n").with_title("N"))
            .expect("create");
        states.push(session.controller.tree().clone());
        session
            .controller
            .edit("/a/c", Some("C2"), Some("/c2.html"), None)
            .expect("edit");
        states.push(session.controller.tree().clone());
        session
            .controller
            .move_entry("/a/b", "/d/moved", 0)
            .expect("move");
        states.push(session.controller.tree().clone());
        session
            .controller
            .delete("/a/n")
            .expect("delete");
        states.push(session.controller.tree().clone());
        session
            .controller
            .move_entry("/a/c", "/a/c", 0)
            .expect_err("c is already the only child at 0");

        for expected in states.iter().rev().skip(1) {
            assert_eq!(session.controller.undo().ok(), Some(true));
            assert_eq!(session.controller.tree(), expected);
        }
        assert_eq!(session.controller.undo().ok(), Some(false));
        assert!(!session.controller.is_dirty());

        for expected in states.iter().skip(1) {
            assert_eq!(session.controller.redo().ok(), Some(true));
            assert_eq!(session.controller.tree(), expected);
        }
        assert_eq!(session.controller.redo().ok(), Some(false));
        assert_eq!(session.controller.changes().len(), 4);
    }

    #[test]
    fn redo_is_last_undone_first() {
        let mut session = Session::sample();
        session.controller.create(SitemapEntry::new("/a/x")).expect("create x");
        session.controller.create(SitemapEntry::new("/a/y")).expect("create y");

        session.controller.undo().expect("undo y");
        session.controller.undo().expect("undo x");
        session.controller.redo().expect("redo");

        assert!(session.controller.tree().contains("/a/x"));
        assert!(!session.controller.tree().contains("/a/y"));
        assert_eq!(session.controller.undone().len(), 1);
    }

    #[test]
    fn forward_change_discards_redo_history() {
        let mut session = Session::sample();
        session.controller.create(SitemapEntry::new("/a/x")).expect("create x");
        session.controller.undo().expect("undo x");
        assert_eq!(session.controller.undone().len(), 1);

        session.controller.create(SitemapEntry::new("/a/y")).expect("create y");

        assert!(session.controller.undone().is_empty());
        assert_eq!(session.controller.redo().ok(), Some(false));
        assert_eq!(session.ui.state_of(Control::Redo), Some(false));
    }

    #[test]
    fn dirty_follows_the_applied_log() {
        let mut session = Session::sample();
        assert!(!session.controller.is_dirty());

        session.controller.create(SitemapEntry::new("/a/x")).expect("create");
        assert!(session.controller.is_dirty());
        session.controller.undo().expect("undo");
        assert!(!session.controller.is_dirty());
        session.controller.redo().expect("redo");
        assert!(session.controller.is_dirty());
    }

    #[test]
    fn redo_control_follows_the_redo_history() {
        let mut session = Session::sample();
        session.controller.create(SitemapEntry::new("/a/x")).expect("create");
        session.ui.clear();

        session.controller.undo().expect("undo");
        assert_eq!(session.ui.state_of(Control::Redo), Some(true));
        assert_eq!(session.ui.state_of(Control::Undo), Some(false));
        assert_eq!(session.ui.state_of(Control::Save), Some(false));

        session.controller.redo().expect("redo");
        assert_eq!(session.ui.state_of(Control::Redo), Some(false));
    }

    #[test]
    fn listeners_see_every_direction() {
        let mut session = Session::sample();
        session.controller.delete("/d").expect("delete");
        session.controller.undo().expect("undo");
        session.controller.redo().expect("redo");

        assert_eq!(
            *session.seen.borrow(),
            vec![
                ("delete /d".to_string(), ChangeDirection::Applied),
                ("delete /d".to_string(), ChangeDirection::Undone),
                ("delete /d".to_string(), ChangeDirection::Redone),
            ]
        );
    }

    #[rstest]
    #[case::create_existing(|c: &mut SitemapController| c.create(SitemapEntry::new("/a/b")), "already exists")]
    #[case::create_without_parent(|c: &mut SitemapController| c.create(SitemapEntry::new("/x/y")), "Parent folder '/x'")]
    #[case::create_root(|c: &mut SitemapController| c.create(SitemapEntry::new("/")), "not a valid entry path")]
    #[case::delete_missing(|c: &mut SitemapController| c.delete("/a/zzz"), "No entry exists")]
    #[case::edit_missing(|c: &mut SitemapController| c.edit("/zzz", Some("t"), None, None), "No entry exists")]
    #[case::move_missing(|c: &mut SitemapController| c.move_entry("/zzz", "/a/zzz", 0), "No entry exists")]
    #[case::move_onto_itself(|c: &mut SitemapController| c.move_entry("/a/b", "/a/b", 0), "already at position 0")]
    #[case::move_into_subtree(|c: &mut SitemapController| c.move_entry("/a", "/a/b/a", 0), "own subtree")]
    #[case::move_without_parent(|c: &mut SitemapController| c.move_entry("/a/b", "/x/b", 0), "Parent folder '/x'")]
    #[case::move_onto_sibling(|c: &mut SitemapController| c.move_entry("/a/b", "/a/c", 0), "already taken")]
    #[case::move_past_the_end(|c: &mut SitemapController| c.move_entry("/a/b", "/a/b", 2), "at most 1")]
    fn precondition_violations_are_signaled(
        #[case] action: fn(&mut SitemapController) -> Result<(), ControllerError>,
        #[case] expected: &str,
    ) {
        let mut session = Session::sample();
        let before = session.controller.tree().clone();

        let err = action(&mut session.controller).expect_err("action should be rejected");

        assert!(
            err.to_string().contains(expected),
            "'{err}' should mention '{expected}'"
        );
        assert_eq!(*session.controller.tree(), before);
        assert!(!session.controller.is_dirty());
        assert!(session.requests().is_empty());
        assert!(session.seen.borrow().is_empty());
    }

    #[test]
    fn move_within_parent_to_new_position() {
        let mut session = Session::sample();
        session
            .controller
            .move_entry("/a/b", "/a/b", 1)
            .expect("move should succeed");

        assert_eq!(
            children_of(session.controller.tree(), "/a"),
            owned(&[("c", 0), ("b", 1)])
        );
    }

    #[test]
    fn successful_commit_flushes_the_log_and_unlocks() {
        let mut session = Session::sample();
        session.controller.create(SitemapEntry::new("/a/x")).expect("create");
        session.controller.create(SitemapEntry::new("/a/y")).expect("create");
        session.requests();

        assert_eq!(session.controller.commit().ok(), Some(true));
        let requests = session.requests();
        assert!(matches!(
            requests.as_slice(),
            [SyncRequest::Save { changes }] if changes.len() == 2
        ));
        assert!(session.controller.is_saving());
        assert!(matches!(
            session.controller.delete("/a/x"),
            Err(ControllerError::SaveInFlight { .. })
        ));
        assert!(matches!(
            session.controller.undo(),
            Err(ControllerError::SaveInFlight { .. })
        ));

        session.endpoint.send_event(SyncEvent::Saved { count: 2 });
        assert_eq!(session.controller.process_sync_events(), 1);

        assert!(!session.controller.is_saving());
        assert!(!session.controller.is_dirty());
        assert!(session.controller.tree().contains("/a/y"));
        assert_eq!(
            session.requests(),
            vec![SyncRequest::Unlock { reload: false }]
        );
        assert_eq!(session.ui.state_of(Control::Save), Some(false));
    }

    #[test]
    fn failed_commit_keeps_local_state() {
        let mut session = Session::sample();
        session.controller.create(SitemapEntry::new("/a/x")).expect("create");
        session.controller.commit().expect("commit");
        session.requests();

        session.endpoint.send_event(SyncEvent::SaveFailed);
        session.controller.process_sync_events();

        assert!(!session.controller.is_saving());
        assert!(session.controller.is_dirty());
        assert!(session.requests().is_empty());
        assert_eq!(session.controller.commit().ok(), Some(true));
    }

    #[test]
    fn commit_on_clean_session_sends_nothing() {
        let mut session = Session::sample();
        assert_eq!(session.controller.commit().ok(), Some(false));
        assert!(session.requests().is_empty());
    }

    #[test]
    fn reset_clears_everything_and_reloads() {
        let mut session = Session::sample();
        session.controller.create(SitemapEntry::new("/a/x")).expect("create");
        session.controller.create(SitemapEntry::new("/a/y")).expect("create");
        session.controller.undo().expect("undo");
        session.requests();

        session.controller.reset();

        assert!(!session.controller.is_dirty());
        assert!(session.controller.undone().is_empty());
        assert_eq!(
            session.requests(),
            vec![SyncRequest::Unlock { reload: true }]
        );

        session.endpoint.send_event(SyncEvent::Reloaded {
            roots: sample_tree().roots().to_vec(),
        });
        session.controller.process_sync_events();
        assert_eq!(*session.controller.tree(), sample_tree());
    }

    #[test]
    fn reset_without_reload_keeps_the_discarded_edits_visible() {
        let mut session = Session::sample();
        session.controller.create(SitemapEntry::new("/a/x")).expect("create");

        session.controller.reset();
        assert_eq!(session.controller.process_sync_events(), 0);

        assert!(!session.controller.is_dirty());
        assert!(session.controller.tree().contains("/a/x"));
        assert_eq!(session.controller.undo().ok(), Some(false));
    }

    #[test]
    fn reload_of_an_empty_sitemap_keeps_the_root_path() {
        let mut session = Session::new(Vec::new());
        session
            .controller
            .set_tree(SitemapTree::with_root_path("/sites/default", Vec::new()));
        session.controller.reset();

        session.endpoint.send_event(SyncEvent::Reloaded { roots: Vec::new() });
        session.controller.process_sync_events();

        assert_eq!(session.controller.tree().root_path(), "/sites/default");
        session
            .controller
            .create(SitemapEntry::new("/sites/default/x"))
            .expect("root accepts new entries");
    }

    #[test]
    fn reset_on_clean_session_still_unlocks() {
        let mut session = Session::sample();
        session.controller.reset();
        assert_eq!(
            session.requests(),
            vec![SyncRequest::Unlock { reload: true }]
        );
    }

    #[test]
    fn late_events_are_ignored() {
        let mut session = Session::sample();
        session.controller.create(SitemapEntry::new("/a/x")).expect("create");

        session.endpoint.send_event(SyncEvent::Saved { count: 1 });
        session.endpoint.send_event(SyncEvent::Reloaded { roots: Vec::new() });
        assert_eq!(session.controller.process_sync_events(), 2);

        assert!(session.controller.is_dirty());
        assert!(session.controller.tree().contains("/a/x"));
    }

    #[test]
    fn stale_redo_is_reported_and_kept() {
        let mut session = Session::sample();
        session.controller.create(SitemapEntry::new("/a/x")).expect("create");
        session.controller.undo().expect("undo");

        let mut server_state = sample_tree();
        server_state
            .append_child("/a", SitemapEntry::new("/a/x"))
            .expect("append");
        session.endpoint.send_event(SyncEvent::Reloaded {
            roots: server_state.roots().to_vec(),
        });
        session.controller.process_sync_events();

        let result = session.controller.redo();

        assert!(matches!(result, Err(ControllerError::StaleReference { .. })));
        assert_eq!(session.controller.undone().len(), 1);
        assert!(!session.controller.is_dirty());
    }

    #[compio::test]
    async fn worker_round_trip_locks_and_unlocks_once() {
        let mut session = Session::sample();
        let (handle, endpoint) = channel();
        let ui = session.ui.clone();
        session.controller = SitemapController::new("/sitemap", ui.clone(), handle);
        session.controller.set_roots(sample_tree().roots().to_vec());
        let mut worker = SyncWorker::new(FakeService::default(), ui.clone(), "/sitemap", endpoint);

        session.controller.create(SitemapEntry::new("/a/x")).expect("create");
        session.controller.edit("/a/x", Some("X"), None, None).expect("edit");
        worker.process_pending().await;
        assert_eq!(ui.state_of(Control::Undo), Some(true));

        session.controller.undo().expect("undo");
        session.controller.undo().expect("undo");
        worker.process_pending().await;
        session.controller.process_sync_events();

        assert_eq!(
            *worker.service().calls.borrow(),
            vec!["lock /sitemap", "unlock /sitemap"]
        );
        assert!(ui.errors().is_empty());
        assert!(
            ui.events()
                .contains(&UiEvent::Enabled(Control::Save, false))
        );
    }
}
