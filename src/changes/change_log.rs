use crate::changes::Change;

/// Applied and undone changes of one edit session.
///
/// Both sequences are stacks: the last element is the most recent one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeLog {
    applied: Vec<Change>,
    undone: Vec<Change>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an applied change. A forward (non-redo) change discards the
    /// redo history.
    pub fn push_applied(&mut self, change: Change, redo: bool) {
        if !redo {
            self.undone.clear();
        }
        self.applied.push(change);
    }

    pub fn pop_applied(&mut self) -> Option<Change> {
        self.applied.pop()
    }

    pub fn push_undone(&mut self, change: Change) {
        self.undone.push(change);
    }

    pub fn pop_undone(&mut self) -> Option<Change> {
        self.undone.pop()
    }

    pub fn applied(&self) -> &[Change] {
        &self.applied
    }

    pub fn undone(&self) -> &[Change] {
        &self.undone
    }

    pub fn is_dirty(&self) -> bool {
        !self.applied.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    pub fn clear_applied(&mut self) {
        self.applied.clear();
    }

    pub fn clear(&mut self) {
        self.applied.clear();
        self.undone.clear();
    }
}
