use derive_more::Display;

use crate::changes::Change;

/// How a change reached the tree mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ChangeDirection {
    #[display("applied")]
    Applied,
    #[display("undone")]
    Undone,
    #[display("redone")]
    Redone,
}

/// View-refresh observer, called synchronously after every apply, undo and redo.
pub trait ChangeListener {
    fn on_change(&mut self, change: &Change, direction: ChangeDirection);
}

impl<F> ChangeListener for F
where
    F: FnMut(&Change, ChangeDirection),
{
    fn on_change(&mut self, change: &Change, direction: ChangeDirection) {
        self(change, direction)
    }
}
