//! Recorded sitemap changes and the undo/redo log holding them.

mod change;
mod change_log;

pub use change::{Change, ChangeKind};
pub use change_log::ChangeLog;
