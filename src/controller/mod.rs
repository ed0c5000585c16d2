//! The sitemap edit controller: change creation, undo/redo and the
//! lock/unlock protocol around them.

mod controller;
mod listener;

pub use controller::{ControllerError, SitemapController};
pub use listener::{ChangeDirection, ChangeListener};
