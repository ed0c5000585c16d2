//! User interface collaborators of the controller.

mod console;
mod editor_ui;
#[cfg(test)]
mod recording;

pub use console::{ConsoleChangePrinter, ConsoleUi, render_tree};
pub use editor_ui::{Control, EditorUi};
#[cfg(test)]
pub(crate) use recording::{RecordingUi, UiEvent};
