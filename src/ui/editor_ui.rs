use derive_more::Display;

/// Toolbar controls whose availability follows the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Control {
    #[display("save")]
    Save,
    #[display("reset")]
    Reset,
    #[display("undo")]
    Undo,
    #[display("redo")]
    Redo,
}

impl Control {
    pub const ALL: [Control; 4] = [Control::Save, Control::Reset, Control::Undo, Control::Redo];
}

/// Side channel into the editor's user interface.
///
/// Shared between the controller and the sync worker, hence `&self`.
pub trait EditorUi {
    fn set_enabled(&self, control: Control, enabled: bool);
    fn show_error(&self, title: &str, message: &str);
}
