use std::cell::RefCell;

use crate::ui::{Control, EditorUi};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UiEvent {
    Enabled(Control, bool),
    Error { title: String, message: String },
}

/// Test double remembering everything sent to the UI.
#[derive(Debug, Default)]
pub(crate) struct RecordingUi {
    events: RefCell<Vec<UiEvent>>,
}

impl RecordingUi {
    pub(crate) fn events(&self) -> Vec<UiEvent> {
        self.events.borrow().clone()
    }

    pub(crate) fn errors(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                UiEvent::Error { message, .. } => Some(message.clone()),
                UiEvent::Enabled(..) => None,
            })
            .collect()
    }

    /// Last state set for `control`, `None` when it was never touched.
    pub(crate) fn state_of(&self, control: Control) -> Option<bool> {
        self.events
            .borrow()
            .iter()
            .rev()
            .find_map(|event| match event {
                UiEvent::Enabled(c, enabled) if *c == control => Some(*enabled),
                _ => None,
            })
    }

    pub(crate) fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl EditorUi for RecordingUi {
    fn set_enabled(&self, control: Control, enabled: bool) {
        self.events
            .borrow_mut()
            .push(UiEvent::Enabled(control, enabled));
    }

    fn show_error(&self, title: &str, message: &str) {
        self.events.borrow_mut().push(UiEvent::Error {
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}
