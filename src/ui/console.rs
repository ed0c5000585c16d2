use std::cell::RefCell;
use std::collections::HashMap;

use colored::{ColoredString, Colorize};
use tracing::{debug, error};

use crate::changes::{Change, ChangeKind};
use crate::controller::{ChangeDirection, ChangeListener};
use crate::sitemap::{SitemapEntry, SitemapTree};
use crate::ui::{Control, EditorUi};

/// Terminal implementation of [`EditorUi`].
#[derive(Debug, Default)]
pub struct ConsoleUi {
    controls: RefCell<HashMap<Control, bool>>,
}

impl ConsoleUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self, control: Control) -> bool {
        self.controls
            .borrow()
            .get(&control)
            .copied()
            .unwrap_or(false)
    }

    /// One-line summary like `[save] [reset] [undo] redo`, enabled controls bracketed.
    pub fn render_controls(&self) -> String {
        Control::ALL
            .iter()
            .map(|control| {
                if self.is_enabled(*control) {
                    format!("[{control}]").bold().to_string()
                } else {
                    control.to_string().dimmed().to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl EditorUi for ConsoleUi {
    fn set_enabled(&self, control: Control, enabled: bool) {
        let previous = self.controls.borrow_mut().insert(control, enabled);
        if previous != Some(enabled) {
            debug!(
                "Control '{}' {}",
                control,
                if enabled { "enabled" } else { "disabled" }
            );
        }
    }

    fn show_error(&self, title: &str, message: &str) {
        error!("{}: {}", title, message);
        eprintln!("{} {}", format!("{title}:").red().bold(), message);
    }
}

/// View listener printing every change to stdout.
#[derive(Debug, Default)]
pub struct ConsoleChangePrinter;

impl ConsoleChangePrinter {
    pub fn new() -> Self {
        Self
    }
}

impl ChangeListener for ConsoleChangePrinter {
    fn on_change(&mut self, change: &Change, direction: ChangeDirection) {
        println!("{:>7} {}", direction.to_string().bold(), paint(change));
    }
}

fn paint(change: &Change) -> ColoredString {
    let text = change.to_string();
    match change.kind() {
        ChangeKind::New => text.green(),
        ChangeKind::Delete => text.red(),
        ChangeKind::Edit => text.yellow(),
        ChangeKind::Move => text.cyan(),
    }
}

/// Renders the mirror as an indented outline, one entry per line.
pub fn render_tree(tree: &SitemapTree) -> String {
    let mut out = format!("{}\n", tree.root_path().bold());
    for root in tree.roots() {
        render_entry(root, 1, &mut out);
    }
    out
}

fn render_entry(entry: &SitemapEntry, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(&format!("{} {}", entry.position(), entry.name()));
    if !entry.title().is_empty() {
        out.push_str(&format!(" \"{}\"", entry.title()));
    }
    if !entry.vfs_reference().is_empty() {
        out.push_str(&format!(" -> {}", entry.vfs_reference().dimmed()));
    }
    if !entry.properties().is_empty() {
        let properties = entry
            .properties()
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!(" {{{}}}", properties.italic()));
    }
    out.push('\n');
    for child in entry.children() {
        render_entry(child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sitemap::sample_tree;

    #[test]
    fn control_state_defaults_to_disabled() {
        let ui = ConsoleUi::new();
        assert!(!ui.is_enabled(Control::Save));

        ui.set_enabled(Control::Save, true);
        assert!(ui.is_enabled(Control::Save));
        assert!(!ui.is_enabled(Control::Redo));
    }

    #[test]
    fn render_tree_lists_every_entry() {
        colored::control::set_override(false);
        let rendered = render_tree(&sample_tree());

        assert!(rendered.starts_with("/\n"));
        assert!(rendered.contains("  0 a \"A\"\n"));
        assert!(rendered.contains("    0 b \"B\" -> /sites/default/b.html\n"));
        assert!(rendered.contains("      1 b2 \"B2\"\n"));
        assert!(rendered.contains("  1 d \"D\"\n"));
    }

    #[test]
    fn render_tree_shows_properties() {
        colored::control::set_override(false);
        let tree = SitemapTree::with_root_path("/", vec![
            SitemapEntry::new("/p")
                .with_property("template", "wide")
                .with_property("nav", "hidden"),
        ]);

        assert!(render_tree(&tree).contains("  0 p {nav=hidden, template=wide}\n"));
    }
}
