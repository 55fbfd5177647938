//! Editing surface abstraction.
//!
//! The synchronization logic never touches a concrete widget. It talks to an
//! [`EditorSurface`]: something that holds text, can be overwritten, accepts
//! positional edit batches, and reports the edits a user made since the last
//! poll. [`TextBuffer`] is the in-memory implementation used by the terminal
//! client and by tests.

use crate::shared::crdt::{byte_index, utf16_len, EditOp};

/// A text widget the session mirrors the shared buffer into
pub trait EditorSurface {
    /// Full current text
    fn value(&self) -> String;

    /// Replace the whole text
    fn set_value(&mut self, text: &str);

    /// Apply edits one after another, each in the coordinates left by the
    /// previous one
    fn execute_edits(&mut self, edits: &[EditOp]);

    /// Edit batches recorded since the last call, oldest first
    ///
    /// Each batch uses the coordinates of the text as it was before that batch.
    fn take_changes(&mut self) -> Vec<Vec<EditOp>>;
}

/// In-memory editing surface
///
/// Every mutation, including programmatic ones, is recorded as a change
/// batch, the same way a widget fires change events for API writes. Callers
/// decide whether to act on them.
#[derive(Debug, Default, Clone)]
pub struct TextBuffer {
    text: String,
    changes: Vec<Vec<EditOp>>,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer with initial text and no recorded changes
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            changes: Vec::new(),
        }
    }

    /// Simulate one user action touching several regions at once
    ///
    /// All edits are in the coordinates of the text before the action and must
    /// not overlap. They are recorded as a single batch.
    pub fn apply_user_edit(&mut self, edits: Vec<EditOp>) {
        let edits: Vec<EditOp> = edits.into_iter().filter(|e| !e.is_noop()).collect();
        if edits.is_empty() {
            return;
        }
        let mut ordered: Vec<&EditOp> = edits.iter().collect();
        ordered.sort_by(|a, b| b.offset.cmp(&a.offset));
        for edit in ordered {
            splice(&mut self.text, edit);
        }
        self.changes.push(edits);
    }

    /// Type text at a position
    pub fn type_at(&mut self, offset: usize, text: &str) {
        self.apply_user_edit(vec![EditOp::insert(offset, text)]);
    }

    /// Append text at the end
    pub fn append(&mut self, text: &str) {
        let end = utf16_len(&self.text);
        self.type_at(end, text);
    }
}

impl EditorSurface for TextBuffer {
    fn value(&self) -> String {
        self.text.clone()
    }

    fn set_value(&mut self, text: &str) {
        if self.text == text {
            return;
        }
        let previous = utf16_len(&self.text);
        self.text = text.to_string();
        self.changes.push(vec![EditOp::replace(0, previous, text)]);
    }

    fn execute_edits(&mut self, edits: &[EditOp]) {
        for edit in edits.iter().filter(|e| !e.is_noop()) {
            splice(&mut self.text, edit);
            self.changes.push(vec![edit.clone()]);
        }
    }

    fn take_changes(&mut self) -> Vec<Vec<EditOp>> {
        std::mem::take(&mut self.changes)
    }
}

fn splice(text: &mut String, edit: &EditOp) {
    let start = byte_index(text, edit.offset);
    let end = byte_index(text, edit.offset + edit.delete_len).max(start);
    text.replace_range(start..end, &edit.insert);
}
