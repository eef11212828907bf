//! The field's text node
//!
//! A combobox owns exactly one text node. It holds the filter text in filter
//! mode and mirrors the selected label otherwise. The node is owned by the
//! field and handed out as `&FieldText`, so it cannot be replaced or removed
//! from outside.
//!
//! Positions are character indices, not byte offsets.

use serde::{Deserialize, Serialize};

/// Kind of text mutation, as reported on `input` events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputType {
    InsertText,
    InsertFromPaste,
    InsertReplacementText,
    DeleteContentBackward,
    DeleteContentForward,
    DeleteByCut,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::InsertText => "insertText",
            InputType::InsertFromPaste => "insertFromPaste",
            InputType::InsertReplacementText => "insertReplacementText",
            InputType::DeleteContentBackward => "deleteContentBackward",
            InputType::DeleteContentForward => "deleteContentForward",
            InputType::DeleteByCut => "deleteByCut",
        }
    }
}

/// A user edit to the text node
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum TextEdit {
    /// Typed text replacing the selection
    Insert(String),
    /// Pasted text replacing the selection
    Paste(String),
    /// Backspace
    DeleteBackward,
    /// Delete
    DeleteForward,
    /// Cut the selection
    Cut,
    /// Replace the whole text (autocomplete, IME commit)
    ReplaceAll(String),
}

impl TextEdit {
    /// Shorthand for typed text
    pub fn insert(text: impl Into<String>) -> Self {
        TextEdit::Insert(text.into())
    }

    pub fn input_type(&self) -> InputType {
        match self {
            TextEdit::Insert(_) => InputType::InsertText,
            TextEdit::Paste(_) => InputType::InsertFromPaste,
            TextEdit::DeleteBackward => InputType::DeleteContentBackward,
            TextEdit::DeleteForward => InputType::DeleteContentForward,
            TextEdit::Cut => InputType::DeleteByCut,
            TextEdit::ReplaceAll(_) => InputType::InsertReplacementText,
        }
    }
}

/// What an applied edit looked like, for `input` event payloads
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRecord {
    /// Inserted text for typed input
    pub data: Option<String>,
    /// Transferred text for paste and replacement
    pub data_transfer: Option<String>,
    pub input_type: InputType,
}

impl InputRecord {
    pub fn new(input_type: InputType) -> Self {
        Self {
            data: None,
            data_transfer: None,
            input_type,
        }
    }

    /// Record for a programmatic replacement of the whole text
    pub fn replacement(text: &str) -> Self {
        Self {
            data: None,
            data_transfer: Some(text.to_string()),
            input_type: InputType::InsertReplacementText,
        }
    }
}

/// Text content plus caret and selection
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldText {
    data: String,
    /// Caret position (character index)
    cursor: usize,
    /// Selection anchor, if selecting
    selection_start: Option<usize>,
}

impl FieldText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        let data: String = text.into();
        let cursor = data.chars().count();
        Self {
            data,
            cursor,
            selection_start: None,
        }
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len_chars(&self) -> usize {
        self.data.chars().count()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Ordered `(start, end)` of the selection; equal when collapsed
    pub fn selection(&self) -> (usize, usize) {
        match self.selection_start {
            Some(anchor) if anchor < self.cursor => (anchor, self.cursor),
            Some(anchor) => (self.cursor, anchor),
            None => (self.cursor, self.cursor),
        }
    }

    /// Selected text, if any
    pub fn selected_text(&self) -> Option<String> {
        let (from, to) = self.selection();
        (from != to).then(|| self.data.chars().skip(from).take(to - from).collect())
    }

    /// Place the selection; out-of-range positions are clamped
    pub fn set_selection(&mut self, start: usize, end: usize) {
        let len = self.len_chars();
        let start = start.min(len);
        let end = end.min(len);
        self.cursor = end;
        self.selection_start = (start != end).then_some(start);
    }

    pub fn select_all(&mut self) {
        self.set_selection(0, self.len_chars());
    }

    pub fn move_to_end(&mut self) {
        self.cursor = self.len_chars();
        self.selection_start = None;
    }

    /// Replace the whole text without producing an edit record.
    /// The caret collapses to the end. Returns `false` if unchanged.
    pub fn replace(&mut self, text: &str) -> bool {
        if self.data == text {
            return false;
        }
        self.data = text.to_string();
        self.move_to_end();
        true
    }

    /// Apply a user edit. Returns `None` if the text did not change.
    pub fn apply(&mut self, edit: &TextEdit) -> Option<InputRecord> {
        let before = self.data.clone();
        let mut record = InputRecord::new(edit.input_type());

        match edit {
            TextEdit::Insert(text) => {
                self.insert(text);
                record.data = Some(text.clone());
            }
            TextEdit::Paste(text) => {
                self.insert(text);
                record.data_transfer = Some(text.clone());
            }
            TextEdit::DeleteBackward => self.delete_backward(),
            TextEdit::DeleteForward => self.delete_forward(),
            TextEdit::Cut => {
                self.delete_selection();
            }
            TextEdit::ReplaceAll(text) => {
                self.replace(text);
                record.data_transfer = Some(text.clone());
            }
        }

        (self.data != before).then_some(record)
    }

    fn insert(&mut self, text: &str) {
        self.delete_selection();
        let byte_pos = self.char_to_byte(self.cursor);
        self.data.insert_str(byte_pos, text);
        self.cursor += text.chars().count();
    }

    fn delete_backward(&mut self) {
        if self.delete_selection() {
            return;
        }
        if self.cursor > 0 {
            let start = self.char_to_byte(self.cursor - 1);
            let end = self.char_to_byte(self.cursor);
            self.data.replace_range(start..end, "");
            self.cursor -= 1;
        }
    }

    fn delete_forward(&mut self) {
        if self.delete_selection() {
            return;
        }
        if self.cursor < self.len_chars() {
            let start = self.char_to_byte(self.cursor);
            let end = self.char_to_byte(self.cursor + 1);
            self.data.replace_range(start..end, "");
        }
    }

    /// Delete the selection, returns true if there was one
    fn delete_selection(&mut self) -> bool {
        let (from, to) = self.selection();
        self.selection_start = None;
        if from == to {
            return false;
        }
        let start = self.char_to_byte(from);
        let end = self.char_to_byte(to);
        self.data.replace_range(start..end, "");
        self.cursor = from;
        true
    }

    fn char_to_byte(&self, char_pos: usize) -> usize {
        self.data
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_selection() {
        let mut text = FieldText::with_text("Seventh");
        text.set_selection(5, 7);
        let record = text.apply(&TextEdit::insert("n")).unwrap();
        assert_eq!(text.data(), "Sevenn");
        assert_eq!(text.cursor(), 6);
        assert_eq!(record.data.as_deref(), Some("n"));
        assert_eq!(record.input_type, InputType::InsertText);
    }

    #[test]
    fn test_backspace_multibyte() {
        let mut text = FieldText::with_text("Zürich");
        text.set_selection(2, 2);
        text.apply(&TextEdit::DeleteBackward).unwrap();
        assert_eq!(text.data(), "Zrich");
        assert_eq!(text.cursor(), 1);
    }

    #[test]
    fn test_noop_edits_yield_no_record() {
        let mut text = FieldText::new();
        assert!(text.apply(&TextEdit::DeleteBackward).is_none());
        assert!(text.apply(&TextEdit::Cut).is_none());

        let mut text = FieldText::with_text("abc");
        assert!(text.apply(&TextEdit::DeleteForward).is_none());
        assert!(text.apply(&TextEdit::ReplaceAll("abc".into())).is_none());
    }

    #[test]
    fn test_paste_reports_data_transfer() {
        let mut text = FieldText::new();
        let record = text.apply(&TextEdit::Paste("One".into())).unwrap();
        assert_eq!(record.data, None);
        assert_eq!(record.data_transfer.as_deref(), Some("One"));
        assert_eq!(record.input_type.as_str(), "insertFromPaste");
    }

    #[test]
    fn test_selection_is_clamped_and_ordered() {
        let mut text = FieldText::with_text("abc");
        text.set_selection(2, 99);
        assert_eq!(text.selection(), (2, 3));
        assert_eq!(text.selected_text().as_deref(), Some("c"));

        text.select_all();
        text.apply(&TextEdit::Cut).unwrap();
        assert!(text.is_empty());
        assert_eq!(text.selection(), (0, 0));
    }

    #[test]
    fn test_replace_collapses_caret_to_end() {
        let mut text = FieldText::with_text("ab");
        text.set_selection(0, 1);
        assert!(text.replace("Two"));
        assert_eq!(text.selection(), (3, 3));
        assert!(!text.replace("Two"));
    }
}
