use unicode_segmentation::UnicodeSegmentation;

use crate::model::{Note, NoteFields};

const MAX_HISTORY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Title,
    Content,
}

impl EditField {
    pub fn label(self) -> &'static str {
        match self {
            EditField::Title => "title",
            EditField::Content => "content",
        }
    }

    fn value_of(self, note: &Note) -> String {
        match self {
            EditField::Title => note.title.clone(),
            EditField::Content => note.content.clone(),
        }
        .unwrap_or_default()
    }
}

/// Grapheme-aware buffer over one editable field of an open note.
#[derive(Debug, Clone)]
pub struct EditorState {
    slug: String,
    field: EditField,
    buffer: String,
    cursor: usize,
    preferred_column: Option<usize>,
    history: Vec<String>,
    history_index: usize,
}

impl EditorState {
    pub fn open(note: &Note, field: EditField) -> Self {
        let buffer = field.value_of(note);
        Self {
            slug: note.slug.clone(),
            field,
            cursor: buffer.len(),
            preferred_column: None,
            history: vec![buffer.clone()],
            history_index: 0,
            buffer,
        }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn field(&self) -> EditField {
        self.field
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The buffer as a patch for the field being edited.
    pub fn to_fields(&self) -> NoteFields {
        match self.field {
            EditField::Title => NoteFields::title(self.buffer.clone()),
            EditField::Content => NoteFields::content(self.buffer.clone()),
        }
    }

    /// Replaces the buffer with the store's value when it differs. History restarts.
    pub fn adopt(&mut self, note: &Note) -> bool {
        let value = self.field.value_of(note);
        if value == self.buffer {
            return false;
        }
        self.buffer = value;
        self.cursor = self.cursor.min(self.buffer.len());
        while !self.buffer.is_char_boundary(self.cursor) {
            self.cursor -= 1;
        }
        self.preferred_column = None;
        self.history = vec![self.buffer.clone()];
        self.history_index = 0;
        true
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        self.buffer.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
        self.preferred_column = None;
        self.record_history();
        true
    }

    /// Titles are single-line.
    pub fn insert_newline(&mut self) -> bool {
        if self.field == EditField::Title {
            return false;
        }
        self.buffer.insert(self.cursor, '\n');
        self.cursor += 1;
        self.preferred_column = Some(0);
        self.record_history();
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = prev_grapheme_boundary(&self.buffer, self.cursor);
        self.buffer.drain(prev..self.cursor);
        self.cursor = prev;
        self.preferred_column = None;
        self.record_history();
        true
    }

    pub fn delete(&mut self) -> bool {
        let next = next_grapheme_boundary(&self.buffer, self.cursor);
        if next == self.cursor {
            return false;
        }
        self.buffer.drain(self.cursor..next);
        self.preferred_column = None;
        self.record_history();
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor = prev_grapheme_boundary(&self.buffer, self.cursor);
        self.preferred_column = None;
        true
    }

    pub fn move_right(&mut self) -> bool {
        let next = next_grapheme_boundary(&self.buffer, self.cursor);
        if next == self.cursor {
            return false;
        }
        self.cursor = next;
        self.preferred_column = None;
        true
    }

    pub fn move_home(&mut self) -> bool {
        let start = line_start(&self.buffer, self.cursor);
        if start == self.cursor {
            return false;
        }
        self.cursor = start;
        self.preferred_column = Some(0);
        true
    }

    pub fn move_end(&mut self) -> bool {
        let end = line_end(&self.buffer, self.cursor);
        if end == self.cursor {
            return false;
        }
        self.cursor = end;
        self.preferred_column = None;
        true
    }

    pub fn move_up(&mut self) -> bool {
        let start = line_start(&self.buffer, self.cursor);
        let column = self
            .preferred_column
            .unwrap_or_else(|| column_at(&self.buffer, start, self.cursor));
        if start == 0 {
            return false;
        }
        let prev_start = line_start(&self.buffer, start - 1);
        self.cursor = position_for_column(&self.buffer, prev_start, column);
        self.preferred_column = Some(column);
        true
    }

    pub fn move_down(&mut self) -> bool {
        let start = line_start(&self.buffer, self.cursor);
        let column = self
            .preferred_column
            .unwrap_or_else(|| column_at(&self.buffer, start, self.cursor));
        let end = line_end(&self.buffer, self.cursor);
        if end == self.buffer.len() {
            return false;
        }
        self.cursor = position_for_column(&self.buffer, end + 1, column);
        self.preferred_column = Some(column);
        true
    }

    pub fn undo(&mut self) -> bool {
        if self.history_index == 0 {
            return false;
        }
        self.history_index -= 1;
        self.restore_snapshot();
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.history_index + 1 >= self.history.len() {
            return false;
        }
        self.history_index += 1;
        self.restore_snapshot();
        true
    }

    /// Line and grapheme column of the cursor, for terminal cursor placement.
    pub fn cursor_position(&self) -> (usize, usize) {
        let start = line_start(&self.buffer, self.cursor);
        let line = self.buffer[..start].matches('\n').count();
        (line, column_at(&self.buffer, start, self.cursor))
    }

    fn record_history(&mut self) {
        if self.history.get(self.history_index) == Some(&self.buffer) {
            return;
        }
        self.history.truncate(self.history_index + 1);
        self.history.push(self.buffer.clone());
        if self.history.len() > MAX_HISTORY {
            let overflow = self.history.len() - MAX_HISTORY;
            self.history.drain(0..overflow);
        }
        self.history_index = self.history.len() - 1;
    }

    fn restore_snapshot(&mut self) {
        if let Some(snapshot) = self.history.get(self.history_index) {
            self.buffer = snapshot.clone();
            self.cursor = self.buffer.len();
            self.preferred_column = None;
        }
    }
}

fn prev_grapheme_boundary(text: &str, cursor: usize) -> usize {
    text[..cursor]
        .grapheme_indices(true)
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_grapheme_boundary(text: &str, cursor: usize) -> usize {
    text[cursor..]
        .graphemes(true)
        .next()
        .map(|grapheme| cursor + grapheme.len())
        .unwrap_or(text.len())
}

fn line_start(text: &str, cursor: usize) -> usize {
    text[..cursor].rfind('\n').map(|idx| idx + 1).unwrap_or(0)
}

fn line_end(text: &str, cursor: usize) -> usize {
    text[cursor..]
        .find('\n')
        .map(|idx| cursor + idx)
        .unwrap_or(text.len())
}

fn column_at(text: &str, start: usize, cursor: usize) -> usize {
    text[start..cursor].graphemes(true).count()
}

fn position_for_column(text: &str, start: usize, column: usize) -> usize {
    let end = line_end(text, start);
    text[start..end]
        .grapheme_indices(true)
        .nth(column)
        .map(|(idx, _)| start + idx)
        .unwrap_or(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::private_note;

    fn editing(content: &str, field: EditField) -> EditorState {
        let mut note = private_note("draft", "me", 0);
        note.title = Some("Title".into());
        note.content = Some(content.into());
        EditorState::open(&note, field)
    }

    #[test]
    fn undo_redo_cycles() {
        let mut editor = editing("hello", EditField::Content);
        assert!(editor.insert_char('!'));
        assert_eq!(editor.buffer(), "hello!");
        assert!(editor.undo());
        assert_eq!(editor.buffer(), "hello");
        assert!(!editor.undo());
        assert!(editor.redo());
        assert_eq!(editor.buffer(), "hello!");
        assert!(!editor.redo());
    }

    #[test]
    fn backspace_removes_whole_grapheme() {
        let mut editor = editing("hi 👋🏼", EditField::Content);
        assert!(editor.backspace());
        assert_eq!(editor.buffer(), "hi ");
        assert_eq!(editor.cursor(), 3);
    }

    #[test]
    fn vertical_moves_keep_column() {
        let mut editor = editing("abcdef\nxy\nlonger line", EditField::Content);
        assert!(editor.move_up());
        assert_eq!(editor.cursor_position(), (1, 2));
        assert!(editor.move_up());
        assert_eq!(editor.cursor_position(), (0, 6));
        assert!(editor.move_down());
        assert!(editor.move_down());
        assert_eq!(editor.cursor_position(), (2, 11));
    }

    #[test]
    fn title_rejects_newlines_and_maps_to_title_patch() {
        let mut editor = editing("body", EditField::Title);
        assert!(!editor.insert_newline());
        editor.insert_char('s');
        assert_eq!(editor.to_fields(), NoteFields::title("Titles"));
    }

    #[test]
    fn adopt_replaces_buffer_and_clamps_cursor() {
        let mut editor = editing("a long body", EditField::Content);
        let mut remote = private_note("draft", "me", 0);
        remote.content = Some("short".into());
        assert!(editor.adopt(&remote));
        assert_eq!(editor.buffer(), "short");
        assert_eq!(editor.cursor(), 5);
        assert!(!editor.undo());
        assert!(!editor.adopt(&remote));
    }
}
