use strum::{Display, EnumIter, IntoEnumIterator};

use super::navigator::Direction;
use crate::model::Note;
use crate::search::{filter_notes, SearchQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum PaletteCommand {
    #[strum(to_string = "New note")]
    NewNote,
    #[strum(to_string = "Pin or unpin")]
    TogglePin,
    #[strum(to_string = "Move up")]
    MoveUp,
    #[strum(to_string = "Move down")]
    MoveDown,
    #[strum(to_string = "Delete note")]
    DeleteNote,
    #[strum(to_string = "Toggle theme")]
    ToggleTheme,
}

impl PaletteCommand {
    /// The single-key shortcut that does the same thing from the list.
    pub fn shortcut(self) -> char {
        match self {
            PaletteCommand::NewNote => 'n',
            PaletteCommand::TogglePin => 'p',
            PaletteCommand::MoveUp => 'k',
            PaletteCommand::MoveDown => 'j',
            PaletteCommand::DeleteNote => 'd',
            PaletteCommand::ToggleTheme => 't',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteEntry {
    Command(PaletteCommand),
    Note {
        slug: String,
        label: String,
    },
}

impl PaletteEntry {
    pub fn label(&self) -> String {
        match self {
            PaletteEntry::Command(command) => command.to_string(),
            PaletteEntry::Note { label, .. } => label.clone(),
        }
    }
}

/// Command palette: commands whose name contains the input, then matching notes.
#[derive(Debug, Clone, Default)]
pub struct PaletteState {
    input: String,
    entries: Vec<PaletteEntry>,
    selected: usize,
}

impl PaletteState {
    pub fn open(notes: &[Note], session_id: Option<&str>) -> Self {
        let mut palette = Self::default();
        palette.refilter(notes, session_id);
        palette
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    pub fn selected_index(&self) -> Option<usize> {
        (!self.entries.is_empty()).then_some(self.selected)
    }

    pub fn selected_entry(&self) -> Option<&PaletteEntry> {
        self.entries.get(self.selected)
    }

    pub fn push_char(&mut self, ch: char, notes: &[Note], session_id: Option<&str>) {
        self.input.push(ch);
        self.refilter(notes, session_id);
    }

    pub fn pop_char(&mut self, notes: &[Note], session_id: Option<&str>) -> bool {
        if self.input.pop().is_none() {
            return false;
        }
        self.refilter(notes, session_id);
        true
    }

    pub fn move_selection(&mut self, direction: Direction) {
        let len = self.entries.len();
        if len == 0 {
            return;
        }
        self.selected = match direction {
            Direction::Down => (self.selected + 1) % len,
            Direction::Up => (self.selected + len - 1) % len,
        };
    }

    fn refilter(&mut self, notes: &[Note], session_id: Option<&str>) {
        let needle = self.input.to_lowercase();
        let mut entries: Vec<PaletteEntry> = PaletteCommand::iter()
            .filter(|command| command.to_string().to_lowercase().contains(&needle))
            .map(PaletteEntry::Command)
            .collect();

        let matching = match SearchQuery::parse(&self.input) {
            Some(query) => filter_notes(notes, &query, session_id),
            None => notes
                .iter()
                .filter(|note| note.is_visible_to(session_id))
                .cloned()
                .collect(),
        };
        entries.extend(matching.into_iter().map(|note| PaletteEntry::Note {
            label: format!("{} {}", note.display_emoji(), note.display_title()),
            slug: note.slug,
        }));

        self.entries = entries;
        self.selected = 0;
    }
}
