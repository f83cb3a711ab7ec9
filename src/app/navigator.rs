use bitflags::bitflags;

use crate::model::Note;
use crate::search::{filter_notes, SearchQuery};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CONTROL = 0b0010;
        const ALT = 0b0100;
        const SUPER = 0b1000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Char(char),
    Up,
    Down,
    Enter,
    Esc,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyInput {
    pub fn plain(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
        }
    }

    pub fn ctrl(ch: char) -> Self {
        Self {
            code: KeyCode::Char(ch),
            modifiers: Modifiers::CONTROL,
        }
    }

    fn has_command_modifier(&self) -> bool {
        self.modifiers
            .intersects(Modifiers::CONTROL | Modifiers::ALT | Modifiers::SUPER)
    }
}

/// Ctrl+K, or Cmd+K where the terminal reports it.
pub fn is_palette_shortcut(key: &KeyInput) -> bool {
    matches!(key.code, KeyCode::Char('k') | KeyCode::Char('K'))
        && key.modifiers.intersects(Modifiers::CONTROL | Modifiers::SUPER)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    SearchInput,
    Editor,
}

impl Focus {
    pub fn is_text_input(self) -> bool {
        !matches!(self, Focus::List)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Searching { results: Vec<Note>, highlighted: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavOutcome {
    Moved(String),
    /// Selection was not in the list; carries what the fallback chose.
    Fallback(Option<String>),
    Suppressed,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeOutcome {
    Blurred,
    Cleared,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteDecision {
    /// First request for this note; nothing deleted yet.
    Confirm(String),
    Proceed(String),
}

/// At most one note is armed for deletion at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteGuard {
    armed: Option<String>,
}

impl DeleteGuard {
    pub fn request(&mut self, slug: &str) -> DeleteDecision {
        if self.armed.as_deref() == Some(slug) {
            self.armed = None;
            DeleteDecision::Proceed(slug.to_string())
        } else {
            self.armed = Some(slug.to_string());
            DeleteDecision::Confirm(slug.to_string())
        }
    }

    pub fn armed(&self) -> Option<&str> {
        self.armed.as_deref()
    }

    pub fn disarm(&mut self) {
        self.armed = None;
    }
}

/// What a key press asks the surrounding shell to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ignored,
    /// Key belongs to the focused text input.
    Typing,
    Blurred,
    SearchCleared,
    HighlightMoved,
    Select(String),
    TogglePin(String),
    Delete(String),
    FocusSearch,
    ToggleTheme,
    TogglePalette,
    NewNote,
    EditContent(String),
    EditTitle(String),
    Quit,
}

/// Selection, search and keyboard focus for the grouped note list.
#[derive(Debug, Clone)]
pub struct Navigator {
    selected: Option<String>,
    focus: Focus,
    query_input: String,
    search: SearchState,
    delete_guard: DeleteGuard,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Navigator {
    pub fn new(selected: Option<String>) -> Self {
        Self {
            selected,
            focus: Focus::List,
            query_input: String::new(),
            search: SearchState::Idle,
            delete_guard: DeleteGuard::default(),
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn select(&mut self, slug: impl Into<String>) {
        self.selected = Some(slug.into());
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
    }

    pub fn query_input(&self) -> &str {
        &self.query_input
    }

    pub fn search_state(&self) -> &SearchState {
        &self.search
    }

    pub fn is_searching(&self) -> bool {
        matches!(self.search, SearchState::Searching { .. })
    }

    pub fn results(&self) -> Option<&[Note]> {
        match &self.search {
            SearchState::Idle => None,
            SearchState::Searching { results, .. } => Some(results),
        }
    }

    pub fn has_results(&self) -> bool {
        self.results().map(|r| !r.is_empty()).unwrap_or(false)
    }

    pub fn highlighted_index(&self) -> Option<usize> {
        match &self.search {
            SearchState::Searching {
                results,
                highlighted,
            } if !results.is_empty() => Some(*highlighted),
            _ => None,
        }
    }

    pub fn highlighted_note(&self) -> Option<&Note> {
        match &self.search {
            SearchState::Searching {
                results,
                highlighted,
            } => results.get(*highlighted),
            SearchState::Idle => None,
        }
    }

    /// Highlighted search result when there is one, otherwise the selection.
    pub fn target_slug(&self) -> Option<&str> {
        self.highlighted_note()
            .map(|note| note.slug.as_str())
            .or(self.selected.as_deref())
    }

    pub fn delete_guard(&self) -> &DeleteGuard {
        &self.delete_guard
    }

    /// Blank input returns to idle and yields `None`; otherwise the fresh
    /// result set with the highlight reset to the first entry.
    pub fn set_query(
        &mut self,
        input: &str,
        notes: &[Note],
        session_id: Option<&str>,
    ) -> Option<&[Note]> {
        self.query_input = input.to_string();
        match SearchQuery::parse(input) {
            None => {
                self.search = SearchState::Idle;
                None
            }
            Some(query) => {
                self.search = SearchState::Searching {
                    results: filter_notes(notes, &query, session_id),
                    highlighted: 0,
                };
                self.results()
            }
        }
    }

    /// Re-runs the active query against a changed collection, keeping the
    /// highlight on the same note when it is still present.
    pub fn refresh_results(&mut self, notes: &[Note], session_id: Option<&str>) {
        let Some(query) = SearchQuery::parse(&self.query_input) else {
            return;
        };
        let previous = self.highlighted_note().map(|note| note.slug.clone());
        let results = filter_notes(notes, &query, session_id);
        let highlighted = previous
            .and_then(|slug| results.iter().position(|note| note.slug == slug))
            .unwrap_or(0);
        self.search = SearchState::Searching {
            results,
            highlighted,
        };
    }

    pub fn clear_search(&mut self) {
        self.query_input.clear();
        self.search = SearchState::Idle;
    }

    pub fn move_highlight(&mut self, direction: Direction) -> bool {
        let SearchState::Searching {
            results,
            highlighted,
        } = &mut self.search
        else {
            return false;
        };
        if results.is_empty() {
            return false;
        }
        *highlighted = step(*highlighted, results.len(), direction);
        true
    }

    /// Moves the selection through `flattened` with wraparound. Suppressed
    /// while searching. When the selection is not in the list, `fallback`
    /// decides the new selection.
    pub fn navigate_sequential<F>(
        &mut self,
        direction: Direction,
        flattened: &[String],
        fallback: F,
    ) -> NavOutcome
    where
        F: FnOnce(Direction, &[String]) -> Option<String>,
    {
        if self.is_searching() {
            return NavOutcome::Suppressed;
        }
        if flattened.is_empty() {
            return NavOutcome::Empty;
        }
        let current = self
            .selected
            .as_deref()
            .and_then(|slug| flattened.iter().position(|candidate| candidate == slug));
        match current {
            Some(index) => {
                let next = flattened[step(index, flattened.len(), direction)].clone();
                self.selected = Some(next.clone());
                NavOutcome::Moved(next)
            }
            None => {
                let chosen = fallback(direction, flattened);
                if let Some(slug) = &chosen {
                    self.selected = Some(slug.clone());
                }
                NavOutcome::Fallback(chosen)
            }
        }
    }

    pub fn confirm_highlighted(&mut self) -> Option<String> {
        let slug = self.highlighted_note()?.slug.clone();
        self.selected = Some(slug.clone());
        self.clear_search();
        self.focus = Focus::List;
        Some(slug)
    }

    /// First press leaves a text input and keeps the query; a later press
    /// outside the input clears a non-empty query.
    pub fn escape(&mut self) -> EscapeOutcome {
        if self.focus.is_text_input() {
            self.focus = Focus::List;
            return EscapeOutcome::Blurred;
        }
        if !self.query_input.is_empty() {
            self.clear_search();
            return EscapeOutcome::Cleared;
        }
        EscapeOutcome::Ignored
    }

    pub fn request_delete(&mut self, slug: &str) -> DeleteDecision {
        self.delete_guard.request(slug)
    }

    pub fn disarm_delete(&mut self) {
        self.delete_guard.disarm();
    }

    /// Picks the neighbour of a deleted note from the pre-delete order and
    /// resets search.
    pub fn after_delete(
        &mut self,
        deleted: &str,
        flattened_before: &[String],
        fallback_slug: &str,
    ) {
        let next = neighbor_after_delete(flattened_before, deleted)
            .unwrap_or_else(|| fallback_slug.to_string());
        self.selected = Some(next);
        self.clear_search();
        if self.delete_guard.armed() == Some(deleted) {
            self.delete_guard.disarm();
        }
    }

    /// Drops delete arming for notes that no longer exist.
    pub fn retain_existing(&mut self, slugs: &[String]) {
        if let Some(armed) = self.delete_guard.armed() {
            if !slugs.iter().any(|slug| slug == armed) {
                self.delete_guard.disarm();
            }
        }
    }

    pub fn dispatch(&mut self, key: KeyInput, flattened: &[String]) -> Command {
        if is_palette_shortcut(&key) {
            return Command::TogglePalette;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(Modifiers::CONTROL) {
            return Command::Quit;
        }

        if self.focus.is_text_input() {
            return match key.code {
                KeyCode::Esc => {
                    self.escape();
                    Command::Blurred
                }
                KeyCode::Enter if self.focus == Focus::SearchInput && self.has_results() => self
                    .confirm_highlighted()
                    .map(Command::Select)
                    .unwrap_or(Command::Ignored),
                _ => Command::Typing,
            };
        }

        if key.has_command_modifier() {
            return Command::Ignored;
        }

        match key.code {
            KeyCode::Esc => match self.escape() {
                EscapeOutcome::Cleared => Command::SearchCleared,
                _ => Command::Ignored,
            },
            KeyCode::Enter => self
                .confirm_highlighted()
                .map(Command::Select)
                .unwrap_or(Command::Ignored),
            KeyCode::Char('j') | KeyCode::Down => self.navigate_key(Direction::Down, flattened),
            KeyCode::Char('k') | KeyCode::Up => self.navigate_key(Direction::Up, flattened),
            KeyCode::Char('p') => self
                .target_slug()
                .map(|slug| Command::TogglePin(slug.to_string()))
                .unwrap_or(Command::Ignored),
            KeyCode::Char('d') => self
                .target_slug()
                .map(|slug| Command::Delete(slug.to_string()))
                .unwrap_or(Command::Ignored),
            KeyCode::Char('/') => {
                self.focus = Focus::SearchInput;
                Command::FocusSearch
            }
            KeyCode::Char('t') => Command::ToggleTheme,
            KeyCode::Char('n') => Command::NewNote,
            KeyCode::Char('e') => self
                .selected
                .clone()
                .map(Command::EditContent)
                .unwrap_or(Command::Ignored),
            KeyCode::Char('r') => self
                .selected
                .clone()
                .map(Command::EditTitle)
                .unwrap_or(Command::Ignored),
            KeyCode::Char('q') => Command::Quit,
            _ => Command::Ignored,
        }
    }

    fn navigate_key(&mut self, direction: Direction, flattened: &[String]) -> Command {
        if self.has_results() {
            self.move_highlight(direction);
            return Command::HighlightMoved;
        }
        match self.navigate_sequential(direction, flattened, edge_fallback) {
            NavOutcome::Moved(slug) | NavOutcome::Fallback(Some(slug)) => Command::Select(slug),
            _ => Command::Ignored,
        }
    }
}

/// Down lands on the first entry, up on the last.
pub fn edge_fallback(direction: Direction, flattened: &[String]) -> Option<String> {
    match direction {
        Direction::Down => flattened.first().cloned(),
        Direction::Up => flattened.last().cloned(),
    }
}

/// Previous entry, or the next one when the deleted note was first.
pub fn neighbor_after_delete(flattened: &[String], deleted: &str) -> Option<String> {
    let index = flattened.iter().position(|slug| slug == deleted)?;
    if index > 0 {
        return flattened.get(index - 1).cloned();
    }
    flattened.get(1).cloned()
}

fn step(index: usize, len: usize, direction: Direction) -> usize {
    match direction {
        Direction::Down => (index + 1) % len,
        Direction::Up => (index + len - 1) % len,
    }
}
