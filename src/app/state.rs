use time::OffsetDateTime;

use super::editor::EditorState;
use super::navigator::{Command, KeyInput, Navigator};
use super::palette::PaletteState;
use crate::config::ThemeName;
use crate::model::Note;
use crate::organize::{group, visible_notes, Bucket, NoteGroups};
use crate::pins::PinOverrides;
use crate::sync::SyncStatus;

/// Everything the renderer needs, independent of the terminal.
#[derive(Debug, Clone)]
pub struct AppState {
    session_id: Option<String>,
    notes: Vec<Note>,
    groups: NoteGroups,
    flattened: Vec<String>,
    grouped_on: Option<time::Date>,
    overrides: PinOverrides,
    pub navigator: Navigator,
    editor: Option<EditorState>,
    palette: Option<PaletteState>,
    status_message: Option<String>,
    sync_status: SyncStatus,
    theme: ThemeName,
    fallback_slug: String,
}

impl AppState {
    pub fn new(
        session_id: Option<String>,
        theme: ThemeName,
        fallback_slug: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            notes: Vec::new(),
            groups: NoteGroups::default(),
            flattened: Vec::new(),
            grouped_on: None,
            overrides: PinOverrides::default(),
            navigator: Navigator::default(),
            editor: None,
            palette: None,
            status_message: None,
            sync_status: SyncStatus::Inactive,
            theme,
            fallback_slug: fallback_slug.into(),
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn groups(&self) -> &NoteGroups {
        &self.groups
    }

    pub fn flattened(&self) -> &[String] {
        &self.flattened
    }

    pub fn fallback_slug(&self) -> &str {
        &self.fallback_slug
    }

    pub fn note(&self, slug: &str) -> Option<&Note> {
        self.notes.iter().find(|note| note.slug == slug)
    }

    pub fn selected_note(&self) -> Option<&Note> {
        self.navigator.selected().and_then(|slug| self.note(slug))
    }

    /// The note the right-hand pane shows: highlighted result while searching.
    pub fn focused_note(&self) -> Option<&Note> {
        match self.navigator.highlighted_note() {
            Some(highlighted) => self.note(&highlighted.slug).or(Some(highlighted)),
            None => self.selected_note(),
        }
    }

    pub fn bucket_of(&self, slug: &str) -> Option<&Bucket> {
        self.groups.bucket_of(slug)
    }

    pub fn overrides(&self) -> &PinOverrides {
        &self.overrides
    }

    pub fn overrides_mut(&mut self) -> &mut PinOverrides {
        &mut self.overrides
    }

    pub fn set_overrides(&mut self, overrides: PinOverrides) {
        self.overrides = overrides;
    }

    /// Replaces the collection with what the store returned, keeping only
    /// notes visible to this session, and re-runs an active search.
    pub fn set_notes(&mut self, notes: Vec<Note>, now: OffsetDateTime) {
        self.notes = visible_notes(&notes, self.session_id.as_deref());
        self.regroup(now);
        self.navigator
            .refresh_results(&self.notes, self.session_id.as_deref());
        self.navigator.retain_existing(&self.flattened);
        if self.navigator.selected().is_none() {
            self.select_default();
        }
    }

    /// Applies an optimistic local copy of a single note.
    pub fn replace_note(&mut self, note: Note, now: OffsetDateTime) {
        match self.notes.iter_mut().find(|existing| existing.slug == note.slug) {
            Some(existing) => *existing = note,
            None => self.notes.push(note),
        }
        self.regroup(now);
        self.navigator
            .refresh_results(&self.notes, self.session_id.as_deref());
    }

    pub fn remove_note(&mut self, slug: &str, now: OffsetDateTime) {
        self.notes.retain(|note| note.slug != slug);
        self.regroup(now);
        self.navigator
            .refresh_results(&self.notes, self.session_id.as_deref());
    }

    pub fn regroup(&mut self, now: OffsetDateTime) {
        self.groups = group(&self.notes, &self.overrides, now);
        self.flattened = self.groups.flattened_slugs();
        self.grouped_on = Some(now.date());
    }

    /// Relative buckets shift at local midnight.
    pub fn regroup_if_day_changed(&mut self, now: OffsetDateTime) -> bool {
        if self.grouped_on == Some(now.date()) {
            return false;
        }
        self.regroup(now);
        true
    }

    fn select_default(&mut self) {
        let target = if self.note(&self.fallback_slug).is_some() {
            Some(self.fallback_slug.clone())
        } else {
            self.flattened.first().cloned()
        };
        if let Some(slug) = target {
            self.navigator.select(slug);
        }
    }

    pub fn dispatch(&mut self, key: KeyInput) -> Command {
        self.navigator.dispatch(key, &self.flattened)
    }

    pub fn set_query(&mut self, input: &str) {
        self.navigator
            .set_query(input, &self.notes, self.session_id.as_deref());
    }

    pub fn editor(&self) -> Option<&EditorState> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut EditorState> {
        self.editor.as_mut()
    }

    pub fn is_editing(&self) -> bool {
        self.editor.is_some()
    }

    pub fn begin_editor(&mut self, editor: EditorState) {
        self.editor = Some(editor);
    }

    pub fn close_editor(&mut self) -> Option<EditorState> {
        self.editor.take()
    }

    pub fn palette(&self) -> Option<&PaletteState> {
        self.palette.as_ref()
    }

    pub fn is_palette_open(&self) -> bool {
        self.palette.is_some()
    }

    pub fn open_palette(&mut self) {
        self.palette = Some(PaletteState::open(&self.notes, self.session_id.as_deref()));
    }

    pub fn close_palette(&mut self) -> Option<PaletteState> {
        self.palette.take()
    }

    pub fn palette_push_char(&mut self, ch: char) {
        if let Some(palette) = self.palette.as_mut() {
            palette.push_char(ch, &self.notes, self.session_id.as_deref());
        }
    }

    pub fn palette_pop_char(&mut self) {
        if let Some(palette) = self.palette.as_mut() {
            palette.pop_char(&self.notes, self.session_id.as_deref());
        }
    }

    pub fn palette_mut(&mut self) -> Option<&mut PaletteState> {
        self.palette.as_mut()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    pub fn sync_status(&self) -> &SyncStatus {
        &self.sync_status
    }

    pub fn set_sync_status(&mut self, status: SyncStatus) {
        self.sync_status = status;
    }

    pub fn theme(&self) -> ThemeName {
        self.theme
    }

    pub fn toggle_theme(&mut self) -> ThemeName {
        self.theme = self.theme.toggled();
        self.theme
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{admin_pinned, note, private_note};
    use crate::model::to_millis;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2026-03-10 12:00 UTC);

    fn state_with(notes: Vec<Note>) -> AppState {
        let mut state = AppState::new(Some("me".into()), ThemeName::Dark, "about-me");
        state.set_notes(notes, NOW);
        state
    }

    #[test]
    fn initial_selection_prefers_fallback_slug() {
        let at = to_millis(NOW);
        let state = state_with(vec![
            note("recent", Some(at), at),
            admin_pinned("about-me", Some(0), 0),
        ]);
        assert_eq!(state.navigator.selected(), Some("about-me"));
        assert_eq!(state.flattened(), ["about-me", "recent"]);
    }

    #[test]
    fn initial_selection_falls_back_to_first_note() {
        let at = to_millis(NOW);
        let state = state_with(vec![note("b", Some(at), at), note("a", Some(at - 1), at - 1)]);
        assert_eq!(state.navigator.selected(), Some("b"));
    }

    #[test]
    fn foreign_private_notes_never_enter_the_collection() {
        let at = to_millis(NOW);
        let state = state_with(vec![
            private_note("theirs", "other", at),
            private_note("mine", "me", at),
        ]);
        assert!(state.note("theirs").is_none());
        assert!(state.note("mine").is_some());
    }

    #[test]
    fn replace_note_regroups_and_updates_search() {
        let at = to_millis(NOW);
        let mut state = state_with(vec![note("a", Some(at), at)]);
        state.set_query("fresh");
        assert_eq!(state.navigator.results().map(<[Note]>::len), Some(0));
        let mut edited = note("a", Some(at), at);
        edited.title = Some("fresh title".into());
        state.replace_note(edited, NOW);
        assert_eq!(state.navigator.results().map(<[Note]>::len), Some(1));
    }

    #[test]
    fn regroup_happens_once_per_day() {
        let mut state = state_with(vec![]);
        assert!(!state.regroup_if_day_changed(NOW));
        assert!(state.regroup_if_day_changed(datetime!(2026-03-11 00:01 UTC)));
    }
}
