use std::collections::HashSet;
use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, Event, KeyCode as TermKey, KeyEvent, KeyEventKind, KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::config::themes::ThemeRegistry;
use crate::config::AppConfig;
use crate::local::{self, KeyValueStore};
use crate::model::local_now;
use crate::pins::{OverrideSet, PinOverrides};
use crate::storage::{NoteFeed, NoteStore, StorageHandle};
use crate::sync::{EditSyncQueue, SyncEvent};
use crate::ui;

mod actions;
pub mod editor;
pub mod navigator;
pub mod palette;
pub mod state;

pub use actions::ActionDispatcher;
pub use editor::{EditField, EditorState};
pub use navigator::{
    Command, DeleteDecision, DeleteGuard, Direction, EscapeOutcome, Focus, KeyCode, KeyInput,
    Modifiers, NavOutcome, Navigator, SearchState,
};
pub use palette::{PaletteCommand, PaletteEntry, PaletteState};
pub use state::AppState;

pub struct App<S: NoteStore = StorageHandle> {
    config: Arc<AppConfig>,
    store: S,
    feed: Option<NoteFeed>,
    kv: Box<dyn KeyValueStore>,
    state: AppState,
    sync: EditSyncQueue,
    themes: ThemeRegistry,
    list_state: ListState,
    should_quit: bool,
    tick_rate: Duration,
}

impl App<StorageHandle> {
    /// Subscribes to the store's change feed before the first fetch so no
    /// mutation between load and the first tick is missed.
    pub fn new(
        config: Arc<AppConfig>,
        storage: StorageHandle,
        kv: Box<dyn KeyValueStore>,
    ) -> Result<Self> {
        let feed = storage.subscribe();
        Self::with_store(config, storage, Some(feed), kv)
    }
}

impl<S: NoteStore> App<S> {
    pub fn with_store(
        config: Arc<AppConfig>,
        store: S,
        feed: Option<NoteFeed>,
        mut kv: Box<dyn KeyValueStore>,
    ) -> Result<Self> {
        let session_id = local::session_id(kv.as_mut()).context("resolving session identity")?;
        let notes = ActionDispatcher::new(&store, Some(&session_id))
            .fetch_visible()
            .context("loading notes for initial state")?;
        let overrides = PinOverrides::load(
            kv.as_mut(),
            &notes,
            Some(&session_id),
            &config.pins.default_slugs,
        )
        .context("loading pin overrides")?;

        let mut state = AppState::new(
            Some(session_id),
            config.theme,
            config.navigation.fallback_slug.clone(),
        );
        state.set_overrides(overrides);
        state.set_notes(notes, local_now());

        Ok(Self {
            sync: EditSyncQueue::new(&config.sync),
            config,
            store,
            feed,
            kv,
            state,
            themes: ThemeRegistry::default(),
            list_state: ListState::default(),
            should_quit: false,
            tick_rate: Duration::from_millis(100),
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            let palette = self.themes.palette(self.state.theme());
            terminal
                .draw(|frame| ui::draw_app(frame, &self.state, &mut self.list_state, palette))
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or(Duration::ZERO);

            if event::poll(timeout).context("polling for terminal events")? {
                if let Event::Key(key) = event::read().context("reading terminal event")? {
                    self.handle_key(key);
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.tick(Instant::now());
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        let input = key_input(&key);
        if self.state.is_palette_open() && !navigator::is_palette_shortcut(&input) {
            self.handle_palette_key(key);
            return;
        }
        match self.state.dispatch(input) {
            Command::Typing => self.handle_text_key(key),
            command => self.run_command(command),
        }
    }

    /// Flushes due edits and reacts to store changes.
    pub fn tick(&mut self, now: Instant) {
        let session = self.session();
        if let Some(event) = self.sync.poll(now, &self.store, session.as_deref()) {
            self.handle_sync_event(event);
        }
        let notices = self.feed.as_ref().map(NoteFeed::drain).unwrap_or_default();
        if notices.is_empty() {
            self.state.regroup_if_day_changed(local_now());
        } else {
            tracing::debug!(count = notices.len(), "store changed, refreshing");
            self.reload();
        }
        self.state.set_sync_status(self.sync.status());
    }

    fn session(&self) -> Option<String> {
        self.state.session_id().map(str::to_owned)
    }

    fn run_command(&mut self, command: Command) {
        match command {
            Command::Ignored | Command::Typing | Command::HighlightMoved | Command::Select(_) => {}
            Command::FocusSearch => {}
            Command::Blurred => {
                if self.state.is_editing() {
                    self.finish_editing();
                }
            }
            Command::SearchCleared => self.state.set_status_message(None::<String>),
            Command::TogglePin(slug) => self.toggle_pin(&slug),
            Command::Delete(slug) => self.request_delete(&slug),
            Command::ToggleTheme => {
                self.state.toggle_theme();
            }
            Command::TogglePalette => {
                if self.state.close_palette().is_none() {
                    if self.state.is_editing() {
                        self.finish_editing();
                    }
                    self.state.open_palette();
                }
            }
            Command::NewNote => self.create_note(),
            Command::EditContent(slug) => self.start_editing(&slug, EditField::Content),
            Command::EditTitle(slug) => self.start_editing(&slug, EditField::Title),
            Command::Quit => self.quit(),
        }
    }

    fn handle_palette_key(&mut self, key: KeyEvent) {
        let command_modifier = key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);
        match key.code {
            TermKey::Esc => {
                self.state.close_palette();
            }
            TermKey::Enter => {
                let entry = self
                    .state
                    .palette()
                    .and_then(PaletteState::selected_entry)
                    .cloned();
                self.state.close_palette();
                if let Some(entry) = entry {
                    self.run_palette_entry(entry);
                }
            }
            TermKey::Up => {
                if let Some(palette) = self.state.palette_mut() {
                    palette.move_selection(Direction::Up);
                }
            }
            TermKey::Down => {
                if let Some(palette) = self.state.palette_mut() {
                    palette.move_selection(Direction::Down);
                }
            }
            TermKey::Backspace => self.state.palette_pop_char(),
            TermKey::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => self.quit(),
            TermKey::Char(ch) if !command_modifier => self.state.palette_push_char(ch),
            _ => {}
        }
    }

    fn run_palette_entry(&mut self, entry: PaletteEntry) {
        let target = self.state.navigator.target_slug().map(str::to_owned);
        match entry {
            PaletteEntry::Command(PaletteCommand::NewNote) => self.create_note(),
            PaletteEntry::Command(PaletteCommand::TogglePin) => {
                if let Some(slug) = target {
                    self.toggle_pin(&slug);
                }
            }
            PaletteEntry::Command(PaletteCommand::DeleteNote) => {
                if let Some(slug) = target {
                    self.request_delete(&slug);
                }
            }
            PaletteEntry::Command(PaletteCommand::MoveUp) => self.navigate(Direction::Up),
            PaletteEntry::Command(PaletteCommand::MoveDown) => self.navigate(Direction::Down),
            PaletteEntry::Command(PaletteCommand::ToggleTheme) => {
                self.state.toggle_theme();
            }
            PaletteEntry::Note { slug, .. } => {
                self.state.navigator.clear_search();
                self.state.navigator.set_focus(Focus::List);
                self.state.navigator.select(slug);
            }
        }
    }

    fn navigate(&mut self, direction: Direction) {
        let flattened = self.state.flattened().to_vec();
        self.state
            .navigator
            .navigate_sequential(direction, &flattened, navigator::edge_fallback);
    }

    fn handle_text_key(&mut self, key: KeyEvent) {
        match self.state.navigator.focus() {
            Focus::SearchInput => self.handle_search_key(key),
            Focus::Editor => self.handle_editor_key(key),
            Focus::List => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        let mut input = self.state.navigator.query_input().to_string();
        match key.code {
            TermKey::Backspace => {
                if input.pop().is_none() {
                    return;
                }
            }
            TermKey::Char(ch)
                if !key.modifiers.intersects(
                    KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
                ) =>
            {
                input.push(ch);
            }
            TermKey::Up => {
                self.state.navigator.move_highlight(Direction::Up);
                return;
            }
            TermKey::Down => {
                self.state.navigator.move_highlight(Direction::Down);
                return;
            }
            _ => return,
        }
        self.state.set_query(&input);
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let plain = !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);
        let Some(editor) = self.state.editor_mut() else {
            return;
        };
        let mut finish = false;
        let edited = match key.code {
            TermKey::Char('z') if ctrl => editor.undo(),
            TermKey::Char('y') if ctrl => editor.redo(),
            TermKey::Char(ch) if plain => editor.insert_char(ch),
            TermKey::Enter if editor.field() == EditField::Title => {
                finish = true;
                false
            }
            TermKey::Enter => editor.insert_newline(),
            TermKey::Backspace => editor.backspace(),
            TermKey::Delete => editor.delete(),
            TermKey::Left => {
                editor.move_left();
                false
            }
            TermKey::Right => {
                editor.move_right();
                false
            }
            TermKey::Home => {
                editor.move_home();
                false
            }
            TermKey::End => {
                editor.move_end();
                false
            }
            TermKey::Up => {
                editor.move_up();
                false
            }
            TermKey::Down => {
                editor.move_down();
                false
            }
            _ => false,
        };
        if finish {
            self.finish_editing();
        } else if edited {
            self.push_edit();
        }
    }

    fn push_edit(&mut self) {
        let Some(fields) = self.state.editor().map(EditorState::to_fields) else {
            return;
        };
        if let Some(updated) = self.sync.apply_edit(fields, Instant::now()).cloned() {
            self.state.replace_note(updated, local_now());
        }
        self.state.set_sync_status(self.sync.status());
    }

    fn start_editing(&mut self, slug: &str, field: EditField) {
        let Some(note) = self.state.note(slug).cloned() else {
            return;
        };
        let owned = self
            .state
            .session_id()
            .map(|session| note.is_owned_by(session))
            .unwrap_or(false);
        if !owned {
            self.state
                .set_status_message(Some("Only your own private notes can be edited"));
            return;
        }
        if self.state.is_editing() {
            self.finish_editing();
        }
        self.state.begin_editor(EditorState::open(&note, field));
        self.sync.open(note);
        self.state.navigator.set_focus(Focus::Editor);
        self.state.set_status_message(Some(format!(
            "Editing {}: Esc to finish",
            field.label()
        )));
        self.state.set_sync_status(self.sync.status());
    }

    fn finish_editing(&mut self) {
        let session = self.session();
        let flush = self.config.sync.flush_on_close;
        if let Some(event) = self.sync.close(flush, &self.store, session.as_deref()) {
            self.handle_sync_event(event);
        }
        self.state.close_editor();
        if self.state.navigator.focus() == Focus::Editor {
            self.state.navigator.set_focus(Focus::List);
        }
        self.state.set_sync_status(self.sync.status());
    }

    fn handle_sync_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Synced { slug, fields, .. } => {
                tracing::debug!(slug = %slug, ?fields, "edit synced");
            }
            SyncEvent::Failed {
                unauthorized: true, ..
            } => {
                self.state.set_status_message(Some(
                    "Edit rejected: this note belongs to another session",
                ));
            }
            SyncEvent::Failed { message, .. } => {
                self.state
                    .set_status_message(Some(format!("Sync failed: {message}")));
            }
        }
    }

    fn toggle_pin(&mut self, slug: &str) {
        let Some(note) = self.state.note(slug).cloned() else {
            return;
        };
        let change = self.state.overrides_mut().toggle(&note);
        if let Err(err) = self.state.overrides().persist(self.kv.as_mut(), change.set) {
            tracing::error!(?err, slug = %slug, "failed to persist pin override");
            self.state
                .set_status_message(Some("Pin changed but could not be saved locally"));
        } else {
            self.state.set_status_message(Some(if change.pinned {
                "Note pinned"
            } else {
                "Note unpinned"
            }));
        }
        tracing::info!(slug = %slug, pinned = change.pinned, "toggled pin");
        self.state.navigator.clear_search();
        self.state.navigator.select(slug);
        self.state.regroup(local_now());
    }

    fn request_delete(&mut self, slug: &str) {
        let Some(note) = self.state.note(slug).cloned() else {
            return;
        };
        if note.public {
            self.state.navigator.disarm_delete();
            self.state
                .set_status_message(Some("Public notes can't be deleted"));
            return;
        }
        match self.state.navigator.request_delete(slug) {
            DeleteDecision::Confirm(_) => {
                self.state.set_status_message(Some(format!(
                    "Press d again to delete \"{}\"",
                    note.display_title()
                )));
            }
            DeleteDecision::Proceed(_) => self.delete_note(slug),
        }
    }

    fn delete_note(&mut self, slug: &str) {
        let session = self.session();
        let flattened_before = self.state.flattened().to_vec();
        if let Err(err) = ActionDispatcher::new(&self.store, session.as_deref()).delete_note(slug) {
            tracing::error!(?err, slug = %slug, "failed to delete note");
            self.state.set_status_message(Some("Failed to delete note"));
            return;
        }
        if self.sync.forget(slug) {
            self.state.close_editor();
        }
        self.state.remove_note(slug, local_now());
        let fallback = self.state.fallback_slug().to_string();
        self.state
            .navigator
            .after_delete(slug, &flattened_before, &fallback);
        self.state.navigator.set_focus(Focus::List);
        tracing::info!(slug = %slug, "deleted note");
        self.state.set_status_message(Some("Note deleted"));
    }

    fn create_note(&mut self) {
        let session = self.session();
        let created = ActionDispatcher::new(&self.store, session.as_deref()).create_note();
        let note = match created {
            Ok(note) => note,
            Err(err) => {
                tracing::error!(?err, "failed to create note");
                self.state.set_status_message(Some("Failed to create note"));
                return;
            }
        };
        let slug = note.slug.clone();
        self.state.overrides_mut().pin_new(&slug);
        if let Err(err) = self
            .state
            .overrides()
            .persist(self.kv.as_mut(), OverrideSet::UserPinned)
        {
            tracing::warn!(?err, slug = %slug, "failed to persist pin for new note");
        }
        self.state.replace_note(note, local_now());
        self.state.navigator.clear_search();
        self.state.navigator.select(slug.clone());
        tracing::info!(slug = %slug, "created note");
        self.start_editing(&slug, EditField::Title);
    }

    fn reload(&mut self) {
        let session = self.session();
        let notes = match ActionDispatcher::new(&self.store, session.as_deref()).fetch_visible() {
            Ok(notes) => notes,
            Err(err) => {
                tracing::error!(?err, "failed to refresh notes");
                self.state.set_status_message(Some("Failed to refresh notes"));
                return;
            }
        };

        let existing: HashSet<&str> = notes.iter().map(|note| note.slug.as_str()).collect();
        if self.state.overrides_mut().prune(&existing) > 0 {
            if let Err(err) = self.state.overrides().persist_all(self.kv.as_mut()) {
                tracing::warn!(?err, "failed to persist pruned pin overrides");
            }
        }

        if let Some(open_slug) = self.sync.note().map(|note| note.slug.clone()) {
            match notes.iter().find(|note| note.slug == open_slug) {
                Some(remote) if !self.sync.has_unsynced() => {
                    self.sync.refresh_from_remote(remote);
                    if let Some(editor) = self.state.editor_mut() {
                        editor.adopt(remote);
                    }
                }
                Some(_) => {}
                None => {
                    self.sync.forget(&open_slug);
                    self.state.close_editor();
                    self.state.navigator.set_focus(Focus::List);
                    self.state
                        .set_status_message(Some("The open note was deleted elsewhere"));
                }
            }
        }

        let local_copy = self
            .sync
            .has_unsynced()
            .then(|| self.sync.note().cloned())
            .flatten();
        let now = local_now();
        self.state.set_notes(notes, now);
        if let Some(local) = local_copy {
            self.state.replace_note(local, now);
        }
    }

    fn quit(&mut self) {
        if self.state.is_editing() {
            self.finish_editing();
        }
        self.should_quit = true;
    }
}

fn key_input(key: &KeyEvent) -> KeyInput {
    let code = match key.code {
        TermKey::Char(ch) => KeyCode::Char(ch),
        TermKey::Up => KeyCode::Up,
        TermKey::Down => KeyCode::Down,
        TermKey::Enter => KeyCode::Enter,
        TermKey::Esc => KeyCode::Esc,
        _ => KeyCode::Other,
    };
    let mut modifiers = Modifiers::empty();
    modifiers.set(Modifiers::SHIFT, key.modifiers.contains(KeyModifiers::SHIFT));
    modifiers.set(Modifiers::CONTROL, key.modifiers.contains(KeyModifiers::CONTROL));
    modifiers.set(Modifiers::ALT, key.modifiers.contains(KeyModifiers::ALT));
    modifiers.set(Modifiers::SUPER, key.modifiers.contains(KeyModifiers::SUPER));
    KeyInput { code, modifiers }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen).context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("restoring screen state")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigPaths, StorageOptions, ThemeName};
    use crate::local::{MemoryKeyValueStore, SESSION_ID_KEY};
    use crate::model::fixtures::{note, private_note};
    use crate::model::{now_millis, AdminPatch, NewNote, NoteFields};
    use crate::pins::USER_PINNED_KEY;
    use crate::storage::testing::RecordingStore;
    use crate::storage::StoreError;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn memory_kv() -> Box<dyn KeyValueStore> {
        let mut kv = MemoryKeyValueStore::default();
        kv.set(SESSION_ID_KEY, "me").ok();
        kv.set(USER_PINNED_KEY, "[]").ok();
        Box::new(kv)
    }

    fn app_with(notes: Vec<crate::model::Note>) -> Result<App<RecordingStore>> {
        App::with_store(
            Arc::new(AppConfig::default()),
            RecordingStore::with_notes(notes),
            None,
            memory_kv(),
        )
    }

    fn press(app: &mut App<impl NoteStore>, code: TermKey) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn ctrl(app: &mut App<impl NoteStore>, ch: char) {
        app.handle_key(KeyEvent::new(TermKey::Char(ch), KeyModifiers::CONTROL));
    }

    fn type_text(app: &mut App<impl NoteStore>, text: &str) {
        for ch in text.chars() {
            press(app, TermKey::Char(ch));
        }
    }

    #[test]
    fn pin_key_toggles_and_persists_locally() -> Result<()> {
        let mut app = app_with(vec![note("guide", Some(now_millis()), 0)])?;
        app.state.navigator.select("guide");
        press(&mut app, TermKey::Char('p'));
        assert_eq!(app.state.status_message(), Some("Note pinned"));
        assert_eq!(app.kv.get(USER_PINNED_KEY)?.as_deref(), Some("[\"guide\"]"));
        assert_eq!(app.state.flattened().first().map(String::as_str), Some("guide"));

        press(&mut app, TermKey::Char('p'));
        assert_eq!(app.state.status_message(), Some("Note unpinned"));
        assert_eq!(app.kv.get(USER_PINNED_KEY)?.as_deref(), Some("[]"));
        Ok(())
    }

    #[test]
    fn delete_needs_confirmation_then_selects_previous() -> Result<()> {
        let now = now_millis();
        let mut app = app_with(vec![
            private_note("older", "me", now - 60_000),
            private_note("newer", "me", now),
        ])?;
        assert_eq!(app.state.flattened(), ["newer", "older"]);
        app.state.navigator.select("older");

        press(&mut app, TermKey::Char('d'));
        assert_eq!(
            app.state.status_message(),
            Some("Press d again to delete \"older\"")
        );
        assert!(app.store.note("older").is_some());

        press(&mut app, TermKey::Char('d'));
        assert_eq!(app.state.status_message(), Some("Note deleted"));
        assert!(app.store.note("older").is_none());
        assert_eq!(app.state.navigator.selected(), Some("newer"));
        Ok(())
    }

    #[test]
    fn public_notes_are_never_armed_for_delete() -> Result<()> {
        let mut app = app_with(vec![note("about-me", None, 0)])?;
        press(&mut app, TermKey::Char('d'));
        press(&mut app, TermKey::Char('d'));
        assert_eq!(
            app.state.status_message(),
            Some("Public notes can't be deleted")
        );
        assert_eq!(app.state.navigator.delete_guard().armed(), None);
        assert!(app.store.note("about-me").is_some());
        Ok(())
    }

    #[test]
    fn new_note_edits_are_debounced_into_one_update() -> Result<()> {
        let mut app = app_with(vec![])?;
        press(&mut app, TermKey::Char('n'));
        let slug = app
            .state
            .editor()
            .map(|editor| editor.slug().to_string())
            .unwrap_or_default();
        assert!(app.store.note(&slug).is_some());
        assert_eq!(app.state.navigator.focus(), Focus::Editor);

        type_text(&mut app, "Plan");
        assert_eq!(app.state.note(&slug).map(|n| n.display_title()), Some("Plan"));
        app.tick(Instant::now());
        assert!(app.store.updates().is_empty());

        app.tick(Instant::now() + Duration::from_millis(600));
        assert_eq!(app.store.updates(), vec![(slug, NoteFields::title("Plan"))]);
        Ok(())
    }

    #[test]
    fn escape_from_editor_flushes_pending_edits() -> Result<()> {
        let mut app = app_with(vec![private_note("draft", "me", now_millis())])?;
        app.state.navigator.select("draft");
        press(&mut app, TermKey::Char('e'));
        type_text(&mut app, "!");
        press(&mut app, TermKey::Esc);
        assert!(!app.state.is_editing());
        assert_eq!(app.state.navigator.focus(), Focus::List);
        assert_eq!(
            app.store.updates(),
            vec![("draft".to_string(), NoteFields::content("!"))]
        );
        Ok(())
    }

    fn open_draft_editor() -> Result<App<RecordingStore>> {
        let mut app = app_with(vec![private_note("draft", "me", now_millis())])?;
        app.state.navigator.select("draft");
        press(&mut app, TermKey::Char('e'));
        assert!(app.state.is_editing());
        Ok(app)
    }

    fn local_content(app: &App<RecordingStore>) -> Option<String> {
        app.state.note("draft").and_then(|note| note.content.clone())
    }

    fn editor_buffer(app: &App<RecordingStore>) -> Option<String> {
        app.state.editor().map(|editor| editor.buffer().to_string())
    }

    fn remote_content(app: &App<RecordingStore>, content: &str) -> Result<()> {
        let patch = AdminPatch {
            content: Some(content.to_string()),
            ..AdminPatch::default()
        };
        app.store.admin_update("draft", &patch)?;
        Ok(())
    }

    #[test]
    fn failed_flush_keeps_local_edit_across_reload() -> Result<()> {
        let mut app = open_draft_editor()?;
        type_text(&mut app, "X");
        let local = local_content(&app);
        assert!(local.as_deref().is_some_and(|content| content.ends_with('X')));

        app.store
            .fail_next(StoreError::Unavailable("offline".into()));
        app.tick(Instant::now() + Duration::from_millis(600));
        assert!(app
            .state
            .status_message()
            .is_some_and(|message| message.starts_with("Sync failed")));

        app.reload();
        assert_eq!(local_content(&app), local);
        assert_eq!(editor_buffer(&app), local);
        Ok(())
    }

    #[test]
    fn reload_adopts_remote_change_when_nothing_is_unsynced() -> Result<()> {
        let mut app = open_draft_editor()?;
        remote_content(&app, "from elsewhere")?;
        app.reload();
        assert_eq!(local_content(&app).as_deref(), Some("from elsewhere"));
        assert_eq!(editor_buffer(&app).as_deref(), Some("from elsewhere"));
        assert!(app.state.is_editing());
        Ok(())
    }

    #[test]
    fn reload_keeps_pending_edit_over_remote_change() -> Result<()> {
        let mut app = open_draft_editor()?;
        type_text(&mut app, "Y");
        let local = local_content(&app);
        remote_content(&app, "from elsewhere")?;

        app.reload();
        assert_eq!(local_content(&app), local);
        assert_eq!(editor_buffer(&app), local);

        app.tick(Instant::now() + Duration::from_millis(600));
        let written = app.store.note("draft").and_then(|note| note.content);
        assert_eq!(written, local);
        Ok(())
    }

    #[test]
    fn reload_closes_editor_when_note_deleted_elsewhere() -> Result<()> {
        let mut app = open_draft_editor()?;
        app.store.admin_delete("draft")?;
        app.reload();
        assert!(!app.state.is_editing());
        assert_eq!(app.state.navigator.focus(), Focus::List);
        assert_eq!(
            app.state.status_message(),
            Some("The open note was deleted elsewhere")
        );
        assert!(app.state.note("draft").is_none());
        Ok(())
    }

    #[test]
    fn editing_public_note_is_refused() -> Result<()> {
        let mut app = app_with(vec![note("about-me", None, 0)])?;
        press(&mut app, TermKey::Char('e'));
        assert!(!app.state.is_editing());
        assert_eq!(app.state.navigator.focus(), Focus::List);
        Ok(())
    }

    #[test]
    fn pin_from_search_targets_highlighted_result() -> Result<()> {
        let mut app = app_with(vec![note("alpha", None, 0), note("beta", None, 0)])?;
        press(&mut app, TermKey::Char('/'));
        type_text(&mut app, "bet");
        assert_eq!(app.state.navigator.results().map(<[_]>::len), Some(1));
        press(&mut app, TermKey::Esc);
        assert_eq!(app.state.navigator.query_input(), "bet");
        press(&mut app, TermKey::Char('p'));
        assert_eq!(app.state.navigator.selected(), Some("beta"));
        assert!(!app.state.navigator.is_searching());
        Ok(())
    }

    #[test]
    fn palette_runs_theme_toggle_and_closes() -> Result<()> {
        let mut app = app_with(vec![])?;
        ctrl(&mut app, 'k');
        assert!(app.state.is_palette_open());
        type_text(&mut app, "theme");
        press(&mut app, TermKey::Enter);
        assert!(!app.state.is_palette_open());
        assert_eq!(app.state.theme(), ThemeName::Light);
        Ok(())
    }

    #[test]
    fn palette_note_entry_selects_note() -> Result<()> {
        let mut app = app_with(vec![note("alpha", None, 0), note("zebra-notes", None, 0)])?;
        ctrl(&mut app, 'k');
        type_text(&mut app, "zebra");
        press(&mut app, TermKey::Enter);
        assert_eq!(app.state.navigator.selected(), Some("zebra-notes"));
        Ok(())
    }

    #[test]
    fn store_changes_arrive_through_the_feed() -> Result<()> {
        let root = TempDir::new()?;
        let base = root.path();
        let paths = ConfigPaths {
            config_dir: base.join("config"),
            config_file: base.join("config/config.toml"),
            data_dir: base.join("data"),
            database_path: base.join("data/notes.db"),
            log_dir: base.join("state/logs"),
            state_dir: base.join("state"),
        };
        let storage = crate::storage::init(
            &paths,
            &StorageOptions {
                seed_public_notes: false,
                ..StorageOptions::default()
            },
        )?;
        let mut app = App::new(Arc::new(AppConfig::default()), storage.clone(), memory_kv())?;
        assert!(app.state.notes().is_empty());

        storage.admin_create(&NewNote::public("announcement"))?;
        app.tick(Instant::now());
        assert!(app.state.note("announcement").is_some());
        assert_matches!(app.state.navigator.selected(), Some("announcement"));
        Ok(())
    }

    #[test]
    fn ctrl_c_quits_from_text_input() -> Result<()> {
        let mut app = app_with(vec![])?;
        press(&mut app, TermKey::Char('/'));
        ctrl(&mut app, 'c');
        assert!(app.should_quit());
        Ok(())
    }
}
