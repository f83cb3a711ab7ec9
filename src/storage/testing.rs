use indexmap::IndexMap;
use parking_lot::Mutex;

use super::{NoteStore, StoreError, StoreResult};
use crate::model::{
    now_millis, AdminPatch, NewNote, Note, NoteFields, PinOrderEntry, DEFAULT_PRIVATE_EMOJI,
};

/// In-memory store that records session updates and can be told to fail.
#[derive(Default)]
pub struct RecordingStore {
    notes: Mutex<IndexMap<String, Note>>,
    updates: Mutex<Vec<(String, NoteFields)>>,
    fail_next: Mutex<Option<StoreError>>,
}

impl RecordingStore {
    pub fn with_notes(notes: Vec<Note>) -> Self {
        let store = Self::default();
        {
            let mut map = store.notes.lock();
            for note in notes {
                map.insert(note.slug.clone(), note);
            }
        }
        store
    }

    pub fn updates(&self) -> Vec<(String, NoteFields)> {
        self.updates.lock().clone()
    }

    pub fn fail_next(&self, err: StoreError) {
        *self.fail_next.lock() = Some(err);
    }

    pub fn note(&self, slug: &str) -> Option<Note> {
        self.notes.lock().get(slug).cloned()
    }

    fn take_failure(&self) -> StoreResult<()> {
        match self.fail_next.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl NoteStore for RecordingStore {
    fn list_public_notes(&self) -> StoreResult<Vec<Note>> {
        Ok(self.notes.lock().values().filter(|n| n.public).cloned().collect())
    }

    fn list_by_session(&self, session_id: &str) -> StoreResult<Vec<Note>> {
        Ok(self
            .notes
            .lock()
            .values()
            .filter(|n| n.is_owned_by(session_id))
            .cloned()
            .collect())
    }

    fn list_all(&self) -> StoreResult<Vec<Note>> {
        Ok(self.notes.lock().values().cloned().collect())
    }

    fn get_by_slug(&self, slug: &str, session_id: Option<&str>) -> StoreResult<Option<Note>> {
        Ok(self
            .note(slug)
            .filter(|note| note.is_visible_to(session_id)))
    }

    fn create(&self, note: &NewNote) -> StoreResult<Note> {
        self.take_failure()?;
        let mut created = to_note(note);
        if created.emoji.is_none() {
            created.emoji = Some(DEFAULT_PRIVATE_EMOJI.to_string());
        }
        let mut notes = self.notes.lock();
        if notes.contains_key(&created.slug) {
            return Err(StoreError::DuplicateSlug(created.slug));
        }
        notes.insert(created.slug.clone(), created.clone());
        Ok(created)
    }

    fn update(&self, slug: &str, session_id: &str, fields: &NoteFields) -> StoreResult<()> {
        self.updates.lock().push((slug.to_string(), fields.clone()));
        self.take_failure()?;
        let mut notes = self.notes.lock();
        let note = notes
            .get_mut(slug)
            .ok_or_else(|| StoreError::NotFound(slug.to_string()))?;
        if !note.is_owned_by(session_id) {
            return Err(StoreError::Unauthorized(slug.to_string()));
        }
        note.apply_fields(fields);
        note.updated_at = Some(now_millis());
        Ok(())
    }

    fn delete(&self, slug: &str, session_id: &str) -> StoreResult<()> {
        self.take_failure()?;
        let mut notes = self.notes.lock();
        match notes.get(slug) {
            None => Err(StoreError::NotFound(slug.to_string())),
            Some(note) if !note.is_owned_by(session_id) => {
                Err(StoreError::Unauthorized(slug.to_string()))
            }
            Some(_) => {
                notes.shift_remove(slug);
                Ok(())
            }
        }
    }

    fn admin_create(&self, note: &NewNote) -> StoreResult<Note> {
        self.create(note)
    }

    fn admin_update(&self, slug: &str, patch: &AdminPatch) -> StoreResult<()> {
        self.take_failure()?;
        let mut notes = self.notes.lock();
        let note = notes
            .get_mut(slug)
            .ok_or_else(|| StoreError::NotFound(slug.to_string()))?;
        note.apply_fields(&NoteFields {
            title: patch.title.clone(),
            content: patch.content.clone(),
            emoji: patch.emoji.clone(),
        });
        if let Some(public) = patch.public {
            note.public = public;
        }
        if patch.category.is_some() {
            note.category = patch.category.clone();
        }
        if patch.pinned.is_some() {
            note.pinned = patch.pinned;
        }
        if patch.pin_order.is_some() {
            note.pin_order = patch.pin_order;
        }
        Ok(())
    }

    fn admin_update_slug(&self, slug: &str, new_slug: &str) -> StoreResult<()> {
        self.take_failure()?;
        let mut notes = self.notes.lock();
        if notes.contains_key(new_slug) {
            return Err(StoreError::DuplicateSlug(new_slug.to_string()));
        }
        let mut note = notes
            .shift_remove(slug)
            .ok_or_else(|| StoreError::NotFound(slug.to_string()))?;
        note.slug = new_slug.to_string();
        notes.insert(new_slug.to_string(), note);
        Ok(())
    }

    fn admin_delete(&self, slug: &str) -> StoreResult<()> {
        self.take_failure()?;
        self.notes
            .lock()
            .shift_remove(slug)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(slug.to_string()))
    }

    fn admin_reorder_pins(&self, orders: &[PinOrderEntry]) -> StoreResult<()> {
        self.take_failure()?;
        let mut notes = self.notes.lock();
        for entry in orders {
            if let Some(note) = notes.get_mut(&entry.slug) {
                note.pin_order = Some(entry.pin_order);
            }
        }
        Ok(())
    }
}

fn to_note(note: &NewNote) -> Note {
    let now = now_millis();
    Note {
        id: format!("mem-{}", note.slug),
        slug: note.slug.clone(),
        title: note.title.clone(),
        content: note.content.clone(),
        emoji: note.emoji.clone(),
        public: note.public,
        session_id: note.session_id.clone(),
        category: note.category.clone(),
        pinned: note.pinned,
        pin_order: note.pin_order,
        updated_at: Some(now),
        creation_time: now,
    }
}
