use anyhow::{anyhow, Context, Result};

use crate::model::{NewNote, Note};
use crate::storage::NoteStore;

/// Store calls made on behalf of the current session.
pub struct ActionDispatcher<'a, S: NoteStore + ?Sized> {
    store: &'a S,
    session_id: Option<&'a str>,
}

impl<'a, S: NoteStore + ?Sized> ActionDispatcher<'a, S> {
    pub fn new(store: &'a S, session_id: Option<&'a str>) -> Self {
        Self { store, session_id }
    }

    fn session(&self) -> Result<&'a str> {
        self.session_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| anyhow!("no session identity available"))
    }

    /// Public notes plus the session's private notes, de-duplicated by slug.
    pub fn fetch_visible(&self) -> Result<Vec<Note>> {
        let mut notes = self
            .store
            .list_public_notes()
            .context("listing public notes")?;
        if let Some(session_id) = self.session_id {
            let private = self
                .store
                .list_by_session(session_id)
                .context("listing session notes")?;
            for note in private {
                if !notes.iter().any(|existing| existing.slug == note.slug) {
                    notes.push(note);
                }
            }
        }
        Ok(notes)
    }

    pub fn create_note(&self) -> Result<Note> {
        let session_id = self.session()?;
        let draft = NewNote::private_draft(session_id);
        self.store
            .create(&draft)
            .with_context(|| format!("creating note {}", draft.slug))
    }

    pub fn delete_note(&self, slug: &str) -> Result<()> {
        let session_id = self.session()?;
        self.store
            .delete(slug, session_id)
            .with_context(|| format!("deleting note {slug}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{note, private_note};
    use crate::storage::testing::RecordingStore;

    #[test]
    fn fetch_visible_merges_public_and_own_notes() -> Result<()> {
        let store = RecordingStore::with_notes(vec![
            note("public", None, 0),
            private_note("mine", "me", 0),
            private_note("theirs", "other", 0),
        ]);
        let slugs: Vec<_> = ActionDispatcher::new(&store, Some("me"))
            .fetch_visible()?
            .into_iter()
            .map(|n| n.slug)
            .collect();
        assert_eq!(slugs, vec!["public", "mine"]);
        Ok(())
    }

    #[test]
    fn create_requires_a_session() {
        let store = RecordingStore::default();
        assert!(ActionDispatcher::new(&store, None).create_note().is_err());
    }

    #[test]
    fn created_note_is_owned_by_session() -> Result<()> {
        let store = RecordingStore::default();
        let created = ActionDispatcher::new(&store, Some("me")).create_note()?;
        assert!(created.is_owned_by("me"));
        assert!(store.note(&created.slug).is_some());
        Ok(())
    }
}
