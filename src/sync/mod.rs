use std::time::{Duration, Instant};

use time::OffsetDateTime;

use crate::config::SyncConfig;
use crate::model::{Note, NoteFields};
use crate::storage::NoteStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Inactive,
    Idle {
        slug: String,
        last_synced_at: Option<OffsetDateTime>,
    },
    Pending {
        slug: String,
        since: OffsetDateTime,
        fields: Vec<&'static str>,
    },
    Error {
        slug: String,
        message: String,
        occurred_at: OffsetDateTime,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Synced {
        slug: String,
        fields: Vec<&'static str>,
        timestamp: OffsetDateTime,
    },
    Failed {
        slug: String,
        message: String,
        unauthorized: bool,
    },
}

/// Coalesces edits to the open note into one debounced store update.
///
/// Edits apply to the local copy immediately and are never rolled back.
/// The pending accumulator is taken before the store call, so a failed
/// flush is not replayed; the next edit of a field carries its current value.
/// Fields of a failed flush stay marked unsynced until a later flush writes
/// them, and remote refreshes never overwrite them.
#[derive(Debug)]
pub struct EditSyncQueue {
    debounce: Duration,
    open: Option<OpenNote>,
}

#[derive(Debug)]
struct OpenNote {
    note: Note,
    pending: NoteFields,
    unsynced: NoteFields,
    deadline: Option<Instant>,
    dirty_since_wall: Option<OffsetDateTime>,
    last_synced_at: Option<OffsetDateTime>,
    last_error: Option<SyncFailure>,
}

#[derive(Debug, Clone)]
struct SyncFailure {
    message: String,
    occurred_at: OffsetDateTime,
}

impl EditSyncQueue {
    pub fn new(config: &SyncConfig) -> Self {
        Self::with_debounce(config.debounce)
    }

    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            debounce,
            open: None,
        }
    }

    pub fn status(&self) -> SyncStatus {
        let Some(open) = &self.open else {
            return SyncStatus::Inactive;
        };
        if let Some(failure) = &open.last_error {
            return SyncStatus::Error {
                slug: open.note.slug.clone(),
                message: failure.message.clone(),
                occurred_at: failure.occurred_at,
            };
        }
        if !open.pending.is_empty() {
            return SyncStatus::Pending {
                slug: open.note.slug.clone(),
                since: open
                    .dirty_since_wall
                    .unwrap_or_else(OffsetDateTime::now_utc),
                fields: open.pending.field_names(),
            };
        }
        SyncStatus::Idle {
            slug: open.note.slug.clone(),
            last_synced_at: open.last_synced_at,
        }
    }

    /// Binds the queue to `note`. Anything pending for a previous note is
    /// dropped without a write.
    pub fn open(&mut self, note: Note) {
        if self.cancel() {
            tracing::debug!("dropped pending edits while switching notes");
        }
        self.open = Some(OpenNote::new(note));
    }

    pub fn note(&self) -> Option<&Note> {
        self.open.as_ref().map(|open| &open.note)
    }

    pub fn is_open_for(&self, slug: &str) -> bool {
        self.note().map(|note| note.slug == slug).unwrap_or(false)
    }

    pub fn has_pending(&self) -> bool {
        self.open
            .as_ref()
            .map(|open| !open.pending.is_empty())
            .unwrap_or(false)
    }

    /// Pending edits, or fields whose last flush failed: the local copy
    /// differs from the store.
    pub fn has_unsynced(&self) -> bool {
        self.open
            .as_ref()
            .map(|open| !open.pending.is_empty() || !open.unsynced.is_empty())
            .unwrap_or(false)
    }

    /// Merges `fields` into the accumulator, applies them to the local note
    /// and restarts the debounce window at `now`.
    pub fn apply_edit(&mut self, fields: NoteFields, now: Instant) -> Option<&Note> {
        let debounce = self.debounce;
        let open = self.open.as_mut()?;
        if fields.is_empty() {
            return Some(&open.note);
        }
        open.note.apply_fields(&fields);
        open.pending.merge(fields);
        open.deadline = Some(now + debounce);
        if open.dirty_since_wall.is_none() {
            open.dirty_since_wall = Some(OffsetDateTime::now_utc());
        }
        open.last_error = None;
        Some(&open.note)
    }

    /// Issues the update once the debounce window has elapsed.
    pub fn poll<S>(
        &mut self,
        now: Instant,
        store: &S,
        session_id: Option<&str>,
    ) -> Option<SyncEvent>
    where
        S: NoteStore + ?Sized,
    {
        self.flush_internal(store, session_id, FlushKind::Debounced(now))
    }

    pub fn flush_now<S>(&mut self, store: &S, session_id: Option<&str>) -> Option<SyncEvent>
    where
        S: NoteStore + ?Sized,
    {
        self.flush_internal(store, session_id, FlushKind::Immediate)
    }

    /// Drops the pending timer and accumulator. Returns whether edits were lost.
    pub fn cancel(&mut self) -> bool {
        let Some(open) = self.open.as_mut() else {
            return false;
        };
        let dropped = !open.pending.is_empty();
        if dropped {
            tracing::debug!(
                slug = %open.note.slug,
                fields = ?open.pending.field_names(),
                "cancelled pending edits"
            );
        }
        open.pending = NoteFields::default();
        open.deadline = None;
        open.dirty_since_wall = None;
        dropped
    }

    /// Unbinds the open note, flushing first when `flush` is set.
    pub fn close<S>(
        &mut self,
        flush: bool,
        store: &S,
        session_id: Option<&str>,
    ) -> Option<SyncEvent>
    where
        S: NoteStore + ?Sized,
    {
        let event = if flush {
            self.flush_now(store, session_id)
        } else {
            self.cancel();
            None
        };
        self.open = None;
        event
    }

    /// Adopts a fresher copy from the store. Pending and unsynced local fields
    /// stay on top.
    pub fn refresh_from_remote(&mut self, remote: &Note) -> Option<&Note> {
        let open = self.open.as_mut()?;
        if open.note.slug != remote.slug {
            return None;
        }
        let mut merged = remote.clone();
        merged.apply_fields(&open.unsynced);
        merged.apply_fields(&open.pending);
        open.note = merged;
        Some(&open.note)
    }

    /// The open note disappeared from the store.
    pub fn forget(&mut self, slug: &str) -> bool {
        if !self.is_open_for(slug) {
            return false;
        }
        self.cancel();
        self.open = None;
        true
    }

    fn flush_internal<S>(
        &mut self,
        store: &S,
        session_id: Option<&str>,
        mode: FlushKind,
    ) -> Option<SyncEvent>
    where
        S: NoteStore + ?Sized,
    {
        let open = self.open.as_mut()?;
        if open.pending.is_empty() {
            return None;
        }
        if let FlushKind::Debounced(now) = mode {
            match open.deadline {
                Some(deadline) if now >= deadline => {}
                _ => return None,
            }
        }
        // without an identity there is nobody to write as; keep accumulating
        let session_id = session_id.filter(|id| !id.is_empty())?;

        let payload = std::mem::take(&mut open.pending);
        open.deadline = None;
        open.dirty_since_wall = None;
        let fields = payload.field_names();
        let slug = open.note.slug.clone();
        let timestamp = OffsetDateTime::now_utc();

        match store.update(&slug, session_id, &payload) {
            Ok(()) => {
                tracing::debug!(slug = %slug, ?fields, "synced note edits");
                clear_written(&mut open.unsynced, &payload);
                open.last_synced_at = Some(timestamp);
                open.last_error = None;
                Some(SyncEvent::Synced {
                    slug,
                    fields,
                    timestamp,
                })
            }
            Err(err) => {
                let unauthorized = err.is_unauthorized();
                if unauthorized {
                    tracing::warn!(slug = %slug, "store rejected edit: session does not own note");
                } else {
                    tracing::error!(?err, slug = %slug, "failed to sync note edits");
                }
                let message = err.to_string();
                open.unsynced.merge(payload);
                open.last_error = Some(SyncFailure {
                    message: message.clone(),
                    occurred_at: timestamp,
                });
                Some(SyncEvent::Failed {
                    slug,
                    message,
                    unauthorized,
                })
            }
        }
    }
}

impl OpenNote {
    fn new(note: Note) -> Self {
        Self {
            note,
            pending: NoteFields::default(),
            unsynced: NoteFields::default(),
            deadline: None,
            dirty_since_wall: None,
            last_synced_at: None,
            last_error: None,
        }
    }
}

fn clear_written(unsynced: &mut NoteFields, written: &NoteFields) {
    if written.title.is_some() {
        unsynced.title = None;
    }
    if written.content.is_some() {
        unsynced.content = None;
    }
    if written.emoji.is_some() {
        unsynced.emoji = None;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum FlushKind {
    Debounced(Instant),
    Immediate,
}
