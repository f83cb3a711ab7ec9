use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{ConfigPaths, StorageOptions};
use crate::model::{
    now_millis, AdminPatch, NewNote, Note, NoteFields, PinOrderEntry, DEFAULT_CATEGORY,
    DEFAULT_PRIVATE_EMOJI, DEFAULT_PUBLIC_EMOJI,
};

mod schema;

#[cfg(test)]
pub(crate) mod testing;

const NOTE_COLUMNS: &str = "id, slug, title, content, emoji, public, session_id, category, \
                            pinned, pin_order, updated_at, creation_time";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("note '{0}' not found")]
    NotFound(String),
    #[error("not authorized to modify note '{0}'")]
    Unauthorized(String),
    #[error("a note with slug '{0}' already exists")]
    DuplicateSlug(String),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("note store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, StoreError::Unauthorized(_))
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Query/mutate contract of the note store.
pub trait NoteStore {
    fn list_public_notes(&self) -> StoreResult<Vec<Note>>;
    fn list_by_session(&self, session_id: &str) -> StoreResult<Vec<Note>>;
    fn list_all(&self) -> StoreResult<Vec<Note>>;
    /// Private notes are only returned to their owning session.
    fn get_by_slug(&self, slug: &str, session_id: Option<&str>) -> StoreResult<Option<Note>>;
    fn create(&self, note: &NewNote) -> StoreResult<Note>;
    fn update(&self, slug: &str, session_id: &str, fields: &NoteFields) -> StoreResult<()>;
    fn delete(&self, slug: &str, session_id: &str) -> StoreResult<()>;
    fn admin_create(&self, note: &NewNote) -> StoreResult<Note>;
    fn admin_update(&self, slug: &str, patch: &AdminPatch) -> StoreResult<()>;
    fn admin_update_slug(&self, slug: &str, new_slug: &str) -> StoreResult<()>;
    fn admin_delete(&self, slug: &str) -> StoreResult<()>;
    fn admin_reorder_pins(&self, orders: &[PinOrderEntry]) -> StoreResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Renamed,
    Deleted,
    Reordered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    pub slug: String,
    pub kind: ChangeKind,
}

/// Receiving end of the store's change notifications.
#[derive(Debug)]
pub struct NoteFeed {
    receiver: Receiver<ChangeNotice>,
}

impl NoteFeed {
    pub fn drain(&self) -> Vec<ChangeNotice> {
        self.receiver.try_iter().collect()
    }
}

#[derive(Clone)]
pub struct StorageHandle {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
    subscribers: Arc<Mutex<Vec<Sender<ChangeNotice>>>>,
}

impl StorageHandle {
    pub fn connect(&self) -> StoreResult<Connection> {
        let conn = Connection::open(&*self.db_path)?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T>,
    {
        let mut conn = self.connect()?;
        f(&mut conn)
    }

    /// Every successful mutation through any clone of this handle is
    /// delivered to the returned feed.
    pub fn subscribe(&self) -> NoteFeed {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(sender);
        NoteFeed { receiver }
    }

    fn publish(&self, slug: &str, kind: ChangeKind) {
        let notice = ChangeNotice {
            slug: slug.to_string(),
            kind,
        };
        self.subscribers
            .lock()
            .retain(|sender| sender.send(notice.clone()).is_ok());
    }

    fn query_notes(&self, filter: &str, args: &[&dyn rusqlite::ToSql]) -> StoreResult<Vec<Note>> {
        self.with_connection(|conn| {
            let sql = format!(
                "SELECT {NOTE_COLUMNS} FROM notes {filter} ORDER BY creation_time DESC, slug"
            );
            let mut stmt = conn.prepare(&sql)?;
            let notes = stmt
                .query_map(args, note_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(notes)
        })
    }

    fn insert(&self, note: &NewNote, default_emoji: &str) -> StoreResult<Note> {
        let now = now_millis();
        let record = Note {
            id: Uuid::new_v4().to_string(),
            slug: note.slug.clone(),
            title: note.title.clone(),
            content: note.content.clone(),
            emoji: Some(
                note.emoji
                    .clone()
                    .unwrap_or_else(|| default_emoji.to_string()),
            ),
            public: note.public,
            session_id: note.session_id.clone(),
            category: note.category.clone(),
            pinned: note.pinned,
            pin_order: note.pin_order,
            updated_at: Some(now),
            creation_time: now,
        };
        self.with_connection(|conn| {
            insert_note(conn, &record).map_err(|err| slug_conflict(err, &record.slug))
        })?;
        self.publish(&record.slug, ChangeKind::Created);
        Ok(record)
    }
}

impl NoteStore for StorageHandle {
    fn list_public_notes(&self) -> StoreResult<Vec<Note>> {
        self.query_notes("WHERE public = 1", &[])
    }

    fn list_by_session(&self, session_id: &str) -> StoreResult<Vec<Note>> {
        self.query_notes("WHERE public = 0 AND session_id = ?1", &[&session_id])
    }

    fn list_all(&self) -> StoreResult<Vec<Note>> {
        self.query_notes("", &[])
    }

    fn get_by_slug(&self, slug: &str, session_id: Option<&str>) -> StoreResult<Option<Note>> {
        let note = self.with_connection(|conn| fetch_by_slug(conn, slug))?;
        Ok(note.filter(|note| note.is_visible_to(session_id)))
    }

    fn create(&self, note: &NewNote) -> StoreResult<Note> {
        let Some(session_id) = note.session_id.as_deref().filter(|s| !s.is_empty()) else {
            return Err(StoreError::Unauthorized(note.slug.clone()));
        };
        let mut private = note.clone();
        private.public = false;
        private.session_id = Some(session_id.to_string());
        private.pinned = None;
        private.pin_order = None;
        if private.category.is_none() {
            private.category = Some(DEFAULT_CATEGORY.to_string());
        }
        let created = self.insert(&private, DEFAULT_PRIVATE_EMOJI)?;
        tracing::info!(slug = %created.slug, "created private note");
        Ok(created)
    }

    fn update(&self, slug: &str, session_id: &str, fields: &NoteFields) -> StoreResult<()> {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            let note = fetch_by_slug(&tx, slug)?
                .ok_or_else(|| StoreError::NotFound(slug.to_string()))?;
            if !note.is_owned_by(session_id) {
                return Err(StoreError::Unauthorized(slug.to_string()));
            }
            if fields.is_empty() {
                return Ok(());
            }
            tx.execute(
                "UPDATE notes
                 SET title = COALESCE(?1, title),
                     content = COALESCE(?2, content),
                     emoji = COALESCE(?3, emoji),
                     updated_at = ?4
                 WHERE slug = ?5",
                params![fields.title, fields.content, fields.emoji, now_millis(), slug],
            )?;
            tx.commit()?;
            Ok(())
        })?;
        if !fields.is_empty() {
            self.publish(slug, ChangeKind::Updated);
        }
        Ok(())
    }

    fn delete(&self, slug: &str, session_id: &str) -> StoreResult<()> {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            let note = fetch_by_slug(&tx, slug)?
                .ok_or_else(|| StoreError::NotFound(slug.to_string()))?;
            if !note.is_owned_by(session_id) {
                return Err(StoreError::Unauthorized(slug.to_string()));
            }
            tx.execute("DELETE FROM notes WHERE slug = ?1", params![slug])?;
            tx.commit()?;
            Ok(())
        })?;
        tracing::info!(slug, "deleted private note");
        self.publish(slug, ChangeKind::Deleted);
        Ok(())
    }

    fn admin_create(&self, note: &NewNote) -> StoreResult<Note> {
        let created = self.insert(note, DEFAULT_PUBLIC_EMOJI)?;
        tracing::info!(slug = %created.slug, public = created.public, "admin created note");
        Ok(created)
    }

    fn admin_update(&self, slug: &str, patch: &AdminPatch) -> StoreResult<()> {
        self.with_connection(|conn| {
            let updated = conn.execute(
                "UPDATE notes
                 SET title = COALESCE(?1, title),
                     content = COALESCE(?2, content),
                     emoji = COALESCE(?3, emoji),
                     public = COALESCE(?4, public),
                     category = COALESCE(?5, category),
                     pinned = COALESCE(?6, pinned),
                     pin_order = COALESCE(?7, pin_order),
                     updated_at = CASE WHEN ?8 THEN updated_at ELSE ?9 END
                 WHERE slug = ?10",
                params![
                    patch.title,
                    patch.content,
                    patch.emoji,
                    patch.public,
                    patch.category,
                    patch.pinned,
                    patch.pin_order,
                    patch.is_empty(),
                    now_millis(),
                    slug
                ],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound(slug.to_string()));
            }
            Ok(())
        })?;
        self.publish(slug, ChangeKind::Updated);
        Ok(())
    }

    fn admin_update_slug(&self, slug: &str, new_slug: &str) -> StoreResult<()> {
        if slug == new_slug {
            return Ok(());
        }
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            if fetch_by_slug(&tx, slug)?.is_none() {
                return Err(StoreError::NotFound(slug.to_string()));
            }
            if fetch_by_slug(&tx, new_slug)?.is_some() {
                return Err(StoreError::DuplicateSlug(new_slug.to_string()));
            }
            tx.execute(
                "UPDATE notes SET slug = ?1 WHERE slug = ?2",
                params![new_slug, slug],
            )
            .map_err(|err| slug_conflict(err, new_slug))?;
            tx.commit()?;
            Ok(())
        })?;
        tracing::info!(from = slug, to = new_slug, "renamed note slug");
        self.publish(slug, ChangeKind::Renamed);
        self.publish(new_slug, ChangeKind::Renamed);
        Ok(())
    }

    fn admin_delete(&self, slug: &str) -> StoreResult<()> {
        self.with_connection(|conn| {
            let deleted = conn.execute("DELETE FROM notes WHERE slug = ?1", params![slug])?;
            if deleted == 0 {
                return Err(StoreError::NotFound(slug.to_string()));
            }
            Ok(())
        })?;
        tracing::info!(slug, "admin deleted note");
        self.publish(slug, ChangeKind::Deleted);
        Ok(())
    }

    fn admin_reorder_pins(&self, orders: &[PinOrderEntry]) -> StoreResult<()> {
        let touched = self.with_connection(|conn| {
            let tx = conn.transaction()?;
            let mut touched = Vec::with_capacity(orders.len());
            for entry in orders {
                let updated = tx.execute(
                    "UPDATE notes SET pin_order = ?1 WHERE slug = ?2",
                    params![entry.pin_order, entry.slug],
                )?;
                if updated == 0 {
                    tracing::debug!(slug = %entry.slug, "skipping reorder for missing note");
                } else {
                    touched.push(entry.slug.clone());
                }
            }
            tx.commit()?;
            Ok(touched)
        })?;
        for slug in touched {
            self.publish(&slug, ChangeKind::Reordered);
        }
        Ok(())
    }
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        slug: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        emoji: row.get(4)?,
        public: row.get(5)?,
        session_id: row.get(6)?,
        category: row.get(7)?,
        pinned: row.get(8)?,
        pin_order: row.get(9)?,
        updated_at: row.get(10)?,
        creation_time: row.get(11)?,
    })
}

fn fetch_by_slug(conn: &Connection, slug: &str) -> StoreResult<Option<Note>> {
    let sql = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE slug = ?1");
    let note = conn
        .query_row(&sql, params![slug], note_from_row)
        .optional()?;
    Ok(note)
}

fn insert_note(conn: &Connection, note: &Note) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO notes ({NOTE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ),
        params![
            note.id,
            note.slug,
            note.title,
            note.content,
            note.emoji,
            note.public,
            note.session_id,
            note.category,
            note.pinned,
            note.pin_order,
            note.updated_at,
            note.creation_time
        ],
    )?;
    Ok(())
}

fn slug_conflict(err: rusqlite::Error, slug: &str) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            StoreError::DuplicateSlug(slug.to_string())
        }
        _ => StoreError::Database(err),
    }
}

pub fn init(paths: &ConfigPaths, storage: &StorageOptions) -> Result<StorageHandle> {
    let db_path = &paths.database_path;
    let existed = db_path.exists();
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    prepare_connection(&conn, storage).context("configuring database connection")?;
    schema::apply(&conn)?;
    if !existed && storage.seed_public_notes {
        seed_initial_notes(&conn)?;
    }
    Ok(StorageHandle {
        db_path: Arc::new(db_path.clone()),
        options: Arc::new(storage.clone()),
        subscribers: Arc::new(Mutex::new(Vec::new())),
    })
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )?;
    conn.busy_timeout(std::time::Duration::from_secs(2))?;
    Ok(())
}

fn seed_initial_notes(conn: &Connection) -> Result<()> {
    let existing: Option<String> = conn
        .query_row("SELECT id FROM notes LIMIT 1", [], |row| row.get(0))
        .optional()
        .context("checking for existing notes")?;
    if existing.is_some() {
        return Ok(());
    }

    tracing::info!("seeding first-run notes");
    let now = now_millis();
    let notes = [
        (
            "about-me",
            "About me",
            "👋",
            r#"# About me

Public notes like this one are visible to everyone. Private notes you
create stay scoped to this device's session.
"#,
        ),
        (
            "quick-links",
            "Quick links",
            "🔗",
            r#"# Keyboard highlights

- `j` / `k`: move through the grouped list
- `/`: search titles and content
- `p`: pin or unpin the selected note
- `d` twice: delete a private note
- `Ctrl-k`: command palette
"#,
        ),
    ];

    for (order, (slug, title, emoji, content)) in notes.into_iter().enumerate() {
        let note = Note {
            id: Uuid::new_v4().to_string(),
            slug: slug.to_string(),
            title: Some(title.to_string()),
            content: Some(content.to_string()),
            emoji: Some(emoji.to_string()),
            public: true,
            session_id: None,
            category: None,
            pinned: Some(true),
            pin_order: Some(order as i64),
            updated_at: Some(now),
            creation_time: now,
        };
        insert_note(conn, &note).context("inserting seed note")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigPaths, StorageOptions};
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn temp_paths(root: &TempDir) -> ConfigPaths {
        let base = root.path();
        let config_dir = base.join("config");
        let data_dir = base.join("data");
        let state_dir = base.join("state");
        ConfigPaths {
            config_dir: config_dir.clone(),
            config_file: config_dir.join("config.toml"),
            data_dir: data_dir.clone(),
            database_path: data_dir.join("notes.db"),
            log_dir: state_dir.join("logs"),
            state_dir,
        }
    }

    fn init_storage(seed: bool) -> anyhow::Result<(TempDir, StorageHandle)> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        let opts = StorageOptions {
            seed_public_notes: seed,
            ..StorageOptions::default()
        };
        let storage = init(&paths, &opts)?;
        Ok((temp, storage))
    }

    #[test]
    fn first_run_seeds_pinned_public_notes() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage(true)?;
        let notes = storage.list_public_notes()?;
        let mut slugs: Vec<_> = notes.iter().map(|n| n.slug.as_str()).collect();
        slugs.sort();
        assert_eq!(slugs, vec!["about-me", "quick-links"]);
        assert!(notes.iter().all(|n| n.is_admin_pinned()));
        Ok(())
    }

    #[test]
    fn create_applies_private_defaults() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage(false)?;
        let created = storage.create(&NewNote::private_draft("s1"))?;
        assert!(!created.public);
        assert_eq!(created.emoji.as_deref(), Some(DEFAULT_PRIVATE_EMOJI));
        assert_eq!(created.updated_at, Some(created.creation_time));

        let fetched = storage.get_by_slug(&created.slug, Some("s1"))?;
        assert_eq!(fetched.as_ref(), Some(&created));
        assert_eq!(storage.get_by_slug(&created.slug, Some("s2"))?, None);
        assert_eq!(storage.list_by_session("s1")?.len(), 1);
        assert!(storage.list_by_session("s2")?.is_empty());
        Ok(())
    }

    #[test]
    fn create_without_session_is_rejected() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage(false)?;
        let mut draft = NewNote::private_draft("s1");
        draft.session_id = None;
        assert_matches!(storage.create(&draft), Err(StoreError::Unauthorized(_)));
        Ok(())
    }

    #[test]
    fn duplicate_slug_on_create_is_reported() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage(false)?;
        storage.admin_create(&NewNote::public("taken"))?;
        assert_matches!(
            storage.admin_create(&NewNote::public("taken")),
            Err(StoreError::DuplicateSlug(slug)) if slug == "taken"
        );
        Ok(())
    }

    #[test]
    fn update_changes_only_provided_fields() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage(false)?;
        let created = storage.create(&NewNote::private_draft("s1"))?;
        let fields = NoteFields {
            title: Some("Groceries".into()),
            content: Some("eggs".into()),
            emoji: None,
        };
        storage.update(&created.slug, "s1", &fields)?;
        let note = storage
            .get_by_slug(&created.slug, Some("s1"))?
            .ok_or_else(|| anyhow::anyhow!("note missing"))?;
        assert_eq!(note.title.as_deref(), Some("Groceries"));
        assert_eq!(note.content.as_deref(), Some("eggs"));
        assert_eq!(note.emoji.as_deref(), Some(DEFAULT_PRIVATE_EMOJI));
        assert!(note.updated_at >= Some(created.creation_time));
        Ok(())
    }

    #[test]
    fn update_from_other_session_is_unauthorized() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage(true)?;
        let created = storage.create(&NewNote::private_draft("owner"))?;
        let err = storage
            .update(&created.slug, "intruder", &NoteFields::title("x"))
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert_matches!(
            storage.update("about-me", "owner", &NoteFields::title("x")),
            Err(StoreError::Unauthorized(_))
        );
        assert_matches!(
            storage.update("missing", "owner", &NoteFields::title("x")),
            Err(StoreError::NotFound(_))
        );
        Ok(())
    }

    #[test]
    fn sessions_cannot_delete_public_notes() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage(true)?;
        assert_matches!(
            storage.delete("about-me", "s1"),
            Err(StoreError::Unauthorized(_))
        );
        let created = storage.create(&NewNote::private_draft("s1"))?;
        storage.delete(&created.slug, "s1")?;
        assert_eq!(storage.get_by_slug(&created.slug, Some("s1"))?, None);
        Ok(())
    }

    #[test]
    fn admin_update_slug_rejects_taken_slug() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage(true)?;
        assert_matches!(
            storage.admin_update_slug("about-me", "quick-links"),
            Err(StoreError::DuplicateSlug(_))
        );
        storage.admin_update_slug("about-me", "hello")?;
        assert!(storage.get_by_slug("hello", None)?.is_some());
        assert!(storage.get_by_slug("about-me", None)?.is_none());
        Ok(())
    }

    #[test]
    fn admin_update_touches_any_field() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage(true)?;
        let patch = AdminPatch {
            pinned: Some(false),
            category: Some("archive".into()),
            ..AdminPatch::default()
        };
        storage.admin_update("quick-links", &patch)?;
        let note = storage
            .get_by_slug("quick-links", None)?
            .ok_or_else(|| anyhow::anyhow!("note missing"))?;
        assert_eq!(note.pinned, Some(false));
        assert_eq!(note.category.as_deref(), Some("archive"));
        assert_eq!(note.pin_order, Some(1));
        assert_matches!(
            storage.admin_update("nope", &patch),
            Err(StoreError::NotFound(_))
        );
        Ok(())
    }

    #[test]
    fn reorder_pins_skips_missing_slugs() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage(true)?;
        storage.admin_reorder_pins(&[
            PinOrderEntry {
                slug: "quick-links".into(),
                pin_order: 0,
            },
            PinOrderEntry {
                slug: "ghost".into(),
                pin_order: 1,
            },
            PinOrderEntry {
                slug: "about-me".into(),
                pin_order: 2,
            },
        ])?;
        let orders: Vec<_> = ["quick-links", "about-me"]
            .iter()
            .map(|slug| storage.get_by_slug(slug, None))
            .collect::<StoreResult<Vec<_>>>()?
            .into_iter()
            .flatten()
            .map(|note| note.pin_order)
            .collect();
        assert_eq!(orders, vec![Some(0), Some(2)]);
        Ok(())
    }

    #[test]
    fn mutations_are_published_to_subscribers() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage(false)?;
        let feed = storage.subscribe();
        let writer = storage.clone();
        let created = writer.create(&NewNote::private_draft("s1"))?;
        writer.update(&created.slug, "s1", &NoteFields::content("hi"))?;
        writer.delete(&created.slug, "s1")?;

        let kinds: Vec<_> = feed.drain().into_iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Created, ChangeKind::Updated, ChangeKind::Deleted]
        );
        assert!(feed.drain().is_empty());
        Ok(())
    }

    #[test]
    fn failed_mutations_publish_nothing() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage(true)?;
        let feed = storage.subscribe();
        let _ = storage.delete("about-me", "s1");
        let _ = storage.admin_delete("missing");
        assert!(feed.drain().is_empty());
        Ok(())
    }
}
