use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn apply(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS notes (
            id TEXT PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            title TEXT,
            content TEXT,
            emoji TEXT,
            public INTEGER NOT NULL DEFAULT 0,
            session_id TEXT,
            category TEXT,
            pinned INTEGER,
            pin_order INTEGER,
            updated_at INTEGER,
            creation_time INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS notes_session_idx ON notes(session_id);
        CREATE INDEX IF NOT EXISTS notes_public_idx ON notes(public);
        "#,
    )
    .context("applying schema migrations")?;
    Ok(())
}
