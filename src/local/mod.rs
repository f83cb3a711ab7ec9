use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uuid::Uuid;

pub const SESSION_ID_KEY: &str = "session_id";
const STATE_FILE_NAME: &str = "local-state.json";
const STATE_TMP_EXTENSION: &str = "json.tmp";

/// Durable client-side string storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryKeyValueStore {
    entries: BTreeMap<String, String>,
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// JSON object on disk, rewritten atomically on every change.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileKeyValueStore {
    pub fn open_in(state_dir: &Path) -> Result<Self> {
        Self::open(state_dir.join(STATE_FILE_NAME))
    }

    pub fn open(path: PathBuf) -> Result<Self> {
        let entries = match fs::read(&path) {
            Ok(raw) => match serde_json::from_slice(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(
                        ?err,
                        path = %path.display(),
                        "local state unreadable, starting empty"
                    );
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("reading local state {}", path.display()))
            }
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.entries).context("serialising local state")?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("ensuring local state dir {}", parent.display()))?;
        }
        let tmp_path = self.path.with_extension(STATE_TMP_EXTENSION);
        fs::write(&tmp_path, &json)
            .with_context(|| format!("writing temporary local state {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!("atomically persisting local state {}", self.path.display())
        })?;
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if self.entries.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        self.entries.insert(key.to_string(), value.to_string());
        self.write()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.write()?;
        }
        Ok(())
    }
}

/// Returns the persisted session identity, generating one on first use.
pub fn session_id<K>(kv: &mut K) -> Result<String>
where
    K: KeyValueStore + ?Sized,
{
    if let Some(existing) = kv.get(SESSION_ID_KEY)? {
        if !existing.trim().is_empty() {
            return Ok(existing);
        }
    }
    let generated = Uuid::new_v4().to_string();
    kv.set(SESSION_ID_KEY, &generated)
        .context("persisting session id")?;
    tracing::info!("created new session identity");
    Ok(generated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_store_survives_reopen() -> Result<()> {
        let temp = TempDir::new()?;
        let mut store = FileKeyValueStore::open_in(temp.path())?;
        store.set("pinnedNotes", r#"["about-me"]"#)?;

        let reopened = FileKeyValueStore::open_in(temp.path())?;
        assert_eq!(
            reopened.get("pinnedNotes")?.as_deref(),
            Some(r#"["about-me"]"#)
        );
        assert!(!temp.path().join("local-state.json.tmp").exists());
        Ok(())
    }

    #[test]
    fn corrupt_state_file_starts_empty() -> Result<()> {
        let temp = TempDir::new()?;
        fs::write(temp.path().join(STATE_FILE_NAME), b"{not json")?;
        let store = FileKeyValueStore::open_in(temp.path())?;
        assert_eq!(store.get(SESSION_ID_KEY)?, None);
        Ok(())
    }

    #[test]
    fn remove_deletes_key_on_disk() -> Result<()> {
        let temp = TempDir::new()?;
        let mut store = FileKeyValueStore::open_in(temp.path())?;
        store.set("a", "1")?;
        store.remove("a")?;
        let reopened = FileKeyValueStore::open_in(temp.path())?;
        assert_eq!(reopened.get("a")?, None);
        Ok(())
    }

    #[test]
    fn session_id_is_generated_once() -> Result<()> {
        let mut kv = MemoryKeyValueStore::default();
        let first = session_id(&mut kv)?;
        let second = session_id(&mut kv)?;
        assert_eq!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
        Ok(())
    }
}
