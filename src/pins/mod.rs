use std::collections::{BTreeSet, HashSet};

use anyhow::{Context, Result};

use crate::local::KeyValueStore;
use crate::model::Note;

pub const USER_PINNED_KEY: &str = "pinnedNotes";
pub const USER_UNPINNED_PUBLIC_KEY: &str = "unpinnedPublicNotes";

/// Which local override set a pin change touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideSet {
    UserPinned,
    UserUnpinnedPublic,
}

impl OverrideSet {
    pub fn storage_key(self) -> &'static str {
        match self {
            OverrideSet::UserPinned => USER_PINNED_KEY,
            OverrideSet::UserUnpinnedPublic => USER_UNPINNED_PUBLIC_KEY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinChange {
    pub slug: String,
    pub pinned: bool,
    pub set: OverrideSet,
}

/// Per-user pin intent layered over administrator pins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinOverrides {
    user_pinned: BTreeSet<String>,
    user_unpinned_public: BTreeSet<String>,
}

/// Resolves administrator pins against the local override sets.
pub fn effective_pinned(note: &Note, overrides: &PinOverrides) -> bool {
    if note.public && note.is_admin_pinned() && overrides.user_unpinned_public.contains(&note.slug)
    {
        return false;
    }
    if note.is_admin_pinned() {
        return true;
    }
    overrides.user_pinned.contains(&note.slug)
}

impl PinOverrides {
    pub fn new<I, J>(user_pinned: I, user_unpinned_public: J) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
    {
        Self {
            user_pinned: user_pinned.into_iter().collect(),
            user_unpinned_public: user_unpinned_public.into_iter().collect(),
        }
    }

    pub fn is_pinned(&self, note: &Note) -> bool {
        effective_pinned(note, self)
    }

    pub fn user_pinned(&self) -> impl Iterator<Item = &str> {
        self.user_pinned.iter().map(String::as_str)
    }

    pub fn user_unpinned_public(&self) -> impl Iterator<Item = &str> {
        self.user_unpinned_public.iter().map(String::as_str)
    }

    /// Flips the effective pin state of `note`, touching exactly one set.
    /// The caller persists the returned set.
    pub fn toggle(&mut self, note: &Note) -> PinChange {
        let currently_pinned = self.is_pinned(note);
        let slug = note.slug.clone();
        let set = if note.public && note.is_admin_pinned() {
            if currently_pinned {
                self.user_unpinned_public.insert(slug.clone());
            } else {
                self.user_unpinned_public.remove(&slug);
            }
            OverrideSet::UserUnpinnedPublic
        } else {
            if currently_pinned {
                self.user_pinned.remove(&slug);
            } else {
                self.user_pinned.insert(slug.clone());
            }
            OverrideSet::UserPinned
        };
        PinChange {
            slug,
            pinned: !currently_pinned,
            set,
        }
    }

    /// Newly created notes start pinned for their creator.
    pub fn pin_new(&mut self, slug: &str) -> bool {
        self.user_pinned.insert(slug.to_string())
    }

    /// Drops slugs that no longer refer to a note. Returns how many were removed.
    pub fn prune(&mut self, existing: &HashSet<&str>) -> usize {
        let before = self.user_pinned.len() + self.user_unpinned_public.len();
        self.user_pinned.retain(|slug| existing.contains(slug.as_str()));
        self.user_unpinned_public
            .retain(|slug| existing.contains(slug.as_str()));
        before - (self.user_pinned.len() + self.user_unpinned_public.len())
    }

    /// Reads both sets, prunes them against `notes` and writes them back.
    /// A missing pinned key seeds the set with `default_slugs` that exist plus
    /// every note the session owns.
    pub fn load<K>(
        kv: &mut K,
        notes: &[Note],
        session_id: Option<&str>,
        default_slugs: &[String],
    ) -> Result<Self>
    where
        K: KeyValueStore + ?Sized,
    {
        let existing: HashSet<&str> = notes.iter().map(|note| note.slug.as_str()).collect();
        let mut overrides = PinOverrides::default();

        match read_slug_set(kv, USER_PINNED_KEY)? {
            Some(slugs) => overrides.user_pinned = slugs,
            None => {
                overrides.user_pinned = default_slugs
                    .iter()
                    .filter(|slug| existing.contains(slug.as_str()))
                    .cloned()
                    .collect();
                if let Some(session) = session_id {
                    overrides.user_pinned.extend(
                        notes
                            .iter()
                            .filter(|note| note.is_owned_by(session))
                            .map(|note| note.slug.clone()),
                    );
                }
                tracing::debug!(
                    seeded = overrides.user_pinned.len(),
                    "seeded default pinned notes"
                );
            }
        }
        if let Some(slugs) = read_slug_set(kv, USER_UNPINNED_PUBLIC_KEY)? {
            overrides.user_unpinned_public = slugs;
        }

        let pruned = overrides.prune(&existing);
        if pruned > 0 {
            tracing::debug!(pruned, "pruned stale pin overrides");
        }
        overrides.persist_all(kv)?;
        Ok(overrides)
    }

    pub fn persist<K>(&self, kv: &mut K, set: OverrideSet) -> Result<()>
    where
        K: KeyValueStore + ?Sized,
    {
        let slugs = match set {
            OverrideSet::UserPinned => &self.user_pinned,
            OverrideSet::UserUnpinnedPublic => &self.user_unpinned_public,
        };
        let encoded = serde_json::to_string(slugs).context("encoding pin override set")?;
        kv.set(set.storage_key(), &encoded)
            .with_context(|| format!("persisting {}", set.storage_key()))
    }

    pub fn persist_all<K>(&self, kv: &mut K) -> Result<()>
    where
        K: KeyValueStore + ?Sized,
    {
        self.persist(kv, OverrideSet::UserPinned)?;
        self.persist(kv, OverrideSet::UserUnpinnedPublic)
    }
}

fn read_slug_set<K>(kv: &K, key: &str) -> Result<Option<BTreeSet<String>>>
where
    K: KeyValueStore + ?Sized,
{
    let Some(raw) = kv.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str::<Vec<String>>(&raw) {
        Ok(slugs) => Ok(Some(slugs.into_iter().collect())),
        Err(err) => {
            tracing::warn!(?err, key, "ignoring malformed pin override set");
            Ok(None)
        }
    }
}
