use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_PRIVATE_EMOJI: &str = "👋🏼";
pub const DEFAULT_PUBLIC_EMOJI: &str = "📝";
pub const DEFAULT_CATEGORY: &str = "today";
pub const DRAFT_SLUG_PREFIX: &str = "new-note-";

/// A note as the store returns it. Timestamps are unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub slug: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub emoji: Option<String>,
    pub public: bool,
    pub session_id: Option<String>,
    pub category: Option<String>,
    pub pinned: Option<bool>,
    pub pin_order: Option<i64>,
    pub updated_at: Option<i64>,
    pub creation_time: i64,
}

impl Note {
    /// `updated_at` when present, otherwise the creation time.
    pub fn effective_timestamp(&self) -> i64 {
        self.updated_at.unwrap_or(self.creation_time)
    }

    pub fn is_admin_pinned(&self) -> bool {
        self.pinned == Some(true)
    }

    pub fn is_owned_by(&self, session_id: &str) -> bool {
        !self.public && self.session_id.as_deref() == Some(session_id)
    }

    pub fn is_visible_to(&self, session_id: Option<&str>) -> bool {
        if self.public {
            return true;
        }
        match (self.session_id.as_deref(), session_id) {
            (Some(owner), Some(current)) => owner == current,
            _ => false,
        }
    }

    pub fn display_title(&self) -> &str {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title,
            _ => "Untitled",
        }
    }

    pub fn display_emoji(&self) -> &str {
        match self.emoji.as_deref() {
            Some(emoji) if !emoji.is_empty() => emoji,
            _ if self.public => DEFAULT_PUBLIC_EMOJI,
            _ => DEFAULT_PRIVATE_EMOJI,
        }
    }

    /// Applies user-editable fields in place. Used for optimistic local updates.
    pub fn apply_fields(&mut self, fields: &NoteFields) {
        if let Some(title) = &fields.title {
            self.title = Some(title.clone());
        }
        if let Some(content) = &fields.content {
            self.content = Some(content.clone());
        }
        if let Some(emoji) = &fields.emoji {
            self.emoji = Some(emoji.clone());
        }
    }
}

/// Partial update over the fields a session may edit on its own notes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFields {
    pub title: Option<String>,
    pub content: Option<String>,
    pub emoji: Option<String>,
}

impl NoteFields {
    pub fn title(value: impl Into<String>) -> Self {
        Self {
            title: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn content(value: impl Into<String>) -> Self {
        Self {
            content: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn emoji(value: impl Into<String>) -> Self {
        Self {
            emoji: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.emoji.is_none()
    }

    /// Later values win; fields absent from `other` are kept.
    pub fn merge(&mut self, other: NoteFields) {
        if other.title.is_some() {
            self.title = other.title;
        }
        if other.content.is_some() {
            self.content = other.content;
        }
        if other.emoji.is_some() {
            self.emoji = other.emoji;
        }
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(3);
        if self.title.is_some() {
            names.push("title");
        }
        if self.content.is_some() {
            names.push("content");
        }
        if self.emoji.is_some() {
            names.push("emoji");
        }
        names
    }
}

/// Administrator patch; any field of any note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub emoji: Option<String>,
    pub public: Option<bool>,
    pub category: Option<String>,
    pub pinned: Option<bool>,
    pub pin_order: Option<i64>,
}

impl AdminPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.emoji.is_none()
            && self.public.is_none()
            && self.category.is_none()
            && self.pinned.is_none()
            && self.pin_order.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub slug: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub emoji: Option<String>,
    pub public: bool,
    pub session_id: Option<String>,
    pub category: Option<String>,
    pub pinned: Option<bool>,
    pub pin_order: Option<i64>,
}

impl NewNote {
    /// Empty private note owned by `session_id` under a generated slug.
    pub fn private_draft(session_id: &str) -> Self {
        Self {
            slug: format!("{DRAFT_SLUG_PREFIX}{}", Uuid::new_v4()),
            title: Some(String::new()),
            content: Some(String::new()),
            emoji: Some(DEFAULT_PRIVATE_EMOJI.to_string()),
            public: false,
            session_id: Some(session_id.to_string()),
            category: Some(DEFAULT_CATEGORY.to_string()),
            pinned: None,
            pin_order: None,
        }
    }

    pub fn public(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: None,
            content: None,
            emoji: Some(DEFAULT_PUBLIC_EMOJI.to_string()),
            public: true,
            session_id: None,
            category: None,
            pinned: None,
            pin_order: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinOrderEntry {
    pub slug: String,
    pub pin_order: i64,
}

pub fn now_millis() -> i64 {
    to_millis(OffsetDateTime::now_utc())
}

/// Local wall clock, falling back to UTC when the offset cannot be determined.
pub fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

pub fn to_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Out-of-range values clamp to the unix epoch.
pub fn from_millis(millis: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}
