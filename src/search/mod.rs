use crate::model::Note;

/// Trimmed, lowercased needle. `None` for blank input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    raw: String,
    needle: String,
}

impl SearchQuery {
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            raw: trimmed.to_string(),
            needle: trimmed.to_lowercase(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, note: &Note) -> bool {
        contains_needle(note.title.as_deref(), &self.needle)
            || contains_needle(note.content.as_deref(), &self.needle)
    }
}

fn contains_needle(haystack: Option<&str>, needle: &str) -> bool {
    haystack
        .map(|text| text.to_lowercase().contains(needle))
        .unwrap_or(false)
}

/// Notes visible to `session_id` whose title or content contains the query,
/// case-insensitively. Input order is preserved.
pub fn filter_notes(notes: &[Note], query: &SearchQuery, session_id: Option<&str>) -> Vec<Note> {
    notes
        .iter()
        .filter(|note| note.is_visible_to(session_id) && query.matches(note))
        .cloned()
        .collect()
}
