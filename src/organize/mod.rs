use std::cmp::Reverse;

use indexmap::IndexMap;
use time::OffsetDateTime;

use crate::model::Note;
use crate::pins::PinOverrides;

mod bucket;

pub use bucket::{classify, classify_timestamp, Bucket};

/// Notes partitioned into buckets, in display order. Empty buckets are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteGroups {
    groups: IndexMap<Bucket, Vec<Note>>,
}

impl NoteGroups {
    pub fn iter(&self) -> impl Iterator<Item = (&Bucket, &[Note])> {
        self.groups
            .iter()
            .map(|(bucket, notes)| (bucket, notes.as_slice()))
    }

    pub fn buckets(&self) -> impl Iterator<Item = &Bucket> {
        self.groups.keys()
    }

    pub fn get(&self, bucket: &Bucket) -> Option<&[Note]> {
        self.groups.get(bucket).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn note_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Concatenation of all buckets; the order sequential navigation walks.
    pub fn flatten(&self) -> Vec<&Note> {
        self.groups.values().flatten().collect()
    }

    pub fn flattened_slugs(&self) -> Vec<String> {
        self.groups
            .values()
            .flatten()
            .map(|note| note.slug.clone())
            .collect()
    }

    pub fn bucket_of(&self, slug: &str) -> Option<&Bucket> {
        self.groups
            .iter()
            .find(|(_, notes)| notes.iter().any(|note| note.slug == slug))
            .map(|(bucket, _)| bucket)
    }
}

pub fn group(notes: &[Note], overrides: &PinOverrides, now: OffsetDateTime) -> NoteGroups {
    let mut groups: IndexMap<Bucket, Vec<Note>> = IndexMap::new();
    for note in notes {
        groups
            .entry(classify(note, overrides, now))
            .or_default()
            .push(note.clone());
    }
    groups.sort_keys();
    for (bucket, members) in groups.iter_mut() {
        sort_bucket(*bucket, members);
    }
    NoteGroups { groups }
}

fn sort_bucket(bucket: Bucket, notes: &mut [Note]) {
    if bucket == Bucket::Pinned {
        notes.sort_by(|a, b| {
            let a_key = (
                a.pin_order.unwrap_or(i64::MAX),
                Reverse(a.effective_timestamp()),
            );
            let b_key = (
                b.pin_order.unwrap_or(i64::MAX),
                Reverse(b.effective_timestamp()),
            );
            a_key.cmp(&b_key).then_with(|| a.slug.cmp(&b.slug))
        });
    } else {
        notes.sort_by(|a, b| {
            b.effective_timestamp()
                .cmp(&a.effective_timestamp())
                .then_with(|| a.slug.cmp(&b.slug))
        });
    }
}

/// Keeps public notes and private notes owned by `session_id`.
pub fn visible_notes(notes: &[Note], session_id: Option<&str>) -> Vec<Note> {
    notes
        .iter()
        .filter(|note| note.is_visible_to(session_id))
        .cloned()
        .collect()
}
