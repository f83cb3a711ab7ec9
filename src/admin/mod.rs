//! Administrator operations: the shared-secret gate and pinned-note ordering.
//!
//! The gate is a plain equality check against the configured secret. It keeps
//! casual users out of the admin commands; it is not a security boundary.

use std::cmp::Reverse;

use anyhow::{Context, Result};
use clap::ValueEnum;
use thiserror::Error;

use crate::model::{Note, PinOrderEntry};
use crate::storage::NoteStore;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdminError {
    #[error("admin commands are disabled: no admin secret configured")]
    Disabled,
    #[error("invalid admin secret")]
    InvalidSecret,
}

pub struct AdminGate;

impl AdminGate {
    pub fn verify(configured: Option<&str>, supplied: &str) -> Result<(), AdminError> {
        match configured {
            None => Err(AdminError::Disabled),
            Some(secret) if secret == supplied => Ok(()),
            Some(_) => {
                tracing::warn!("rejected admin command with wrong secret");
                Err(AdminError::InvalidSecret)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Public notes an administrator pinned, in display order.
pub fn admin_pinned(notes: &[Note]) -> Vec<Note> {
    let mut pinned: Vec<Note> = notes
        .iter()
        .filter(|note| note.public && note.is_admin_pinned())
        .cloned()
        .collect();
    pinned.sort_by_key(|note| {
        (
            note.pin_order.unwrap_or(i64::MAX),
            Reverse(note.creation_time),
        )
    });
    pinned
}

/// Swaps `slug` with its neighbour and renumbers every pinned note by index.
/// `None` when the note is not pinned or already at that end.
pub fn reorder(
    pinned: &[Note],
    slug: &str,
    direction: MoveDirection,
) -> Option<Vec<PinOrderEntry>> {
    let index = pinned.iter().position(|note| note.slug == slug)?;
    let target = match direction {
        MoveDirection::Up => index.checked_sub(1)?,
        MoveDirection::Down => Some(index + 1).filter(|next| *next < pinned.len())?,
    };
    let mut slugs: Vec<&str> = pinned.iter().map(|note| note.slug.as_str()).collect();
    slugs.swap(index, target);
    Some(
        slugs
            .into_iter()
            .enumerate()
            .map(|(position, slug)| PinOrderEntry {
                slug: slug.to_string(),
                pin_order: position as i64,
            })
            .collect(),
    )
}

/// Loads the pinned notes from `store`, moves `slug` and writes the new order.
/// Returns whether anything changed.
pub fn move_pinned<S>(store: &S, slug: &str, direction: MoveDirection) -> Result<bool>
where
    S: NoteStore + ?Sized,
{
    let notes = store.list_all().context("listing notes for reorder")?;
    let pinned = admin_pinned(&notes);
    let Some(entries) = reorder(&pinned, slug, direction) else {
        return Ok(false);
    };
    store
        .admin_reorder_pins(&entries)
        .with_context(|| format!("reordering pinned notes around {slug}"))?;
    tracing::info!(slug = %slug, ?direction, "moved pinned note");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{admin_pinned as pinned_note, note, private_note};
    use crate::storage::testing::RecordingStore;
    use assert_matches::assert_matches;

    fn orders(entries: &[PinOrderEntry]) -> Vec<(&str, i64)> {
        entries
            .iter()
            .map(|entry| (entry.slug.as_str(), entry.pin_order))
            .collect()
    }

    #[test]
    fn gate_requires_configured_matching_secret() {
        assert_eq!(AdminGate::verify(None, "anything"), Err(AdminError::Disabled));
        assert_eq!(
            AdminGate::verify(Some("s3cret"), "guess"),
            Err(AdminError::InvalidSecret)
        );
        assert_matches!(AdminGate::verify(Some("s3cret"), "s3cret"), Ok(()));
    }

    #[test]
    fn admin_pinned_orders_by_pin_order_then_newest() {
        let mut private = private_note("mine", "me", 5);
        private.pinned = Some(true);
        let notes = vec![
            pinned_note("unordered-old", None, 1),
            pinned_note("second", Some(1), 0),
            note("plain", None, 0),
            pinned_note("unordered-new", None, 9),
            pinned_note("first", Some(0), 0),
            private,
        ];
        let slugs: Vec<_> = admin_pinned(&notes).into_iter().map(|n| n.slug).collect();
        assert_eq!(
            slugs,
            vec!["first", "second", "unordered-new", "unordered-old"]
        );
    }

    #[test]
    fn reorder_swaps_and_renumbers() {
        let pinned = vec![
            pinned_note("a", Some(0), 0),
            pinned_note("b", Some(5), 0),
            pinned_note("c", None, 0),
        ];
        let moved = reorder(&pinned, "c", MoveDirection::Up).unwrap_or_default();
        assert_eq!(orders(&moved), vec![("a", 0), ("c", 1), ("b", 2)]);
        assert_eq!(reorder(&pinned, "a", MoveDirection::Up), None);
        assert_eq!(reorder(&pinned, "c", MoveDirection::Down), None);
        assert_eq!(reorder(&pinned, "missing", MoveDirection::Down), None);
    }

    #[test]
    fn move_pinned_writes_new_order() -> Result<()> {
        let store = RecordingStore::with_notes(vec![
            pinned_note("about-me", Some(0), 0),
            pinned_note("quick-links", Some(1), 0),
        ]);
        assert!(move_pinned(&store, "quick-links", MoveDirection::Up)?);
        assert_eq!(store.note("quick-links").and_then(|n| n.pin_order), Some(0));
        assert_eq!(store.note("about-me").and_then(|n| n.pin_order), Some(1));
        assert!(!move_pinned(&store, "about-me", MoveDirection::Down)?);
        Ok(())
    }
}
