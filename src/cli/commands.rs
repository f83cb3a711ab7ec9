use std::fmt::Write as _;
use std::io::{self, Read};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use time::format_description::well_known::Rfc3339;

use crate::admin::{self, AdminGate, MoveDirection};
use crate::app::ActionDispatcher;
use crate::config::AppConfig;
use crate::local::{self, KeyValueStore};
use crate::model::{from_millis, local_now, AdminPatch, NewNote, Note, NoteFields};
use crate::organize;
use crate::pins::{OverrideSet, PinOverrides};
use crate::search::{filter_notes, SearchQuery};
use crate::storage::NoteStore;
use crate::sync::{EditSyncQueue, SyncEvent};

#[derive(Args, Debug, Clone, Default)]
pub struct NewArgs {
    #[arg(long)]
    pub title: Option<String>,
    /// Note body. If omitted and stdin is piped, reads from stdin.
    #[arg(long)]
    pub content: Option<String>,
    #[arg(long)]
    pub emoji: Option<String>,
}

impl NewArgs {
    pub fn with_piped_content(mut self) -> Result<Self> {
        if self.content.is_none() {
            self.content = read_stdin()?;
        }
        Ok(self)
    }

    fn fields(&self) -> NoteFields {
        NoteFields {
            title: self.title.clone(),
            content: self.content.clone(),
            emoji: self.emoji.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Case-insensitive text matched against titles and content
    #[arg(required = true)]
    pub query: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PinArgs {
    pub slug: String,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub slug: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub content: Option<String>,
    #[arg(long)]
    pub emoji: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    pub slug: String,
    /// Confirm the deletion
    #[arg(long)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AdminArgs {
    /// Shared admin secret, compared against `admin.secret` in the config
    #[arg(long)]
    pub secret: String,
    #[command(subcommand)]
    pub command: AdminCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommand {
    /// List every note, pinned notes first
    List,
    /// Create a public note
    Create(AdminNoteArgs),
    /// Patch any field of any note
    Update(AdminNoteArgs),
    /// Delete any note
    Delete { slug: String },
    /// Change a note's slug
    Rename { from: String, to: String },
    /// Move a pinned note within the pinned order
    Move {
        slug: String,
        #[arg(value_enum)]
        direction: MoveDirection,
    },
}

#[derive(Args, Debug, Clone)]
pub struct AdminNoteArgs {
    pub slug: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub content: Option<String>,
    #[arg(long)]
    pub emoji: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub public: Option<bool>,
    #[arg(long)]
    pub pinned: Option<bool>,
    #[arg(long)]
    pub pin_order: Option<i64>,
}

impl AdminNoteArgs {
    fn patch(&self) -> AdminPatch {
        AdminPatch {
            title: self.title.clone(),
            content: self.content.clone(),
            emoji: self.emoji.clone(),
            public: self.public,
            category: self.category.clone(),
            pinned: self.pinned,
            pin_order: self.pin_order,
        }
    }
}

/// Session identity, visible notes and the resolved pin overrides.
struct SessionView {
    session_id: String,
    notes: Vec<Note>,
    overrides: PinOverrides,
}

fn load_view<S, K>(store: &S, kv: &mut K, config: &AppConfig) -> Result<SessionView>
where
    S: NoteStore + ?Sized,
    K: KeyValueStore + ?Sized,
{
    let session_id = local::session_id(kv)?;
    let notes = ActionDispatcher::new(store, Some(&session_id)).fetch_visible()?;
    let overrides = PinOverrides::load(kv, &notes, Some(&session_id), &config.pins.default_slugs)?;
    Ok(SessionView {
        session_id,
        notes,
        overrides,
    })
}

pub fn new_note<S, K>(store: &S, kv: &mut K, config: &AppConfig, args: &NewArgs) -> Result<String>
where
    S: NoteStore + ?Sized,
    K: KeyValueStore + ?Sized,
{
    let session_id = local::session_id(kv)?;
    let created = ActionDispatcher::new(store, Some(&session_id)).create_note()?;
    let fields = args.fields();
    if !fields.is_empty() {
        store
            .update(&created.slug, &session_id, &fields)
            .with_context(|| format!("writing fields of {}", created.slug))?;
    }

    let mut view = load_view(store, kv, config)?;
    if view.overrides.pin_new(&created.slug) {
        view.overrides.persist(kv, OverrideSet::UserPinned)?;
    }
    tracing::info!(slug = %created.slug, "created note from cli");
    Ok(format!("Created note {}\n", created.slug))
}

pub fn list_notes<S, K>(store: &S, kv: &mut K, config: &AppConfig) -> Result<String>
where
    S: NoteStore + ?Sized,
    K: KeyValueStore + ?Sized,
{
    let view = load_view(store, kv, config)?;
    let groups = organize::group(&view.notes, &view.overrides, local_now());
    if groups.is_empty() {
        return Ok("No notes yet.\n".to_string());
    }
    let mut out = String::new();
    for (bucket, notes) in groups.iter() {
        let _ = writeln!(&mut out, "{}", bucket.label());
        for note in notes {
            let _ = writeln!(&mut out, "  {}", headline(note, &view.session_id));
        }
        out.push('\n');
    }
    Ok(out)
}

pub fn search_notes<S, K>(store: &S, kv: &mut K, args: &SearchArgs) -> Result<String>
where
    S: NoteStore + ?Sized,
    K: KeyValueStore + ?Sized,
{
    let raw_query = args.query.join(" ");
    let Some(query) = SearchQuery::parse(&raw_query) else {
        bail!("search query cannot be empty");
    };
    let session_id = local::session_id(kv)?;
    let notes = ActionDispatcher::new(store, Some(&session_id)).fetch_visible()?;
    let mut results = filter_notes(&notes, &query, Some(&session_id));
    results.sort_by(|a, b| b.effective_timestamp().cmp(&a.effective_timestamp()));
    Ok(format_search_results(&results, &session_id))
}

fn format_search_results(notes: &[Note], session_id: &str) -> String {
    if notes.is_empty() {
        return "No matches found.\n".to_string();
    }
    let mut out = String::new();
    for note in notes {
        let _ = writeln!(&mut out, "{}", headline(note, session_id));
        let _ = writeln!(
            &mut out,
            "    updated {}",
            format_timestamp(note.effective_timestamp())
        );
        if let Some(snippet) = build_snippet(note, 2) {
            let _ = writeln!(&mut out, "    {snippet}");
        }
        out.push('\n');
    }
    out
}

pub fn toggle_pin<S, K>(store: &S, kv: &mut K, config: &AppConfig, args: &PinArgs) -> Result<String>
where
    S: NoteStore + ?Sized,
    K: KeyValueStore + ?Sized,
{
    let mut view = load_view(store, kv, config)?;
    let Some(note) = view.notes.iter().find(|note| note.slug == args.slug) else {
        bail!("note {} not found", args.slug);
    };
    let change = view.overrides.toggle(note);
    view.overrides.persist(kv, change.set)?;
    let verb = if change.pinned { "Pinned" } else { "Unpinned" };
    Ok(format!("{verb} {}\n", note.display_title()))
}

pub fn edit_note<S, K>(store: &S, kv: &mut K, config: &AppConfig, args: &EditArgs) -> Result<String>
where
    S: NoteStore + ?Sized,
    K: KeyValueStore + ?Sized,
{
    let fields = NoteFields {
        title: args.title.clone(),
        content: args.content.clone(),
        emoji: args.emoji.clone(),
    };
    if fields.is_empty() {
        bail!("nothing to update: pass --title, --content or --emoji");
    }
    let session_id = local::session_id(kv)?;
    let note = store
        .get_by_slug(&args.slug, Some(&session_id))
        .with_context(|| format!("loading note {}", args.slug))?;
    let Some(note) = note else {
        bail!("note {} not found", args.slug);
    };
    if !note.is_owned_by(&session_id) {
        bail!("note {} belongs to another session", args.slug);
    }

    let mut queue = EditSyncQueue::new(&config.sync);
    queue.open(note);
    queue.apply_edit(fields, Instant::now());
    match queue.flush_now(store, Some(&session_id)) {
        Some(SyncEvent::Synced { slug, fields, .. }) => {
            Ok(format!("Updated {slug} ({})\n", fields.join(", ")))
        }
        Some(SyncEvent::Failed {
            slug,
            unauthorized: true,
            ..
        }) => bail!("not allowed to edit {slug}: the session no longer owns it"),
        Some(SyncEvent::Failed { slug, message, .. }) => {
            bail!("syncing {slug} failed: {message}")
        }
        None => Ok(format!("No changes for {}\n", args.slug)),
    }
}

pub fn delete_note<S, K>(store: &S, kv: &mut K, args: &DeleteArgs) -> Result<String>
where
    S: NoteStore + ?Sized,
    K: KeyValueStore + ?Sized,
{
    if !args.yes {
        bail!("refusing to delete {} without --yes", args.slug);
    }
    let session_id = local::session_id(kv)?;
    let Some(note) = store.get_by_slug(&args.slug, Some(&session_id))? else {
        bail!("note {} not found", args.slug);
    };
    if note.public {
        bail!("Public notes can't be deleted");
    }
    ActionDispatcher::new(store, Some(&session_id)).delete_note(&note.slug)?;
    Ok(format!("Deleted {}\n", note.display_title()))
}

pub fn run_admin<S>(store: &S, config: &AppConfig, args: AdminArgs) -> Result<String>
where
    S: NoteStore + ?Sized,
{
    AdminGate::verify(config.admin.secret.as_deref(), &args.secret)?;
    match args.command {
        AdminCommand::List => admin_list(store),
        AdminCommand::Create(note_args) => {
            let mut new_note = NewNote::public(note_args.slug.clone());
            new_note.title = note_args.title.clone();
            new_note.content = note_args.content.clone();
            if let Some(emoji) = &note_args.emoji {
                new_note.emoji = Some(emoji.clone());
            }
            new_note.public = note_args.public.unwrap_or(true);
            new_note.category = note_args.category.clone();
            new_note.pinned = note_args.pinned;
            new_note.pin_order = note_args.pin_order;
            let created = store
                .admin_create(&new_note)
                .with_context(|| format!("creating note {}", new_note.slug))?;
            Ok(format!("Created note {}\n", created.slug))
        }
        AdminCommand::Update(note_args) => {
            let patch = note_args.patch();
            if patch.is_empty() {
                bail!("nothing to update for {}", note_args.slug);
            }
            store
                .admin_update(&note_args.slug, &patch)
                .with_context(|| format!("updating note {}", note_args.slug))?;
            Ok(format!("Updated {}\n", note_args.slug))
        }
        AdminCommand::Delete { slug } => {
            store
                .admin_delete(&slug)
                .with_context(|| format!("deleting note {slug}"))?;
            Ok(format!("Deleted {slug}\n"))
        }
        AdminCommand::Rename { from, to } => {
            store
                .admin_update_slug(&from, &to)
                .with_context(|| format!("renaming {from} to {to}"))?;
            Ok(format!("Renamed {from} to {to}\n"))
        }
        AdminCommand::Move { slug, direction } => {
            if admin::move_pinned(store, &slug, direction)? {
                let way = match direction {
                    MoveDirection::Up => "up",
                    MoveDirection::Down => "down",
                };
                Ok(format!("Moved {slug} {way}\n"))
            } else {
                Ok(format!("{slug} is not pinned or already at that end\n"))
            }
        }
    }
}

fn admin_list<S>(store: &S) -> Result<String>
where
    S: NoteStore + ?Sized,
{
    let notes = store.list_all().context("listing notes")?;
    let pinned = admin::admin_pinned(&notes);
    let mut out = String::new();
    if !pinned.is_empty() {
        out.push_str("Pinned\n");
        for note in &pinned {
            let _ = writeln!(
                &mut out,
                "  {:>3}  {}  {}",
                note.pin_order.map(|order| order.to_string()).unwrap_or_else(|| "-".into()),
                note.slug,
                note.display_title()
            );
        }
        out.push('\n');
    }
    let mut rest: Vec<&Note> = notes
        .iter()
        .filter(|note| !pinned.iter().any(|p| p.slug == note.slug))
        .collect();
    rest.sort_by(|a, b| b.effective_timestamp().cmp(&a.effective_timestamp()));
    if !rest.is_empty() {
        out.push_str("Notes\n");
        for note in rest {
            let visibility = if note.public { "public" } else { "private" };
            let _ = writeln!(
                &mut out,
                "  {}  [{visibility}]  {}",
                note.slug,
                note.display_title()
            );
        }
    }
    if out.is_empty() {
        out.push_str("No notes.\n");
    }
    Ok(out)
}

fn headline(note: &Note, session_id: &str) -> String {
    let mut line = format!(
        "{} {}  ({})",
        note.display_emoji(),
        note.display_title(),
        note.slug
    );
    if note.is_owned_by(session_id) {
        line.push_str("  [private]");
    }
    line
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("reading note content from stdin")?;
    Ok(Some(buf))
}

fn build_snippet(note: &Note, lines: usize) -> Option<String> {
    let segments: Vec<&str> = note
        .content
        .as_deref()?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(lines)
        .collect();
    if segments.is_empty() {
        return None;
    }
    Some(segments.join(" ").chars().take(160).collect())
}

fn format_timestamp(millis: i64) -> String {
    from_millis(millis)
        .format(&Rfc3339)
        .unwrap_or_else(|_| millis.to_string())
}
