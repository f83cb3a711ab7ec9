use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use regex::Regex;
use time::macros::format_description;
use time::OffsetDateTime;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::app::{AppState, EditField, EditorState, Focus, PaletteEntry};
use crate::config::themes::Palette;
use crate::highlight::{build_highlight_regex, split_matches};
use crate::model::{from_millis, Note};
use crate::search::SearchQuery;
use crate::sync::SyncStatus;

/// One line of the note list: a bucket header or a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListRow {
    Header(String),
    Note {
        slug: String,
        emoji: String,
        title: String,
        pinned: bool,
    },
}

impl ListRow {
    fn from_note(note: &Note, pinned: bool) -> Self {
        ListRow::Note {
            slug: note.slug.clone(),
            emoji: note.display_emoji().to_string(),
            title: note.display_title().to_string(),
            pinned,
        }
    }
}

/// Grouped rows normally; a flat result list while a search is active.
pub fn list_rows(state: &AppState) -> Vec<ListRow> {
    if let Some(results) = state.navigator.results() {
        let mut rows = vec![ListRow::Header(match results.len() {
            0 => "No matching notes".to_string(),
            1 => "1 result".to_string(),
            n => format!("{n} results"),
        })];
        rows.extend(
            results
                .iter()
                .map(|note| ListRow::from_note(note, state.overrides().is_pinned(note))),
        );
        return rows;
    }
    let mut rows = Vec::with_capacity(state.notes().len() + 8);
    for (bucket, notes) in state.groups().iter() {
        rows.push(ListRow::Header(bucket.label()));
        rows.extend(
            notes
                .iter()
                .map(|note| ListRow::from_note(note, state.overrides().is_pinned(note))),
        );
    }
    rows
}

/// Row the list should highlight: the search highlight or the selection.
fn active_row(state: &AppState, rows: &[ListRow]) -> Option<usize> {
    let target = match state.navigator.highlighted_note() {
        Some(note) => Some(note.slug.as_str()),
        None if state.navigator.is_searching() => None,
        None => state.navigator.selected(),
    }?;
    rows.iter()
        .position(|row| matches!(row, ListRow::Note { slug, .. } if slug == target))
}

pub fn draw_app(frame: &mut Frame, state: &AppState, list_state: &mut ListState, palette: Palette) {
    let base = Style::default().fg(palette.foreground).bg(palette.background);
    frame.render_widget(Block::default().style(base), frame.size());

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(2),
        ])
        .split(frame.size());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(38), Constraint::Percentage(62)])
        .split(vertical[1]);

    let highlight_regex = SearchQuery::parse(state.navigator.query_input())
        .and_then(|query| build_highlight_regex(&query));
    let match_style = Style::default()
        .fg(palette.search_match)
        .add_modifier(Modifier::BOLD);

    draw_search_bar(frame, state, vertical[0], palette);

    let rows = list_rows(state);
    let items: Vec<ListItem> = if rows.is_empty() {
        vec![ListItem::new("No notes yet. Press `n` to create one.")]
    } else {
        rows.iter()
            .map(|row| list_item(row, highlight_regex.as_ref(), match_style, palette))
            .collect()
    };
    list_state.select(active_row(state, &rows));
    let list_border = if state.navigator.focus() == Focus::List {
        palette.accent
    } else {
        palette.muted
    };
    let list = List::new(items)
        .block(
            Block::default()
                .title("Notes")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(list_border)),
        )
        .highlight_style(
            Style::default()
                .bg(palette.selection_bg)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, columns[0], list_state);

    frame.render_widget(Clear, columns[1]);
    match state.editor() {
        Some(editor) => draw_editor(frame, editor, columns[1], palette),
        None => {
            let detail = note_detail(state, highlight_regex.as_ref(), match_style, palette);
            let paragraph = Paragraph::new(detail)
                .block(
                    Block::default()
                        .title("Note")
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(palette.muted)),
                )
                .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, columns[1]);
        }
    }

    let status =
        Paragraph::new(status_text(state, palette)).style(Style::default().fg(palette.muted));
    frame.render_widget(status, vertical[2]);

    if state.is_palette_open() {
        draw_palette(frame, state, palette);
    }
}

fn draw_search_bar(frame: &mut Frame, state: &AppState, area: Rect, palette: Palette) {
    let focused = state.navigator.focus() == Focus::SearchInput;
    let query = state.navigator.query_input();
    let text = if query.is_empty() && !focused {
        Span::styled("Press / to search", Style::default().fg(palette.muted))
    } else {
        Span::raw(query.to_string())
    };
    let border = if focused { palette.accent } else { palette.muted };
    let bar = Paragraph::new(Line::from(text)).block(
        Block::default()
            .title("Search")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    frame.render_widget(bar, area);
    if focused {
        let width = UnicodeWidthStr::width(query) as u16;
        frame.set_cursor(
            (area.x + 1 + width).min(area.right().saturating_sub(2)),
            area.y + 1,
        );
    }
}

fn list_item(
    row: &ListRow,
    regex: Option<&Regex>,
    match_style: Style,
    palette: Palette,
) -> ListItem<'static> {
    match row {
        ListRow::Header(label) => ListItem::new(Line::from(Span::styled(
            label.clone(),
            Style::default()
                .fg(palette.header)
                .add_modifier(Modifier::BOLD),
        ))),
        ListRow::Note {
            emoji,
            title,
            pinned,
            ..
        } => {
            let mut spans = vec![Span::raw(format!("  {emoji} "))];
            spans.extend(highlight_spans(title, regex, match_style, Style::default()));
            if *pinned {
                spans.push(Span::styled(" ★", Style::default().fg(palette.accent)));
            }
            ListItem::new(Line::from(spans))
        }
    }
}

fn note_detail(
    state: &AppState,
    regex: Option<&Regex>,
    match_style: Style,
    palette: Palette,
) -> Text<'static> {
    let Some(note) = state.focused_note() else {
        return Text::from("Select a note to see its contents.");
    };
    let meta_style = Style::default().fg(palette.muted);
    let mut title = vec![Span::raw(format!("{} ", note.display_emoji()))];
    title.extend(highlight_spans(
        note.display_title(),
        regex,
        match_style,
        Style::default().add_modifier(Modifier::BOLD),
    ));

    let visibility = if note.public { "Public" } else { "Private" };
    let bucket = state
        .bucket_of(&note.slug)
        .map(|bucket| bucket.label())
        .unwrap_or_default();
    let updated = format_timestamp(from_millis(note.effective_timestamp()));

    let mut lines = vec![
        Line::from(title),
        Line::from(Span::styled(format!("{visibility} · {bucket}"), meta_style)),
        Line::from(Span::styled(format!("Updated {updated}"), meta_style)),
        Line::from(""),
    ];
    let content = note.content.as_deref().unwrap_or_default();
    if content.is_empty() {
        lines.push(Line::from(Span::styled("(empty)", meta_style)));
    } else {
        lines.extend(content.lines().map(|line| {
            Line::from(highlight_spans(line, regex, match_style, Style::default()))
        }));
    }
    Text::from(lines)
}

fn draw_editor(frame: &mut Frame, editor: &EditorState, area: Rect, palette: Palette) {
    let title = match editor.field() {
        EditField::Title => "Editing title (Enter or Esc to finish)",
        EditField::Content => "Editing content (Esc to finish)",
    };
    let paragraph = Paragraph::new(editor.buffer().to_string())
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
    if let Some((x, y)) = editor_cursor_screen_position(editor, area) {
        frame.set_cursor(x, y);
    }
}

fn draw_palette(frame: &mut Frame, state: &AppState, palette: Palette) {
    let Some(palette_state) = state.palette() else {
        return;
    };
    let area = centered_rect(60, 50, frame.size());
    frame.render_widget(Clear, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let input = Paragraph::new(palette_state.input().to_string()).block(
        Block::default()
            .title("Type a command or search for a note")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.accent)),
    );
    frame.render_widget(input, chunks[0]);

    let items: Vec<ListItem> = if palette_state.entries().is_empty() {
        vec![ListItem::new("No results found")]
    } else {
        palette_state
            .entries()
            .iter()
            .map(|entry| match entry {
                PaletteEntry::Command(command) => ListItem::new(Line::from(vec![
                    Span::raw(command.to_string()),
                    Span::styled(
                        format!("  {}", command.shortcut()),
                        Style::default().fg(palette.muted),
                    ),
                ])),
                PaletteEntry::Note { label, .. } => ListItem::new(label.clone()),
            })
            .collect()
    };
    let mut list_state = ListState::default();
    list_state.select(palette_state.selected_index());
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(Style::default().bg(palette.selection_bg));
    frame.render_stateful_widget(list, chunks[1], &mut list_state);
}

fn status_text(state: &AppState, palette: Palette) -> Text<'static> {
    let mut first = Vec::new();
    if let Some(message) = state.status_message() {
        first.push(Span::styled(
            message.to_string(),
            Style::default().fg(palette.warning),
        ));
    }
    let sync = sync_label(state.sync_status());
    if !sync.is_empty() {
        if !first.is_empty() {
            first.push(Span::raw(" | "));
        }
        first.push(Span::raw(sync));
    }
    let hints = match state.navigator.focus() {
        Focus::List => concat!(
            "j/k move • / search • p pin • d delete • n new • e edit • r rename",
            " • t theme • Ctrl-K palette • q quit"
        ),
        Focus::SearchInput => "type to filter • Enter open • Esc leave search",
        Focus::Editor => "type to edit • Ctrl-Z undo • Ctrl-Y redo • Esc finish",
    };
    Text::from(vec![Line::from(first), Line::from(hints)])
}

/// Short description of the edit sync state for the status line.
pub fn sync_label(status: &SyncStatus) -> String {
    match status {
        SyncStatus::Inactive => String::new(),
        SyncStatus::Idle {
            last_synced_at: None,
            ..
        } => "No changes".to_string(),
        SyncStatus::Idle {
            last_synced_at: Some(at),
            ..
        } => format!("Saved {}", format_time_short(*at)),
        SyncStatus::Pending { fields, .. } => format!("Saving {}…", fields.join(", ")),
        SyncStatus::Error { message, .. } => format!("Not saved: {message}"),
    }
}

fn format_time_short(dt: OffsetDateTime) -> String {
    dt.format(&format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| dt.unix_timestamp().to_string())
}

fn format_timestamp(dt: OffsetDateTime) -> String {
    dt.format(&format_description!(
        "[year]-[month]-[day] [hour]:[minute]"
    ))
    .unwrap_or_else(|_| dt.unix_timestamp().to_string())
}

fn highlight_spans(
    text: &str,
    regex: Option<&Regex>,
    match_style: Style,
    base_style: Style,
) -> Vec<Span<'static>> {
    split_matches(text, regex)
        .into_iter()
        .map(|segment| {
            let style = if segment.matched { match_style } else { base_style };
            Span::styled(segment.text.to_string(), style)
        })
        .collect()
}

fn editor_cursor_screen_position(editor: &EditorState, area: Rect) -> Option<(u16, u16)> {
    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2);
    if inner_width == 0 || inner_height == 0 {
        return None;
    }
    let buffer = editor.buffer();
    let mut row = 0u16;
    let mut col = 0usize;
    for grapheme in buffer[..editor.cursor()].graphemes(true) {
        if grapheme == "\n" {
            row += 1;
            col = 0;
            continue;
        }
        let width = UnicodeWidthStr::width(grapheme);
        if width > 0 && col + width > inner_width {
            row += 1;
            col = 0;
        }
        col += width;
    }
    let row = row.min(inner_height - 1);
    let col = col.min(inner_width - 1) as u16;
    Some((area.x + 1 + col, area.y + 1 + row))
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThemeName;
    use crate::model::fixtures::{admin_pinned, note};
    use crate::model::{local_now, to_millis};
    use time::Duration;

    fn render(rows: &[ListRow]) -> String {
        rows.iter()
            .map(|row| match row {
                ListRow::Header(label) => format!("# {label}"),
                ListRow::Note {
                    emoji,
                    title,
                    pinned,
                    ..
                } => format!("  {emoji} {title}{}", if *pinned { " ★" } else { "" }),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn sample_state() -> AppState {
        let now = local_now();
        let today = to_millis(now);
        let last_week = to_millis(now - Duration::days(3));
        let mut state = AppState::new(None, ThemeName::Dark, "about-me");
        state.set_notes(
            vec![
                admin_pinned("about-me", Some(0), 0),
                note("groceries", Some(today), today),
                note("trip", Some(last_week), last_week),
            ],
            now,
        );
        state
    }

    #[test]
    fn grouped_rows_have_bucket_headers() {
        let state = sample_state();
        insta::assert_snapshot!(render(&list_rows(&state)), @r###"
        # Pinned
          📝 about-me ★
        # Today
          📝 groceries
        # Previous 7 Days
          📝 trip
        "###);
        assert_eq!(active_row(&state, &list_rows(&state)), Some(1));
    }

    #[test]
    fn search_rows_are_flat_results() {
        let mut state = sample_state();
        state.set_query("TRIP");
        insta::assert_snapshot!(render(&list_rows(&state)), @r###"
        # 1 result
          📝 trip
        "###);
        state.set_query("nothing");
        let rows = list_rows(&state);
        assert_eq!(rows, vec![ListRow::Header("No matching notes".into())]);
        assert_eq!(active_row(&state, &rows), None);
    }

    #[test]
    fn sync_labels_describe_queue_state() {
        assert_eq!(sync_label(&SyncStatus::Inactive), "");
        assert_eq!(
            sync_label(&SyncStatus::Pending {
                slug: "a".into(),
                since: OffsetDateTime::UNIX_EPOCH,
                fields: vec!["title", "content"],
            }),
            "Saving title, content…"
        );
    }
}
