//! UI rendering functions.

use crate::app::App;
use crate::state::{Focus, LoginField, LoginForm, LoginMode, Screen, StatusKind, StatusMessage};
use moodconfig::format_timestamp;
use moodlift::types::Mood;
use moodlift::view::{LoadState, SaveState};
use moodlift::PlaylistState;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use std::time::Duration;

/// Render the application based on current screen.
pub fn render_app(f: &mut ratatui::Frame, app: &mut App) {
    if let Screen::Login(form) = &app.screen {
        render_login(f, app.status.as_ref(), form);
    } else {
        render_dashboard(f, app);
    }
}

fn render_login(f: &mut ratatui::Frame, status: Option<&StatusMessage>, form: &LoginForm) {
    let size = f.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(2)])
        .split(size);

    let popup = centered_rect(50, 50, layout[0]);
    f.render_widget(Clear, popup);

    let title = match form.mode {
        LoginMode::Login => "moodlift - log in",
        LoginMode::Register => "moodlift - create account",
    };
    let block = Block::default().title_top(title).borders(Borders::ALL);
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let fields = form.fields();
    let constraints = fields
        .iter()
        .map(|_| Constraint::Length(2))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect::<Vec<_>>();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for (idx, field) in fields.iter().enumerate() {
        let input = form.input(*field);
        let value = if *field == LoginField::Password {
            "*".repeat(input.buffer.chars().count())
        } else {
            input.buffer.clone()
        };
        let label = format!("{:>9}: ", field.label());
        let style = if *field == form.field {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let line = Line::from(vec![Span::styled(label.clone(), style), Span::raw(value)]);
        f.render_widget(Paragraph::new(line), rows[idx]);

        if *field == form.field && !form.busy {
            let offset = if *field == LoginField::Password {
                input.masked_cursor_width()
            } else {
                input.cursor_display_width()
            };
            set_cursor(f, rows[idx], label.len() + offset);
        }
    }

    let hint = match form.mode {
        LoginMode::Login => "Tab: next field  Enter: log in  F2: create account  Esc: quit",
        LoginMode::Register => "Tab: next field  Enter: register  F2: back to log in  Esc: quit",
    };
    render_footer(f, status, Line::from(hint), layout[1]);
}

fn render_dashboard(f: &mut ratatui::Frame, app: &mut App) {
    let size = f.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(2)])
        .split(size);

    let who = match app.username.as_deref() {
        Some(name) => format!("moodlift - {name}"),
        None => "moodlift".to_string(),
    };
    let block = Block::default()
        .title_top(who)
        .title_top(Line::from("[r]efresh  [L]ogout  [q]uit").right_aligned())
        .borders(Borders::ALL);
    let inner = block.inner(layout[0]);
    f.render_widget(block, layout[0]);

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Length(3),
            Constraint::Min(4),
        ])
        .split(inner);

    let pickers = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(sections[0]);

    let colors = app.config.display.show_colors;
    let (initial, target) = app.dashboard.selection();
    render_mood_picker(
        f,
        "How are you feeling now?",
        &app.dashboard.moods,
        initial,
        app.initial_cursor,
        app.focus == Focus::Initial,
        colors,
        pickers[0],
    );
    render_mood_picker(
        f,
        "How would you like to feel?",
        &app.dashboard.moods,
        target,
        app.target_cursor,
        app.focus == Focus::Target,
        colors,
        pickers[1],
    );

    render_summary(f, app, colors, sections[1]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(30), Constraint::Length(38)])
        .split(sections[2]);
    render_history(f, app, colors, bottom[0]);
    render_spotify(f, app, bottom[1]);

    let hint = match app.focus {
        Focus::Initial | Focus::Target => {
            "Tab: panel  j/k: move  Space: pick  s: save  x: clear  c: link Spotify  p: playlist"
        }
        Focus::History => "Tab: panel  j/k: move  p: playlist for row  c: link Spotify",
    };
    render_footer(f, app.status.as_ref(), Line::from(hint), layout[1]);
}

#[allow(clippy::too_many_arguments)]
fn render_mood_picker(
    f: &mut ratatui::Frame,
    title: &str,
    moods: &LoadState<Vec<Mood>>,
    selected: Option<i64>,
    cursor: usize,
    focused: bool,
    colors: bool,
    area: Rect,
) {
    let block = panel(title, focused);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let moods = match moods {
        LoadState::Ready(moods) if !moods.is_empty() => moods,
        LoadState::Ready(_) => return centered_text(f, "No moods", inner),
        LoadState::Failed(report) => return centered_text(f, &report.message, inner),
        LoadState::Idle | LoadState::Loading => return centered_text(f, "Loading...", inner),
    };

    let rows = moods
        .iter()
        .map(|mood| {
            let marker = if Some(mood.id) == selected { "●" } else { " " };
            Row::new(vec![
                Cell::from(marker),
                Cell::from(mood.name.clone()).style(mood_style(mood, colors)),
            ])
        })
        .collect::<Vec<_>>();

    let mut state = TableState::default();
    if focused {
        state.select(Some(cursor));
    }
    let table = Table::new(rows, [Constraint::Length(2), Constraint::Min(8)])
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    ensure_table_state_visible(&mut state, inner.height as usize);
    f.render_stateful_widget(table, inner, &mut state);
}

fn render_summary(f: &mut ratatui::Frame, app: &App, colors: bool, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title_top("Transition");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut spans = Vec::new();
    match app.dashboard.summary() {
        Some((from, to)) => {
            spans.push(Span::styled(from.name.clone(), mood_style(from, colors)));
            spans.push(Span::raw("  ->  "));
            spans.push(Span::styled(to.name.clone(), mood_style(to, colors)));
        }
        None => spans.push(Span::styled(
            "Pick a mood in each panel",
            Style::default().fg(Color::DarkGray),
        )),
    }
    let save = match &app.dashboard.save {
        SaveState::Saving => Span::styled("   saving...", Style::default().fg(Color::Yellow)),
        SaveState::Failed(_) => Span::styled("   save failed", Style::default().fg(Color::Red)),
        SaveState::Saved(_) | SaveState::Idle if app.dashboard.can_save() => {
            Span::styled("   [s] save", Style::default().fg(Color::Green))
        }
        _ => Span::raw(""),
    };
    spans.push(save);
    f.render_widget(Paragraph::new(Line::from(spans)), inner);
}

fn render_history(f: &mut ratatui::Frame, app: &mut App, colors: bool, area: Rect) {
    let block = panel("Your transitions", app.focus == Focus::History);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let history = match &app.dashboard.history {
        LoadState::Ready(history) if !history.is_empty() => history,
        LoadState::Ready(_) => return centered_text(f, "No transitions yet", inner),
        LoadState::Failed(report) => return centered_text(f, &report.message, inner),
        LoadState::Idle | LoadState::Loading => return centered_text(f, "Loading...", inner),
    };

    let highlight = app
        .last_saved
        .filter(|(_, at)| at.elapsed() < Duration::from_secs(2))
        .map(|(id, _)| id);

    let rows = history
        .iter()
        .map(|transition| {
            let mut row = Row::new(vec![
                Cell::from(format_timestamp(transition.timestamp)),
                Cell::from(transition.initial_mood.name.clone())
                    .style(mood_style(&transition.initial_mood, colors)),
                Cell::from("->"),
                Cell::from(transition.target_mood.name.clone())
                    .style(mood_style(&transition.target_mood, colors)),
            ]);
            if highlight == Some(transition.id) {
                row = row.style(Style::default().bg(Color::Green).fg(Color::Black));
            }
            row
        })
        .collect::<Vec<_>>();

    let header = Row::new(vec!["WHEN", "FROM", "", "TO"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let widths = [
        Constraint::Length(17),
        Constraint::Min(8),
        Constraint::Length(2),
        Constraint::Min(8),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let available = inner.height.saturating_sub(1) as usize;
    ensure_table_state_visible(&mut app.history_state, available);
    f.render_stateful_widget(table, inner, &mut app.history_state);
}

fn render_spotify(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title_top("Spotify");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let (mut message, style) = match app.playlists.state() {
        PlaylistState::Unlinked => (
            "Not linked.\n[c] link your account".to_string(),
            Style::default().fg(Color::Yellow),
        ),
        PlaylistState::CheckingLink => ("Checking...".to_string(), Style::default()),
        PlaylistState::Linked => (
            "Linked.\n[p] playlist for the selected transition".to_string(),
            Style::default().fg(Color::Green),
        ),
        PlaylistState::CreatingPlaylist { transition_id } => (
            format!("Creating playlist for #{transition_id}..."),
            Style::default().fg(Color::Yellow),
        ),
        PlaylistState::PlaylistReady(playlist) => {
            let tracks = playlist
                .track_count
                .map_or_else(String::new, |n| format!(" ({n} tracks)"));
            (
                format!("Playlist ready{tracks}:\n{}", playlist.playlist_url),
                Style::default().fg(Color::Green),
            )
        }
        PlaylistState::Error(report) => (
            format!("{}\n[p] try again", report.message),
            Style::default().fg(Color::Red),
        ),
    };

    if app.navigator.browser_failed {
        if let Some(url) = &app.navigator.last_handoff {
            message.push_str(&format!("\n\nNo browser; open:\n{url}"));
        }
    }

    let paragraph = Paragraph::new(message)
        .style(style)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, inner);
}

fn panel(title: &str, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title_top(title.to_string())
}

fn mood_style(mood: &Mood, colors: bool) -> Style {
    match mood.rgb() {
        Some((r, g, b)) if colors => Style::default().fg(Color::Rgb(r, g, b)),
        _ => Style::default(),
    }
}

fn centered_text(f: &mut ratatui::Frame, text: &str, area: Rect) {
    let paragraph = Paragraph::new(text.to_string())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn render_status_line(f: &mut ratatui::Frame, status: Option<&StatusMessage>, area: Rect) {
    let widget = status.map(|status| {
        let style = match status.kind {
            StatusKind::Info => Style::default().fg(Color::Blue),
            StatusKind::Success => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        };
        Paragraph::new(status.text.clone()).style(style)
    });

    if let Some(widget) = widget {
        f.render_widget(widget, area);
    } else {
        f.render_widget(Paragraph::new(""), area);
    }
}

fn render_footer(
    f: &mut ratatui::Frame,
    status: Option<&StatusMessage>,
    hint: Line<'static>,
    area: Rect,
) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    render_status_line(f, status, layout[0]);
    f.render_widget(Paragraph::new(hint), layout[1]);
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

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

fn set_cursor(f: &mut ratatui::Frame, area: Rect, x_offset: usize) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let offset = u16::try_from(x_offset).unwrap_or(u16::MAX);
    let max_x = area.x + area.width - 1;
    let cursor_x = area.x.saturating_add(offset).min(max_x);
    f.set_cursor_position(Position::new(cursor_x, area.y));
}

fn ensure_table_state_visible(state: &mut TableState, height: usize) {
    if height == 0 {
        return;
    }
    let Some(selected) = state.selected() else {
        return;
    };
    let offset = state.offset();
    if selected < offset {
        *state.offset_mut() = selected;
    } else if selected >= offset + height {
        *state.offset_mut() = selected.saturating_sub(height - 1);
    }
}
