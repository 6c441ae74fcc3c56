use colored::Colorize;
use moodconfig::format_timestamp;
use moodlift::types::{Mood, Playlist, Transition, TransitionStat, User};
use moodlift::Error as MoodError;
use std::fmt::Write;

pub fn paint_mood(mood: &Mood, colors: bool) -> String {
    match mood.rgb() {
        Some((r, g, b)) if colors => mood.name.truecolor(r, g, b).bold().to_string(),
        _ => mood.name.clone(),
    }
}

pub fn format_mood(mood: &Mood, colors: bool) -> String {
    let name = format!("{:<16}", mood.name);
    let name = match mood.rgb() {
        Some((r, g, b)) if colors => name.truecolor(r, g, b).to_string(),
        _ => name,
    };
    format!("{:>4}  {} {}", mood.id, name, mood.color)
}

pub fn format_transition(transition: &Transition, colors: bool) -> String {
    format!(
        "{:>5}  {}  {} -> {}",
        format!("#{}", transition.id),
        format_timestamp(transition.timestamp),
        paint_mood(&transition.initial_mood, colors),
        paint_mood(&transition.target_mood, colors),
    )
}

pub fn format_stat(stat: &TransitionStat, colors: bool) -> String {
    format!(
        "{:>4}x  {} -> {}",
        stat.count,
        paint_mood(&stat.initial_mood, colors),
        paint_mood(&stat.target_mood, colors),
    )
}

pub fn format_user(user: &User) -> String {
    let mut output = format!("{} <{}>", user.username, user.email);
    if let Some(id) = user.id {
        let _ = write!(output, "  (id {id})");
    }
    if user.is_active == Some(false) {
        output.push_str("  [inactive]");
    }
    output
}

pub fn format_playlist(playlist: &Playlist) -> String {
    let mut output = playlist.playlist_url.clone();
    if let Some(transition_id) = playlist.transition_id {
        output = format!("#{transition_id:<5} {output}");
    }
    if let Some(tracks) = playlist.track_count {
        let _ = write!(output, "  ({tracks} tracks)");
    }
    output
}

/// Renders a library error the way the CLI prints it: one header line, then
/// one `- field: message` line per field error.
pub fn format_api_error(err: &MoodError) -> String {
    let mut output = match err {
        MoodError::Validation { status, message, .. } => {
            format!("Request rejected ({status}): {message}")
        }
        MoodError::HttpStatus {
            status, message, ..
        } => format!("Mood API error ({status}): {message}"),
        MoodError::PlaylistCreation { status, message } => {
            format!("Playlist creation failed ({status}): {message}")
        }
        MoodError::NotAuthenticated => "Not logged in. Run `moodline login` first.".to_string(),
        MoodError::SessionExpired => "Session expired. Run `moodline login` again.".to_string(),
        other => other.to_string(),
    };
    for field in err.fields() {
        let normalized = field.message.replace('\n', " ");
        let _ = write!(output, "\n  - {}: {normalized}", field.field);
    }
    if err.is_retryable() {
        output.push_str("\n(temporary failure, retrying may help)");
    }
    output
}
