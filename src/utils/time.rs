//! Human-readable timestamps for the thread list and message bubbles

use chrono::{DateTime, Local, Utc};

/// Relative age of `then` as seen at `now`.
///
/// Anything older than 30 days falls back to the local calendar date.
pub fn format_relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    if seconds < 60 {
        return "just now".to_string();
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes} min ago");
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours} h ago");
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{days} d ago");
    }

    let local: DateTime<Local> = then.into();
    local.format("%Y-%m-%d").to_string()
}

/// Local wall-clock time, `HH:MM`
pub fn format_clock(at: DateTime<Utc>) -> String {
    let local: DateTime<Local> = at.into();
    local.format("%H:%M").to_string()
}
