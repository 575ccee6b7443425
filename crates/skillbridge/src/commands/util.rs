//! Small helpers shared by command handlers.

use chrono::{DateTime, Utc};

/// Render a timestamp for table cells.
pub fn fmt_time(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

/// Truncate a string for table cells, appending an ellipsis.
pub fn ellipsize(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let cut: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}\u{2026}")
}
