//! CLI command implementations.

pub mod chat;
pub mod list;
pub mod show;

use chrono::{DateTime, Local, Utc};

/// Format UTC time as local time for display.
pub(crate) fn format_local_time(utc: DateTime<Utc>) -> String {
    let local: DateTime<Local> = utc.into();
    local.format("%Y-%m-%d %H:%M").to_string()
}

/// First line of `text`, cut to `max_chars` with an ellipsis.
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or(text);
    if first_line.chars().count() > max_chars {
        let cut: String = first_line.chars().take(max_chars).collect();
        format!("{cut}...")
    } else {
        first_line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_text() {
        let long = "x".repeat(100);
        let p = preview(&long, 50);
        assert_eq!(p.len(), 53);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn preview_takes_first_line() {
        assert_eq!(preview("first line\nsecond line", 50), "first line");
    }

    #[test]
    fn preview_counts_chars_not_bytes() {
        assert_eq!(preview("héllo wörld", 5), "héllo...");
    }
}
