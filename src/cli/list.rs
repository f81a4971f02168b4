//! `parley list` command implementation.

use crate::cli::{format_local_time, preview};
use crate::config::Config;
use crate::core::SessionCollection;
use crate::error::Result;
use crate::storage::{FileBackend, SessionStore};
use std::fmt::Write;

/// Maximum length for title preview.
const TITLE_PREVIEW_LEN: usize = 40;

/// Run the list command.
///
/// Shows sessions most recently modified first.
///
/// # Errors
///
/// Returns an error if the sessions root cannot be read.
pub fn run(config: &Config) -> Result<()> {
    let store = FileBackend::new(config.storage.path.clone())?;
    let sessions = store.list_sessions()?;

    if sessions.is_empty() {
        println!("No sessions found.");
        println!("\nSessions are stored in: {}", store.root().display());
        return Ok(());
    }

    print!("{}", render_table(&sessions));
    Ok(())
}

/// Render the session table.
#[must_use]
pub fn render_table(sessions: &SessionCollection) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<38} {:<18} Title", "Session ID", "Last Modified");
    let _ = writeln!(out, "{}", "─".repeat(90));

    for record in sessions {
        let _ = writeln!(
            out,
            "{:<38} {:<18} {}",
            record.session_id,
            format_local_time(record.last_modified),
            preview(&record.title, TITLE_PREVIEW_LEN)
        );
    }

    let _ = writeln!(out, "{}", "─".repeat(90));
    let _ = writeln!(out, "Showing {} session(s)", sessions.len());
    out
}
