//! `parley show` command implementation.

use crate::agent::{Role, TranscriptEntry, flatten};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::{FileBackend, SessionStore};

/// Run the show command.
///
/// Prints a session's title and transcript without contacting the model.
///
/// # Errors
///
/// Returns [`Error::InvalidSessionId`] if the session does not exist, or a
/// storage error.
pub fn run(config: &Config, session_id: &str) -> Result<()> {
    let store = FileBackend::new(config.storage.path.clone())?;
    let sessions = store.list_sessions()?;
    let record = sessions
        .find(session_id)
        .ok_or_else(|| Error::InvalidSessionId(session_id.to_string()))?;

    println!("{}", record.title);
    println!("{}", "─".repeat(record.title.chars().count().max(8)));

    let transcript = flatten(&store.load_messages(session_id)?);
    if transcript.is_empty() {
        println!("(no messages)");
    } else {
        print!("{}", render_transcript(&transcript));
    }
    Ok(())
}

/// Render a transcript with one labelled block per message.
#[must_use]
pub fn render_transcript(transcript: &[TranscriptEntry]) -> String {
    let mut out = String::new();
    for entry in transcript {
        let label = match entry.role {
            Role::User => "you",
            Role::Assistant => "assistant",
        };
        out.push_str(label);
        out.push_str(":\n");
        for line in entry.content.lines() {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_labels_and_indents() {
        let transcript = vec![
            TranscriptEntry::new(Role::User, "hi"),
            TranscriptEntry::new(Role::Assistant, "line one\nline two"),
        ];

        let out = render_transcript(&transcript);

        assert_eq!(out, "you:\n  hi\n\nassistant:\n  line one\n  line two\n\n");
    }

    #[test]
    fn render_empty_transcript() {
        assert_eq!(render_transcript(&[]), "");
    }
}
