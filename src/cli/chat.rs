//! `parley chat` command implementation.
//!
//! Line-oriented chat loop. Plain lines are sent to the model; lines starting
//! with `/` manage sessions.

use crate::cli::preview;
use crate::cli::show::render_transcript;
use crate::config::Config;
use crate::core::{ControllerSettings, SessionController};
use crate::error::Result;
use crate::llm::{LanguageModel, OpenAiClient};
use crate::storage::{FileBackend, SessionStore};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

const HELP: &str = "\
Commands:
  /new            start a new session
  /list           list sessions, current first
  /switch <id>    switch to a session
  /delete <id>    delete a session
  /history        show the current transcript
  /help           show this help
  /quit           exit";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Send text to the model.
    Say(String),

    /// Start a new session.
    New,

    /// List sessions.
    List,

    /// Switch to a session.
    Switch(String),

    /// Delete a session.
    Delete(String),

    /// Print the current transcript.
    History,

    /// Print help.
    Help,

    /// Leave the loop.
    Quit,

    /// Nothing to do.
    Empty,

    /// Unrecognized slash command.
    Unknown(String),
}

impl ChatCommand {
    /// Parse one input line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Say(line.to_string());
        };

        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default();
        let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

        match (name, arg) {
            ("new", None) => Self::New,
            ("list", None) => Self::List,
            ("switch", Some(id)) => Self::Switch(id.to_string()),
            ("delete", Some(id)) => Self::Delete(id.to_string()),
            ("history", None) => Self::History,
            ("help", None) => Self::Help,
            ("quit" | "exit", None) => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// Run the chat command against the configured sessions root and model.
///
/// # Errors
///
/// Returns an error if the API key is missing, the store cannot be opened, or
/// a non-recoverable error ends the loop.
pub fn run(config: &Config) -> Result<()> {
    let model: Arc<dyn LanguageModel> = Arc::new(OpenAiClient::from_config(&config.model)?);
    let store: Arc<dyn SessionStore> = Arc::new(FileBackend::new(config.storage.path.clone())?);
    let mut controller = SessionController::new(store, model, ControllerSettings::from(config))?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_loop(&mut controller, stdin.lock(), &mut stdout)
}

/// Drive `controller` from `input` until EOF or `/quit`.
///
/// Unknown session ids are reported and the loop continues; any other error
/// ends it.
///
/// # Errors
///
/// Returns the first non-recoverable error, or an I/O error on `output`.
pub fn run_loop<R: BufRead, W: Write>(
    controller: &mut SessionController,
    input: R,
    output: &mut W,
) -> Result<()> {
    print_current(controller, output)?;

    for line in input.lines() {
        let line = line?;
        match handle(controller, ChatCommand::parse(&line), output) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) if e.is_recoverable() => writeln!(output, "! {e}")?,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Execute one command. Returns `false` when the loop should stop.
fn handle<W: Write>(
    controller: &mut SessionController,
    command: ChatCommand,
    output: &mut W,
) -> Result<bool> {
    match command {
        ChatCommand::Say(text) => {
            let reply = controller.submit(&text)?;
            writeln!(output, "{reply}")?;
        }
        ChatCommand::New => {
            controller.new_session()?;
            print_current(controller, output)?;
        }
        ChatCommand::List => print_sessions(controller, output)?,
        ChatCommand::Switch(id) => {
            controller.switch_session(&id)?;
            print_current(controller, output)?;
            write!(output, "{}", render_transcript(&controller.current_messages()))?;
        }
        ChatCommand::Delete(id) => {
            controller.delete_session(&id)?;
            print_current(controller, output)?;
        }
        ChatCommand::History => {
            write!(output, "{}", render_transcript(&controller.current_messages()))?;
        }
        ChatCommand::Help => writeln!(output, "{HELP}")?,
        ChatCommand::Quit => return Ok(false),
        ChatCommand::Empty => {}
        ChatCommand::Unknown(line) => writeln!(output, "unknown command: {line} (try /help)")?,
    }
    output.flush()?;
    Ok(true)
}

fn print_current<W: Write>(controller: &SessionController, output: &mut W) -> Result<()> {
    let current = controller.current();
    writeln!(output, "== {} [{}]", current.title, current.session_id)?;
    Ok(())
}

fn print_sessions<W: Write>(controller: &SessionController, output: &mut W) -> Result<()> {
    for (i, record) in controller.list_sessions().iter().enumerate() {
        let marker = if i == 0 { '*' } else { ' ' };
        writeln!(
            output,
            "{marker} {}  {}",
            record.session_id,
            preview(&record.title, 50)
        )?;
    }
    Ok(())
}
