//! parley CLI - terminal chat with persisted sessions.

use clap::{Parser, Subcommand};
use parley::cli;
use parley::config::load_config;
use std::path::PathBuf;
use std::process::ExitCode;

/// Get the version string.
///
/// - Release builds (on a git tag): "0.1.0"
/// - Development builds: "0.1.0-dev (abc1234)"
fn version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("PARLEY_GIT_HASH");
    const IS_RELEASE: &str = env!("PARLEY_IS_RELEASE");

    static VERSION_STRING: std::sync::OnceLock<String> = std::sync::OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" {
            VERSION.to_string()
        } else {
            format!("{VERSION}-dev ({GIT_HASH})")
        }
    })
}

#[derive(Parser)]
#[command(name = "parley")]
#[command(author, version = version(), about = "Terminal chat with persisted sessions", long_about = None)]
struct Cli {
    /// Sessions directory (overrides config and PARLEY_SESSIONS_DIR).
    #[arg(long, global = true)]
    sessions_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat interactively. The default when no command is given.
    Chat,

    /// List sessions, most recent first.
    List,

    /// Print a session transcript.
    Show {
        /// Session ID.
        session_id: String,
    },
}

fn main() -> ExitCode {
    parley::logging::init();
    let cli = Cli::parse();

    let result = load_config().and_then(|mut config| {
        if let Some(dir) = cli.sessions_dir {
            config.storage.path = dir;
        }
        match cli.command.unwrap_or(Commands::Chat) {
            Commands::Chat => cli::chat::run(&config),
            Commands::List => cli::list::run(&config),
            Commands::Show { session_id } => cli::show::run(&config, &session_id),
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("parley: error: {e}");
            ExitCode::FAILURE
        }
    }
}
