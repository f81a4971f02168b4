//! parley - terminal chat with persisted conversation sessions.
//!
//! Each conversation lives in its own `session_<id>` folder. Sessions are
//! listed most recently used first and get a short model-written title once
//! they have a few messages.

pub mod agent;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod llm;
pub mod logging;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
