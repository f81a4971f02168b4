//! Session lifecycle core.

pub mod controller;
pub mod session;
pub mod title;

pub use controller::{ControllerSettings, SessionController};
pub use session::{SessionCollection, SessionRecord, generate_session_id, placeholder_title};
pub use title::{TitleGenerator, TitleOutcome, TitlePolicy};
