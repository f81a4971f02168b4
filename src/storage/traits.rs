//! Storage trait definitions.

use crate::agent::Message;
use crate::core::SessionCollection;
use crate::error::Result;

/// Backing store for conversation sessions.
///
/// One store owns one sessions root. Writers are assumed to be a single
/// controller; the only operation safe against a second writer is
/// [`SessionStore::create_title`].
pub trait SessionStore: Send + Sync {
    /// Scan all sessions, most recently modified first.
    ///
    /// # Errors
    ///
    /// Returns an error if the sessions root cannot be read.
    fn list_sessions(&self) -> Result<SessionCollection>;

    /// Create storage for a new, empty session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session storage cannot be created.
    fn create_session(&self, session_id: &str) -> Result<()>;

    /// Remove a session and everything stored under it.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn delete_session(&self, session_id: &str) -> Result<()>;

    /// Load the full message history. Missing history is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if stored messages cannot be read or parsed.
    fn load_messages(&self, session_id: &str) -> Result<Vec<Message>>;

    /// Replace the stored message history.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn save_messages(&self, session_id: &str, messages: &[Message]) -> Result<()>;

    /// Whether a title has been persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn has_title(&self, session_id: &str) -> Result<bool>;

    /// Persist a title only if none exists yet.
    ///
    /// Returns `false` when another title was already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn create_title(&self, session_id: &str, title: &str) -> Result<bool>;

    /// Failed title generations recorded for the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn title_attempts(&self, session_id: &str) -> Result<u32>;

    /// Record one more failed title generation, returning the new count.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn record_title_attempt(&self, session_id: &str) -> Result<u32>;
}
