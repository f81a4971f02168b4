//! In-memory storage backend for testing.
//!
//! Modification times come from a logical clock that advances one second per
//! write, so ordering is deterministic.

use crate::agent::Message;
use crate::core::session::{SessionCollection, SessionRecord};
use crate::error::{Error, Result};
use crate::storage::traits::SessionStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone)]
struct StoredSession {
    title: Option<String>,
    messages: Vec<Message>,
    title_attempts: u32,
    last_modified: DateTime<Utc>,
}

impl StoredSession {
    // Same read rule as the file backend: trimmed, blank means untitled
    fn title(&self) -> Option<&str> {
        self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

/// In-memory storage backend for testing.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    sessions: RwLock<HashMap<String, StoredSession>>,
    clock: AtomicI64,
}

impl MemoryBackend {
    /// Create a new in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&self) -> DateTime<Utc> {
        let n = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        DateTime::from_timestamp(1_700_000_000 + n, 0).unwrap_or_default()
    }

    /// Override a session's modification time.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the session does not exist.
    pub fn set_last_modified(&self, session_id: &str, at: DateTime<Utc>) -> Result<()> {
        self.update(session_id, |s| s.last_modified = at)
    }

    fn update<T>(&self, session_id: &str, f: impl FnOnce(&mut StoredSession) -> T) -> Result<T> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.get_mut(session_id).ok_or_else(|| missing(session_id))?;
        Ok(f(session))
    }

    fn read<T>(&self, session_id: &str, f: impl FnOnce(&StoredSession) -> T) -> Result<T> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.get(session_id).ok_or_else(|| missing(session_id))?;
        Ok(f(session))
    }
}

fn missing(session_id: &str) -> Error {
    Error::Storage(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("no storage for session {session_id}"),
    ))
}

impl SessionStore for MemoryBackend {
    fn list_sessions(&self) -> Result<SessionCollection> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        let records = sessions
            .iter()
            .map(|(id, s)| SessionRecord::new(id, s.title().map(str::to_string), s.last_modified))
            .collect();
        Ok(SessionCollection::from_records(records))
    }

    fn create_session(&self, session_id: &str) -> Result<()> {
        let now = self.tick();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| StoredSession {
                title: None,
                messages: Vec::new(),
                title_attempts: 0,
                last_modified: now,
            });
        Ok(())
    }

    fn delete_session(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(session_id);
        Ok(())
    }

    fn load_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        Ok(sessions
            .get(session_id)
            .map(|s| s.messages.clone())
            .unwrap_or_default())
    }

    fn save_messages(&self, session_id: &str, messages: &[Message]) -> Result<()> {
        let now = self.tick();
        self.update(session_id, |s| {
            s.messages = messages.to_vec();
            s.last_modified = now;
        })
    }

    fn has_title(&self, session_id: &str) -> Result<bool> {
        self.read(session_id, |s| s.title().is_some())
    }

    fn create_title(&self, session_id: &str, title: &str) -> Result<bool> {
        let now = self.tick();
        self.update(session_id, |s| {
            if s.title().is_some() {
                return false;
            }
            s.title = Some(title.to_string());
            s.last_modified = now;
            true
        })
    }

    fn title_attempts(&self, session_id: &str) -> Result<u32> {
        self.read(session_id, |s| s.title_attempts)
    }

    fn record_title_attempt(&self, session_id: &str) -> Result<u32> {
        self.update(session_id, |s| {
            s.title_attempts += 1;
            s.title_attempts
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Role;

    #[test]
    fn list_sessions_empty() {
        let store = MemoryBackend::new();
        assert!(store.list_sessions().unwrap().is_empty());
    }

    #[test]
    fn later_writes_sort_first() {
        let store = MemoryBackend::new();
        store.create_session("a").unwrap();
        store.create_session("b").unwrap();
        store
            .save_messages("a", &[Message::text(Role::User, "hi")])
            .unwrap();

        let sessions = store.list_sessions().unwrap();
        assert_eq!(sessions.records()[0].session_id, "a");
        assert_eq!(sessions.records()[1].session_id, "b");
    }

    #[test]
    fn create_title_is_exclusive() {
        let store = MemoryBackend::new();
        store.create_session("a").unwrap();

        assert!(store.create_title("a", "One").unwrap());
        assert!(!store.create_title("a", "Two").unwrap());
        assert_eq!(store.list_sessions().unwrap().records()[0].title, "One");
    }

    #[test]
    fn blank_title_can_be_replaced() {
        let store = MemoryBackend::new();
        store.create_session("a").unwrap();

        assert!(store.create_title("a", "  ").unwrap());
        assert!(!store.has_title("a").unwrap());
        assert!(store.create_title("a", "Real").unwrap());
        assert!(store.has_title("a").unwrap());
        assert_eq!(store.list_sessions().unwrap().records()[0].title, "Real");
    }

    #[test]
    fn operations_on_missing_session_fail() {
        let store = MemoryBackend::new();
        assert!(store.save_messages("nope", &[]).is_err());
        assert!(store.create_title("nope", "t").is_err());
        assert!(store.load_messages("nope").unwrap().is_empty());
    }

    #[test]
    fn delete_removes_session() {
        let store = MemoryBackend::new();
        store.create_session("a").unwrap();
        store.delete_session("a").unwrap();
        assert!(store.list_sessions().unwrap().is_empty());
    }

    #[test]
    fn concurrent_creates() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(MemoryBackend::new());
        let mut handles = vec![];
        for i in 0..10 {
            let store_clone = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for j in 0..10 {
                    store_clone.create_session(&format!("s-{i}-{j}")).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().expect("Thread panicked");
        }

        assert_eq!(store.list_sessions().unwrap().len(), 100);
    }
}
