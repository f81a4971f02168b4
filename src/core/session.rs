//! Session records and the MRU-ordered session collection.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Folder name prefix marking a directory as a session.
pub const SESSION_DIR_PREFIX: &str = "session_";

/// Folder name for a session id.
#[must_use]
pub fn session_dir_name(session_id: &str) -> String {
    format!("{SESSION_DIR_PREFIX}{session_id}")
}

/// Extract the session id from a folder name.
///
/// Returns `None` for folders that do not follow the `session_<id>` convention.
#[must_use]
pub fn session_id_from_dir_name(name: &str) -> Option<&str> {
    name.strip_prefix(SESSION_DIR_PREFIX)
        .filter(|id| !id.is_empty())
}

/// Title shown until a real one is generated: the folder name.
#[must_use]
pub fn placeholder_title(session_id: &str) -> String {
    session_dir_name(session_id)
}

/// Generate a fresh random session id.
#[must_use]
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Metadata describing one persisted conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    /// Opaque unique identifier.
    pub session_id: String,

    /// Display title; the placeholder until a real title exists.
    pub title: String,

    /// Storage modification time. Only used for ordering.
    pub last_modified: DateTime<Utc>,
}

impl SessionRecord {
    /// Create a record, falling back to the placeholder when `title` is `None`.
    #[must_use]
    pub fn new(session_id: &str, title: Option<String>, last_modified: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.to_string(),
            title: title.unwrap_or_else(|| placeholder_title(session_id)),
            last_modified,
        }
    }

    /// Whether the title is still the folder-derived placeholder.
    #[must_use]
    pub fn has_placeholder_title(&self) -> bool {
        self.title == placeholder_title(&self.session_id)
    }
}

/// Ordered sequence of session records, most recently used first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCollection {
    records: Vec<SessionRecord>,
}

impl SessionCollection {
    /// Build a collection ordered by descending `last_modified`.
    ///
    /// Equal timestamps are ordered by ascending id so repeated scans agree.
    #[must_use]
    pub fn from_records(mut records: Vec<SessionRecord>) -> Self {
        records.sort_by(|a, b| {
            b.last_modified
                .cmp(&a.last_modified)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        Self { records }
    }

    /// Exact-match lookup by id.
    #[must_use]
    pub fn find(&self, session_id: &str) -> Option<&SessionRecord> {
        self.records.iter().find(|r| r.session_id == session_id)
    }

    /// Move `session_id` to the front, keeping the rest in order.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if `session_id` is not present.
    pub fn pin_current(mut self, session_id: &str) -> Result<Self> {
        let index = self
            .records
            .iter()
            .position(|r| r.session_id == session_id)
            .ok_or_else(|| {
                Error::InvariantViolation(format!("cannot pin missing session {session_id}"))
            })?;
        let record = self.records.remove(index);
        self.records.insert(0, record);
        Ok(self)
    }

    /// The most recently used record.
    #[must_use]
    pub fn first(&self) -> Option<&SessionRecord> {
        self.records.first()
    }

    /// Records in MRU order.
    #[must_use]
    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    /// Iterate records in MRU order.
    pub fn iter(&self) -> std::slice::Iter<'_, SessionRecord> {
        self.records.iter()
    }

    /// Number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a SessionCollection {
    type Item = &'a SessionRecord;
    type IntoIter = std::slice::Iter<'a, SessionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
