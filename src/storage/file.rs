//! File-based storage backend.
//!
//! ```text
//! <root>/
//!   session_<id>/
//!     title.txt       optional, linked into place exactly once
//!     session.json    id, timestamps, failed title attempts
//!     messages.json   full message history
//! ```

use crate::agent::Message;
use crate::core::session::{SessionCollection, SessionRecord, session_dir_name, session_id_from_dir_name};
use crate::error::Result;
use crate::storage::traits::SessionStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const TITLE_FILE: &str = "title.txt";
const META_FILE: &str = "session.json";
const MESSAGES_FILE: &str = "messages.json";

/// Per-session bookkeeping stored next to the messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionMeta {
    session_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    title_attempts: u32,
}

impl SessionMeta {
    fn new(session_id: &str) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.to_string(),
            created_at: now,
            updated_at: now,
            title_attempts: 0,
        }
    }
}

/// File-based storage backend with atomic writes.
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Create a new file backend rooted at `root`.
    ///
    /// Creates the root directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be created.
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The sessions root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one session.
    #[must_use]
    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(session_dir_name(session_id))
    }

    /// Trimmed title, `None` when the file is missing or blank.
    fn read_title(dir: &Path) -> Result<Option<String>> {
        match fs::read(dir.join(TITLE_FILE)) {
            Ok(bytes) => {
                let contents = String::from_utf8_lossy(&bytes);
                let title = contents.trim();
                Ok((!title.is_empty()).then(|| title.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read_meta(&self, session_id: &str) -> Result<SessionMeta> {
        let path = self.session_dir(session_id).join(META_FILE);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(SessionMeta::new(session_id)),
            Err(e) => Err(e.into()),
        }
    }

    fn write_meta(&self, meta: &SessionMeta) -> Result<()> {
        let path = self.session_dir(&meta.session_id).join(META_FILE);
        write_atomic(&path, &serde_json::to_string_pretty(meta)?)
    }
}

/// Write to a temp file then rename over the target.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let temp = path.with_extension("tmp");
    fs::write(&temp, contents)?;
    // Rename is atomic, readers never see a half-written file
    fs::rename(&temp, path)?;
    Ok(())
}

/// Hard-link `temp` as the session title unless a real title exists.
///
/// A blank `title.txt` counts as absent and is replaced once.
fn link_title(dir: &Path, temp: &Path) -> Result<bool> {
    let path = dir.join(TITLE_FILE);
    match fs::hard_link(temp, &path) {
        Ok(()) => return Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
        Err(e) => return Err(e.into()),
    }

    if FileBackend::read_title(dir)?.is_some() {
        return Ok(false);
    }
    match fs::remove_file(&path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    match fs::hard_link(temp, &path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.into()),
    }
}

impl SessionStore for FileBackend {
    fn list_sessions(&self) -> Result<SessionCollection> {
        let mut records = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(session_id) = session_id_from_dir_name(name) else {
                debug!(folder = name, "skipping non-session entry");
                continue;
            };

            let metadata = match entry.metadata() {
                Ok(m) if m.is_dir() => m,
                Ok(_) => continue,
                Err(e) => {
                    warn!(folder = name, error = %e, "skipping unreadable session folder");
                    continue;
                }
            };
            let last_modified: DateTime<Utc> = metadata.modified()?.into();
            let title = match Self::read_title(&entry.path()) {
                Ok(title) => title,
                Err(e) => {
                    warn!(folder = name, error = %e, "unreadable title, using placeholder");
                    None
                }
            };

            records.push(SessionRecord::new(session_id, title, last_modified));
        }

        debug!(root = %self.root.display(), count = records.len(), "scanned sessions");
        Ok(SessionCollection::from_records(records))
    }

    fn create_session(&self, session_id: &str) -> Result<()> {
        fs::create_dir_all(self.session_dir(session_id))?;
        if !self.session_dir(session_id).join(META_FILE).exists() {
            self.write_meta(&SessionMeta::new(session_id))?;
        }
        Ok(())
    }

    fn delete_session(&self, session_id: &str) -> Result<()> {
        let dir = self.session_dir(session_id);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    fn load_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let path = self.session_dir(session_id).join(MESSAGES_FILE);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save_messages(&self, session_id: &str, messages: &[Message]) -> Result<()> {
        let path = self.session_dir(session_id).join(MESSAGES_FILE);
        write_atomic(&path, &serde_json::to_string_pretty(messages)?)?;

        let mut meta = self.read_meta(session_id)?;
        meta.updated_at = Utc::now();
        self.write_meta(&meta)
    }

    fn has_title(&self, session_id: &str) -> Result<bool> {
        Ok(Self::read_title(&self.session_dir(session_id))?.is_some())
    }

    fn create_title(&self, session_id: &str, title: &str) -> Result<bool> {
        let dir = self.session_dir(session_id);
        let temp = dir.join(format!("{TITLE_FILE}.{}.tmp", Uuid::new_v4()));
        fs::write(&temp, title)?;

        // The link only appears once its content is complete
        let linked = link_title(&dir, &temp);
        if let Err(e) = fs::remove_file(&temp) {
            warn!(session_id, error = %e, "could not remove title temp file");
        }
        linked
    }

    fn title_attempts(&self, session_id: &str) -> Result<u32> {
        Ok(self.read_meta(session_id)?.title_attempts)
    }

    fn record_title_attempt(&self, session_id: &str) -> Result<u32> {
        let mut meta = self.read_meta(session_id)?;
        meta.title_attempts += 1;
        meta.updated_at = Utc::now();
        self.write_meta(&meta)?;
        Ok(meta.title_attempts)
    }
}
