//! Session lifecycle: create, switch, delete, submit, and title.
//!
//! A [`SessionController`] is always bound to exactly one session. Every
//! bind rescans the store and pins the bound session to the front of the
//! collection, so the UI sees MRU order with the current session first.

use crate::agent::{ConversationAgent, Transcript, WindowPolicy};
use crate::config::Config;
use crate::core::session::{SessionCollection, SessionRecord, generate_session_id};
use crate::core::title::{TitleGenerator, TitleOutcome, TitlePolicy};
use crate::error::{Error, Result};
use crate::llm::{CompletionParams, LanguageModel};
use crate::storage::SessionStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tunables for a controller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerSettings {
    /// Sampling parameters for chat and titling.
    pub params: CompletionParams,

    /// History window for chat.
    pub window: WindowPolicy,

    /// When to title sessions.
    pub title: TitlePolicy,
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            params: CompletionParams::from(&config.model),
            window: WindowPolicy::from(&config.conversation),
            title: TitlePolicy::from(&config.title),
        }
    }
}

/// Everything that changes together when the current session changes.
struct Binding {
    agent: ConversationAgent,
    sessions: SessionCollection,
    current: SessionRecord,
}

/// Owns the current session and the agent bound to it.
pub struct SessionController {
    store: Arc<dyn SessionStore>,
    model: Arc<dyn LanguageModel>,
    settings: ControllerSettings,
    titles: TitleGenerator,
    binding: Binding,
}

impl SessionController {
    /// Bind to the most recently modified session, creating one if the store
    /// is empty.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store cannot be scanned or written.
    pub fn new(
        store: Arc<dyn SessionStore>,
        model: Arc<dyn LanguageModel>,
        settings: ControllerSettings,
    ) -> Result<Self> {
        let existing = store.list_sessions()?;
        let session_id = if let Some(latest) = existing.first() {
            latest.session_id.clone()
        } else {
            let id = generate_session_id();
            store.create_session(&id)?;
            info!(session_id = %id, "created first session");
            id
        };

        let binding = Self::bind(&store, &model, &settings, &session_id)?;
        let titles = TitleGenerator::new(Arc::clone(&model), settings.params, settings.title);

        Ok(Self {
            store,
            model,
            settings,
            titles,
            binding,
        })
    }

    fn bind(
        store: &Arc<dyn SessionStore>,
        model: &Arc<dyn LanguageModel>,
        settings: &ControllerSettings,
        session_id: &str,
    ) -> Result<Binding> {
        let agent = ConversationAgent::bind(
            session_id,
            Arc::clone(store),
            Arc::clone(model),
            settings.params,
            settings.window,
        )?;
        let (sessions, current) = Self::scan_pinned(store.as_ref(), session_id)?;
        Ok(Binding {
            agent,
            sessions,
            current,
        })
    }

    fn scan_pinned(
        store: &dyn SessionStore,
        session_id: &str,
    ) -> Result<(SessionCollection, SessionRecord)> {
        let sessions = store.list_sessions()?.pin_current(session_id)?;
        let current = sessions.first().cloned().ok_or_else(|| {
            Error::InvariantViolation(format!("session {session_id} vanished after pin"))
        })?;
        debug!(session_id, count = sessions.len(), "sessions rescanned");
        Ok((sessions, current))
    }

    /// Rescan without rebuilding the agent.
    fn refresh(&mut self) -> Result<()> {
        let (sessions, current) =
            Self::scan_pinned(self.store.as_ref(), &self.binding.current.session_id)?;
        self.binding.sessions = sessions;
        self.binding.current = current;
        Ok(())
    }

    fn rebind(&mut self, session_id: &str) -> Result<()> {
        self.binding = Self::bind(&self.store, &self.model, &self.settings, session_id)?;
        Ok(())
    }

    /// Sessions in MRU order, current first.
    #[must_use]
    pub fn list_sessions(&self) -> &[SessionRecord] {
        self.binding.sessions.records()
    }

    /// The current session.
    #[must_use]
    pub fn current(&self) -> &SessionRecord {
        &self.binding.current
    }

    /// Id of the current session. Always equals the agent's session.
    #[must_use]
    pub fn current_session_id(&self) -> &str {
        self.binding.agent.session_id()
    }

    /// Start a fresh session and make it current.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the session cannot be created.
    pub fn new_session(&mut self) -> Result<()> {
        let session_id = generate_session_id();
        self.store.create_session(&session_id)?;
        self.rebind(&session_id)?;
        info!(session_id = %session_id, "new session");
        Ok(())
    }

    /// Make `session_id` current.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSessionId`] if the id is not in the current
    /// collection; the current session is unchanged in that case.
    pub fn switch_session(&mut self, session_id: &str) -> Result<()> {
        if self.binding.sessions.find(session_id).is_none() {
            return Err(Error::InvalidSessionId(session_id.to_string()));
        }
        self.rebind(session_id)?;
        info!(session_id, "switched session");
        Ok(())
    }

    /// Delete a session. Deleting the current one moves to the most recent
    /// remaining session, or a new one if none remain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSessionId`] for unknown ids, or a storage error.
    pub fn delete_session(&mut self, session_id: &str) -> Result<()> {
        if self.binding.sessions.find(session_id).is_none() {
            return Err(Error::InvalidSessionId(session_id.to_string()));
        }
        self.store.delete_session(session_id)?;
        info!(session_id, "deleted session");

        if session_id != self.current_session_id() {
            return self.refresh();
        }

        let remaining = self.store.list_sessions()?;
        match remaining.first() {
            Some(next) => {
                let next = next.session_id.clone();
                self.rebind(&next)
            }
            None => self.new_session(),
        }
    }

    /// Send a message in the current session and return the reply.
    ///
    /// Titling runs afterwards. A failed title generation never fails the
    /// submit.
    ///
    /// # Errors
    ///
    /// Returns a collaborator error if the model call fails, or a storage
    /// error if the exchange or title state cannot be persisted.
    pub fn submit(&mut self, text: &str) -> Result<String> {
        let reply = self.binding.agent.execute(text)?;
        self.ensure_title()?;
        Ok(reply)
    }

    /// Current session's messages as `{role, content}` pairs.
    #[must_use]
    pub fn current_messages(&self) -> Transcript {
        self.binding.agent.transcript()
    }

    /// Title the current session if it qualifies.
    ///
    /// Qualifies when the title is still the placeholder, the transcript has
    /// more than the policy's minimum entries, no title is stored, and the
    /// retry budget is not spent. Model failures are counted and reported as
    /// [`TitleOutcome::Failed`], not returned as errors.
    ///
    /// # Errors
    ///
    /// Returns a storage error if title state cannot be read, written, or
    /// recorded.
    pub fn ensure_title(&mut self) -> Result<TitleOutcome> {
        if !self.binding.current.has_placeholder_title() {
            return Ok(TitleOutcome::AlreadyTitled);
        }

        let transcript = self.binding.agent.transcript();
        let policy = self.titles.policy();
        if transcript.len() <= policy.min_messages {
            return Ok(TitleOutcome::NotEnoughMessages);
        }

        let session_id = self.binding.current.session_id.clone();
        if self.store.has_title(&session_id)? {
            self.refresh()?;
            return Ok(TitleOutcome::AlreadyTitled);
        }

        if self.store.title_attempts(&session_id)? >= policy.max_attempts {
            return Ok(TitleOutcome::AttemptsExhausted);
        }

        match self
            .titles
            .generate_and_persist_title(&transcript, self.store.as_ref(), &session_id)
        {
            Ok(Some(title)) => {
                self.refresh()?;
                Ok(TitleOutcome::Generated(title.trim().to_string()))
            }
            Ok(None) => {
                self.refresh()?;
                Ok(TitleOutcome::AlreadyTitled)
            }
            Err(e @ Error::Collaborator(_)) => {
                let attempts = self.store.record_title_attempt(&session_id)?;
                warn!(
                    session_id = %session_id,
                    attempts,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "title generation failed"
                );
                Ok(TitleOutcome::Failed)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedModel;
    use crate::storage::MemoryBackend;
    use chrono::{Duration, Utc};

    fn controller(store: &Arc<MemoryBackend>, model: &Arc<ScriptedModel>) -> SessionController {
        SessionController::new(
            Arc::clone(store) as Arc<dyn SessionStore>,
            Arc::clone(model) as Arc<dyn LanguageModel>,
            ControllerSettings::default(),
        )
        .unwrap()
    }

    /// Memory store whose title bookkeeping can be made to fail.
    #[derive(Default)]
    struct FlakyTitleStore {
        inner: MemoryBackend,
        fail_title_reads: bool,
        fail_title_writes: bool,
    }

    fn io_failure(what: &str) -> Error {
        Error::Storage(std::io::Error::other(what.to_string()))
    }

    impl SessionStore for FlakyTitleStore {
        fn list_sessions(&self) -> Result<SessionCollection> {
            self.inner.list_sessions()
        }

        fn create_session(&self, session_id: &str) -> Result<()> {
            self.inner.create_session(session_id)
        }

        fn delete_session(&self, session_id: &str) -> Result<()> {
            self.inner.delete_session(session_id)
        }

        fn load_messages(&self, session_id: &str) -> Result<Vec<crate::agent::Message>> {
            self.inner.load_messages(session_id)
        }

        fn save_messages(&self, session_id: &str, messages: &[crate::agent::Message]) -> Result<()> {
            self.inner.save_messages(session_id, messages)
        }

        fn has_title(&self, session_id: &str) -> Result<bool> {
            if self.fail_title_reads {
                return Err(io_failure("title unreadable"));
            }
            self.inner.has_title(session_id)
        }

        fn create_title(&self, session_id: &str, title: &str) -> Result<bool> {
            if self.fail_title_writes {
                return Err(io_failure("session folder gone"));
            }
            self.inner.create_title(session_id, title)
        }

        fn title_attempts(&self, session_id: &str) -> Result<u32> {
            self.inner.title_attempts(session_id)
        }

        fn record_title_attempt(&self, session_id: &str) -> Result<u32> {
            self.inner.record_title_attempt(session_id)
        }
    }

    fn ids(c: &SessionController) -> Vec<String> {
        c.list_sessions().iter().map(|r| r.session_id.clone()).collect()
    }

    #[test]
    fn empty_store_creates_placeholder_session() {
        let store = Arc::new(MemoryBackend::new());
        let model = Arc::new(ScriptedModel::default());
        let c = controller(&store, &model);

        assert_eq!(c.list_sessions().len(), 1);
        assert_eq!(c.current().session_id, c.current_session_id());
        assert_eq!(c.current().title, format!("session_{}", c.current_session_id()));
    }

    #[test]
    fn picks_most_recent_existing_session() {
        let store = Arc::new(MemoryBackend::new());
        store.create_session("t1").unwrap();
        store.create_session("t2").unwrap();
        let now = Utc::now();
        store.set_last_modified("t1", now - Duration::hours(2)).unwrap();
        store.set_last_modified("t2", now - Duration::hours(1)).unwrap();

        let c = controller(&store, &Arc::new(ScriptedModel::default()));

        assert_eq!(c.current_session_id(), "t2");
        assert_eq!(ids(&c), vec!["t2", "t1"]);
    }

    #[test]
    fn switch_pins_target_first() {
        let store = Arc::new(MemoryBackend::new());
        for id in ["a", "b", "c"] {
            store.create_session(id).unwrap();
        }
        let mut c = controller(&store, &Arc::new(ScriptedModel::default()));
        assert_eq!(c.current_session_id(), "c");

        c.switch_session("a").unwrap();

        assert_eq!(c.current_session_id(), "a");
        assert_eq!(ids(&c), vec!["a", "c", "b"]);
    }

    #[test]
    fn switch_to_unknown_id_leaves_state_unchanged() {
        let store = Arc::new(MemoryBackend::new());
        store.create_session("a").unwrap();
        let mut c = controller(&store, &Arc::new(ScriptedModel::default()));
        let before = ids(&c);

        let err = c.switch_session("nonexistent").unwrap_err();

        assert!(matches!(err, Error::InvalidSessionId(_)));
        assert!(err.is_recoverable());
        assert_eq!(c.current_session_id(), "a");
        assert_eq!(ids(&c), before);
    }

    #[test]
    fn new_session_is_current_and_distinct() {
        let store = Arc::new(MemoryBackend::new());
        let mut c = controller(&store, &Arc::new(ScriptedModel::default()));
        let first = c.current_session_id().to_string();

        c.new_session().unwrap();

        assert_ne!(c.current_session_id(), first);
        assert_eq!(ids(&c)[0], c.current_session_id());
        assert_eq!(c.list_sessions().len(), 2);
        assert!(c.current_messages().is_empty());
    }

    #[test]
    fn submit_appends_to_current_transcript() {
        let store = Arc::new(MemoryBackend::new());
        let model = Arc::new(ScriptedModel::replying("pong"));
        let mut c = controller(&store, &model);

        assert_eq!(c.submit("ping").unwrap(), "pong");

        let messages = c.current_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "ping");
        assert_eq!(messages[1].content, "pong");
    }

    #[test]
    fn submit_failure_propagates() {
        let store = Arc::new(MemoryBackend::new());
        let model = Arc::new(ScriptedModel::default());
        model.push_failure("network down");
        let mut c = controller(&store, &model);

        assert!(matches!(c.submit("hi"), Err(Error::Collaborator(_))));
        assert!(c.current_messages().is_empty());
    }

    #[test]
    fn two_entries_never_trigger_titling() {
        let store = Arc::new(MemoryBackend::new());
        let model = Arc::new(ScriptedModel::default());
        let mut c = controller(&store, &model);

        c.submit("hello").unwrap();

        assert_eq!(c.ensure_title().unwrap(), TitleOutcome::NotEnoughMessages);
        assert_eq!(model.calls_containing("Generate a short title"), 0);
        assert!(c.current().has_placeholder_title());
    }

    #[test]
    fn second_exchange_titles_session_once() {
        let store = Arc::new(MemoryBackend::new());
        let model = Arc::new(ScriptedModel::default());
        let mut c = controller(&store, &model);

        model.push_reply("first answer");
        c.submit("first").unwrap();
        model.push_reply("second answer");
        model.push_reply("Friendly Chat");
        c.submit("second").unwrap();

        assert_eq!(c.current().title, "Friendly Chat");
        assert_eq!(c.list_sessions()[0].title, "Friendly Chat");

        c.submit("third").unwrap();
        assert_eq!(c.ensure_title().unwrap(), TitleOutcome::AlreadyTitled);
        assert_eq!(model.calls_containing("Generate a short title"), 1);
    }

    #[test]
    fn existing_title_on_disk_is_picked_up_without_generation() {
        let store = Arc::new(MemoryBackend::new());
        let model = Arc::new(ScriptedModel::default());
        let mut c = controller(&store, &model);
        c.submit("a").unwrap();
        store.create_title(c.current_session_id(), "Set elsewhere").unwrap();

        c.submit("b").unwrap();

        assert_eq!(c.current().title, "Set elsewhere");
        assert_eq!(model.calls_containing("Generate a short title"), 0);
    }

    #[test]
    fn failed_titling_is_bounded() {
        let store = Arc::new(MemoryBackend::new());
        let model = Arc::new(ScriptedModel::default());
        let mut c = controller(&store, &model);
        c.submit("a").unwrap();
        c.submit("b").unwrap();
        // The titling call after "b" succeeded with the fallback reply; start over
        c.new_session().unwrap();
        c.submit("c").unwrap();

        model.push_reply("reply d");
        model.push_failure("title down 1");
        c.submit("d").unwrap();
        assert!(c.current().has_placeholder_title());

        model.push_failure("title down 2");
        assert_eq!(c.ensure_title().unwrap(), TitleOutcome::Failed);
        model.push_failure("title down 3");
        assert_eq!(c.ensure_title().unwrap(), TitleOutcome::Failed);

        assert_eq!(c.ensure_title().unwrap(), TitleOutcome::AttemptsExhausted);
        assert_eq!(store.title_attempts(c.current_session_id()).unwrap(), 3);
        assert!(c.current().has_placeholder_title());
    }

    #[test]
    fn storage_failure_while_titling_fails_submit() {
        let store = Arc::new(FlakyTitleStore {
            fail_title_reads: true,
            ..FlakyTitleStore::default()
        });
        let model = Arc::new(ScriptedModel::default());
        let mut c = SessionController::new(
            Arc::clone(&store) as Arc<dyn SessionStore>,
            Arc::clone(&model) as Arc<dyn LanguageModel>,
            ControllerSettings::default(),
        )
        .unwrap();
        c.submit("a").unwrap();

        assert!(matches!(c.submit("b"), Err(Error::Storage(_))));
        assert_eq!(c.current_messages().len(), 4);
    }

    #[test]
    fn title_write_failure_is_not_counted_as_attempt() {
        let store = Arc::new(FlakyTitleStore {
            fail_title_writes: true,
            ..FlakyTitleStore::default()
        });
        let model = Arc::new(ScriptedModel::default());
        let mut c = SessionController::new(
            Arc::clone(&store) as Arc<dyn SessionStore>,
            Arc::clone(&model) as Arc<dyn LanguageModel>,
            ControllerSettings::default(),
        )
        .unwrap();
        c.submit("a").unwrap();

        assert!(matches!(c.submit("b"), Err(Error::Storage(_))));
        assert_eq!(store.title_attempts(c.current_session_id()).unwrap(), 0);
        assert!(c.current().has_placeholder_title());
    }

    #[test]
    fn titled_session_never_reverts() {
        let store = Arc::new(MemoryBackend::new());
        let model = Arc::new(ScriptedModel::replying("Stable Title"));
        let mut c = controller(&store, &model);
        c.submit("a").unwrap();
        c.submit("b").unwrap();
        let titled = c.current_session_id().to_string();

        c.new_session().unwrap();
        c.switch_session(&titled).unwrap();
        c.submit("c").unwrap();

        assert_eq!(c.current().title, "Stable Title");
    }

    #[test]
    fn delete_other_session_keeps_current() {
        let store = Arc::new(MemoryBackend::new());
        store.create_session("a").unwrap();
        store.create_session("b").unwrap();
        let mut c = controller(&store, &Arc::new(ScriptedModel::default()));
        assert_eq!(c.current_session_id(), "b");

        c.delete_session("a").unwrap();

        assert_eq!(c.current_session_id(), "b");
        assert_eq!(ids(&c), vec!["b"]);
    }

    #[test]
    fn delete_current_moves_to_next_most_recent() {
        let store = Arc::new(MemoryBackend::new());
        for id in ["a", "b", "c"] {
            store.create_session(id).unwrap();
        }
        let mut c = controller(&store, &Arc::new(ScriptedModel::default()));

        c.delete_session("c").unwrap();

        assert_eq!(c.current_session_id(), "b");
        assert_eq!(ids(&c), vec!["b", "a"]);
    }

    #[test]
    fn delete_last_session_starts_fresh() {
        let store = Arc::new(MemoryBackend::new());
        let mut c = controller(&store, &Arc::new(ScriptedModel::default()));
        let only = c.current_session_id().to_string();

        c.delete_session(&only).unwrap();

        assert_ne!(c.current_session_id(), only);
        assert_eq!(c.list_sessions().len(), 1);
    }

    #[test]
    fn delete_unknown_session_is_rejected() {
        let store = Arc::new(MemoryBackend::new());
        let mut c = controller(&store, &Arc::new(ScriptedModel::default()));
        assert!(matches!(
            c.delete_session("ghost"),
            Err(Error::InvalidSessionId(_))
        ));
    }
}
