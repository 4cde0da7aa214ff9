//! Process-wide map of live quiz sessions.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock};

use crate::state::quiz::QuizSession;

/// Longest accepted session identifier.
pub const MAX_SESSION_ID_LEN: usize = 64;

/// Canonical form of a session identifier: trimmed and upper-cased.
pub fn normalize_session_id(id: &str) -> String {
    id.trim().to_uppercase()
}

/// Whether a normalized identifier is `[A-Z0-9_-]{1,64}`.
pub fn is_valid_session_id(id: &str) -> bool {
    (1..=MAX_SESSION_ID_LEN).contains(&id.len())
        && id
            .bytes()
            .all(|byte| byte.is_ascii_uppercase() || byte.is_ascii_digit() || byte == b'-' || byte == b'_')
}

/// One live session plus the bookkeeping that orders its persistence writes.
pub struct SessionSlot {
    session: RwLock<QuizSession>,
    persisted_revision: Mutex<Option<u64>>,
}

impl SessionSlot {
    fn new(session: QuizSession) -> Self {
        Self {
            session: RwLock::new(session),
            persisted_revision: Mutex::new(None),
        }
    }

    /// Single-writer lock around the session state.
    pub fn session(&self) -> &RwLock<QuizSession> {
        &self.session
    }

    /// Revision of the last snapshot written to storage. Hold it while writing.
    pub fn persisted_revision(&self) -> &Mutex<Option<u64>> {
        &self.persisted_revision
    }
}

/// Shared handle to a [`SessionSlot`].
pub type SessionHandle = Arc<SessionSlot>;

/// Registry of sessions keyed by normalized identifier.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert sessions loaded from storage, replacing any in-memory copy.
    pub fn hydrate(&self, sessions: impl IntoIterator<Item = QuizSession>) -> usize {
        let mut count = 0;
        for mut session in sessions {
            session.id = normalize_session_id(&session.id);
            self.sessions
                .insert(session.id.clone(), Arc::new(SessionSlot::new(session)));
            count += 1;
        }
        count
    }

    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions
            .get(&normalize_session_id(id))
            .map(|entry| entry.value().clone())
    }

    /// Return the session, building it with `build` when missing. The flag tells whether it was created.
    pub fn get_or_create(
        &self,
        id: &str,
        build: impl FnOnce(String) -> QuizSession,
    ) -> (SessionHandle, bool) {
        let id = normalize_session_id(id);
        let mut created = false;
        let handle = self
            .sessions
            .entry(id.clone())
            .or_insert_with(|| {
                created = true;
                Arc::new(SessionSlot::new(build(id)))
            })
            .value()
            .clone();
        (handle, created)
    }

    pub fn remove(&self, id: &str) -> Option<SessionHandle> {
        self.sessions
            .remove(&normalize_session_id(id))
            .map(|(_, handle)| handle)
    }

    /// Drop every session.
    pub fn clear(&self) {
        self.sessions.clear();
    }

    /// Known session identifiers, sorted.
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
