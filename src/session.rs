//! Session store - per-(app, user, session) state and conversation history

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info};

use crate::capability::StateSnapshot;
use crate::error::AgentError;
use crate::event::Event;

/// Identifies a session by its (app, user, session) triple
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub app: String,
    pub user: String,
    pub session: String,
}

impl SessionKey {
    pub fn new(
        app: impl Into<String>,
        user: impl Into<String>,
        session: impl Into<String>,
    ) -> Self {
        Self {
            app: app.into(),
            user: user.into(),
            session: session.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.app, self.user, self.session)
    }
}

/// A single conversation session: key/value state plus ordered event history.
///
/// State is last-write-wins with no versioning or transactions; callers are
/// responsible for write ordering. Sequential composition serializes writes
/// by construction; parallel children must write disjoint keys.
pub struct Session {
    pub key: SessionKey,
    state: RwLock<HashMap<String, Value>>,
    history: RwLock<Vec<Event>>,
}

impl Session {
    fn new(key: SessionKey) -> Self {
        Self {
            key,
            state: RwLock::new(HashMap::new()),
            history: RwLock::new(Vec::new()),
        }
    }

    /// Read a state value
    pub fn state_get(&self, key: &str) -> Option<Value> {
        self.state.read().get(key).cloned()
    }

    /// Read a state value, falling back to `default` when absent
    pub fn state_get_or(&self, key: &str, default: Value) -> Value {
        self.state_get(key).unwrap_or(default)
    }

    /// Write a state value (last write wins)
    pub fn state_set(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        debug!(session = %self.key, state_key = %key, "state write");
        self.state.write().insert(key, value);
    }

    /// Point-in-time copy of the whole state map
    pub fn snapshot(&self) -> StateSnapshot {
        self.state.read().clone()
    }

    /// Append an event to the conversation history
    pub fn push_event(&self, event: Event) {
        self.history.write().push(event);
    }

    /// Copy of the accumulated history
    pub fn history(&self) -> Vec<Event> {
        self.history.read().clone()
    }

    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }
}

/// Handle to a session for shared access across the agent tree
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Session>,
}

impl SessionHandle {
    fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(session),
        }
    }
}

impl std::ops::Deref for SessionHandle {
    type Target = Session;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// In-memory session store addressed by (app, user, session).
///
/// Sessions live for the lifetime of the service; distinct session ids never
/// share state.
pub struct SessionService {
    sessions: RwLock<HashMap<SessionKey, SessionHandle>>,
}

impl SessionService {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a session for the given triple.
    ///
    /// Creation is strict, not idempotent: a second create for the same
    /// triple fails with [`AgentError::DuplicateSession`] so wiring mistakes
    /// surface early.
    pub fn create_session(
        &self,
        app: &str,
        user: &str,
        session: &str,
    ) -> Result<SessionHandle, AgentError> {
        let key = SessionKey::new(app, user, session);
        let mut sessions = self.sessions.write();

        if sessions.contains_key(&key) {
            return Err(AgentError::DuplicateSession {
                app: app.to_string(),
                user: user.to_string(),
                session: session.to_string(),
            });
        }

        info!(session = %key, "creating session");
        let handle = SessionHandle::new(Session::new(key.clone()));
        sessions.insert(key, handle.clone());
        Ok(handle)
    }

    /// Look up an existing session.
    ///
    /// Reads never mutate the session: fetching a handle twice observes the
    /// same accumulated state and history.
    pub fn get_session(
        &self,
        app: &str,
        user: &str,
        session: &str,
    ) -> Result<SessionHandle, AgentError> {
        let key = SessionKey::new(app, user, session);
        self.sessions
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| AgentError::SessionNotFound {
                app: app.to_string(),
                user: user.to_string(),
                session: session.to_string(),
            })
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

impl Default for SessionService {
    fn default() -> Self {
        Self::new()
    }
}
