// src/services/session_manager.rs
use std::{
    collections::HashMap,
    fmt::Debug,
    sync::Arc,
    time::{Duration, Instant},
};

use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Per-session context shared by the prediction and chat flows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub predicted_disease: Option<String>,
    pub messages: Vec<ChatMessage>,
}

impl SessionState {
    /// Messages are append-only.
    pub fn push(&mut self, role: ChatRole, content: impl Into<String>) -> usize {
        self.messages.push(ChatMessage { role, content: content.into() });
        self.messages.len()
    }
}

#[derive(Debug)]
pub struct Session {
    pub state: SessionState,
    pub last_active: Instant,
}

impl Default for Session {
    fn default() -> Self {
        Self { state: SessionState::default(), last_active: Instant::now() }
    }
}

impl Session {

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }
}

/// Locking a handle serializes every trigger within one session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// A locked, freshly touched session that is still in the index.
pub type SessionGuard = OwnedMutexGuard<Session>;

#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<RwLock<HashMap<String, SessionHandle>>>,
    ttl: Duration,
}

impl Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // Create a fresh session and return its id.
    pub async fn create_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let mut guard = self.inner.write().await;
        guard.insert(id.clone(), Arc::new(Mutex::new(Session::default())));
        debug!(session_id = %id, "session created");
        id
    }

    // Ensure there's a session with this id.
    pub async fn ensure_session(&self, id: &str) -> SessionHandle {
        {
            let guard = self.inner.read().await;
            if let Some(handle) = guard.get(id) {
                return handle.clone();
            }
        }
        let mut guard = self.inner.write().await;
        guard
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Session::default())))
            .clone()
    }

    /// Resolve a client-supplied id (blank means none) and lock its session.
    ///
    /// The returned guard is touched and its session is indexed: a purge that
    /// ran while we waited for the lock makes us retry with a fresh entry.
    pub async fn acquire(&self, id: Option<&str>) -> (String, SessionGuard) {
        let id = match id.map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => self.create_session().await,
        };
        loop {
            let handle = self.ensure_session(&id).await;
            let mut session = handle.clone().lock_owned().await;
            // Purge skips locked sessions, so membership holds from here on.
            let indexed = self
                .inner
                .read()
                .await
                .get(&id)
                .is_some_and(|current| Arc::ptr_eq(current, &handle));
            if indexed {
                session.touch();
                return (id, session);
            }
            debug!(session_id = %id, "session purged while waiting; retrying");
        }
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.inner.read().await.get(session_id).cloned()
    }

    /// Copy of the session's state.
    pub async fn snapshot(&self, session_id: &str) -> Option<SessionState> {
        let handle = self.get(session_id).await?;
        let session = handle.lock().await;
        Some(session.state.clone())
    }

    /// Remove a session by id
    pub async fn remove_session(&self, session_id: &str) -> bool {
        let mut guard = self.inner.write().await;
        guard.remove(session_id).is_some()
    }

    /// Remove sessions idle longer than ttl. Returns number removed.
    /// A session whose lock is held is busy and always kept.
    pub async fn purge_expired(&self) -> usize {
        let mut guard = self.inner.write().await;
        let now = Instant::now();
        let before = guard.len();
        guard.retain(|_, handle| match handle.try_lock() {
            Ok(session) => now.duration_since(session.last_active) < self.ttl,
            Err(_) => true,
        });
        before - guard.len()
    }

    /// Number of sessions
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
