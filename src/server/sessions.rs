//! In-memory session store.
//!
//! Sessions are keyed by [`SessionId`] and bounded by an LRU: once the store
//! is full, the least recently used session is dropped. Each session sits
//! behind its own mutex so turns within a session run one at a time while
//! different sessions never contend.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;

use crate::chat::core::config::GenerationConfig;
use crate::chat::core::ids::SessionId;
use crate::chat::session::ChatSession;
use crate::llm::tokenizer::TokenCounter;

/// A session shared between request handlers.
pub type SharedSession = Arc<Mutex<ChatSession>>;

/// LRU-bounded map of live sessions.
pub struct SessionStore {
    sessions: Mutex<LruCache<SessionId, SharedSession>>,
    defaults: GenerationConfig,
    counter: Arc<dyn TokenCounter>,
}

impl SessionStore {
    /// Create an empty store. New sessions start with `defaults`.
    #[must_use]
    pub fn new(
        capacity: NonZeroUsize,
        defaults: GenerationConfig,
        counter: Arc<dyn TokenCounter>,
    ) -> Self {
        Self {
            sessions: Mutex::new(LruCache::new(capacity)),
            defaults,
            counter,
        }
    }

    /// Create a fresh session under a new id.
    pub fn create(&self) -> SessionId {
        let id = SessionId::new();
        let session = self.fresh();
        if let Some((evicted, _)) = self.entries().push(id, session) {
            tracing::debug!(session = %evicted, "session evicted from store");
        }
        tracing::info!(session = %id, "session created");
        id
    }

    /// Session for `id`, created on first use.
    pub fn get_or_create(&self, id: SessionId) -> SharedSession {
        let mut sessions = self.entries();
        if let Some(session) = sessions.get(&id) {
            return Arc::clone(session);
        }
        let session = self.fresh();
        if let Some((evicted, _)) = sessions.push(id, Arc::clone(&session)) {
            tracing::debug!(session = %evicted, "session evicted from store");
        }
        session
    }

    /// Whether `id` is live.
    #[must_use]
    pub fn contains(&self, id: SessionId) -> bool {
        self.entries().contains(&id)
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether no session is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn fresh(&self) -> SharedSession {
        Arc::new(Mutex::new(ChatSession::new(
            self.defaults.clone(),
            Arc::clone(&self.counter),
        )))
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<SessionId, SharedSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Lock a session, recovering from a poisoned mutex.
pub fn lock_session(session: &Mutex<ChatSession>) -> MutexGuard<'_, ChatSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}
