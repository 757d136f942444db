//! In-memory session store shared between the request layer and the worker.
//!
//! Sessions are created on first touch. The store lock guards the map and the
//! plain fields; `pending_messages` has its own lock so the tutor can append
//! while the request layer drains, and the tutor handle is an async mutex so a
//! long tutor turn never blocks the store.

use paideia_core::{MessageQueue, QuizDocument};
use paideia_reasoning::TutorAgent;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Score {
    pub correct: u32,
    pub total: u32,
}

#[derive(Clone, Default)]
pub struct SessionState {
    /// Quizzes this session has loaded, keyed by instance key.
    pub quizzes: HashMap<String, Arc<QuizDocument>>,
    pub active_quiz_key: Option<String>,
    pub active_quiz: Option<Arc<QuizDocument>>,
    pub active_tutor: Option<Arc<tokio::sync::Mutex<TutorAgent>>>,
    /// Quiz key the memoized tutor was built for.
    pub tutor_key: Option<String>,
    pub tutor_ready: bool,
    pub tutor_failed: bool,
    pub pending_messages: MessageQueue,
    pub score: Score,
}

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, SessionState>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-create the session and mutate it under the store lock.
    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut map = self.lock();
        let state = map.entry(id.to_string()).or_default();
        f(state)
    }

    /// Cheap clone of a session's state, `None` if it was never created.
    /// Handle fields (`pending_messages`, `active_tutor`, quiz documents)
    /// still share storage with the live session.
    pub fn snapshot(&self, id: &str) -> Option<SessionState> {
        self.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionState>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("session store lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}
