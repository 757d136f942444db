//! Shared message queue between the tutor agent and the request layer.
//!
//! The tutor's deliver-message tool appends from the worker task while the
//! request layer drains and snapshots from its own threads, so this is the one
//! session field that needs real mutual exclusion. The lock is never held
//! across an await.

use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct MessageQueue {
    inner: Arc<Mutex<Vec<String>>>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: impl Into<String>) {
        self.lock().push(message.into());
    }

    /// Remove and return everything queued so far, in arrival order.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock())
    }

    /// Copy of the queued messages without consuming them.
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("message queue lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}
