//! Scripted mock backend — deterministic completions for tests without API
//! keys. Replies are consumed in order; every incoming conversation is
//! recorded so tests can assert on what the runtime actually sent.

use crate::backend::{BackendError, ChatBackend, ChatTurn};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted backend step.
#[derive(Debug, Clone)]
pub enum Scripted {
    Reply(String),
    TransientFailure(String),
    PermanentFailure(String),
}

#[derive(Debug, Default)]
pub struct MockBackend {
    script: Mutex<VecDeque<Scripted>>,
    /// The final user-side text of each conversation we were asked to
    /// complete, in call order.
    sent: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let backend = Self::new();
        for r in replies {
            backend.push(Scripted::Reply(r.into()));
        }
        backend
    }

    pub fn push(&self, step: Scripted) {
        self.script.lock().unwrap().push_back(step);
    }

    pub fn push_reply(&self, text: impl Into<String>) {
        self.push(Scripted::Reply(text.into()));
    }

    pub fn push_transient(&self, msg: impl Into<String>) {
        self.push(Scripted::TransientFailure(msg.into()));
    }

    /// Prompts observed so far (the last turn of each conversation).
    pub fn prompts(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn complete(&self, _model: &str, turns: &[ChatTurn]) -> Result<String, BackendError> {
        let last = turns.last().map(|t| t.text.clone()).unwrap_or_default();
        self.sent.lock().unwrap().push(last);

        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Reply(text)) => Ok(text),
            Some(Scripted::TransientFailure(msg)) => Err(BackendError::Transient(msg)),
            Some(Scripted::PermanentFailure(msg)) => Err(BackendError::Permanent(msg)),
            None => Err(BackendError::Permanent("mock script exhausted".into())),
        }
    }
}
