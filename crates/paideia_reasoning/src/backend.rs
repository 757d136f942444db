//! Seam between the agent runtime and the language-model service.
//!
//! The backend is stateless: each call receives the full conversation so far
//! and returns one completion. Session state (history, direction injection,
//! retry) lives in `ChatClient`, which is the sole owner of the turn list.

use async_trait::async_trait;

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    /// The one-time setup/system message injected before the first exchange.
    Direction,
    User,
    Model,
}

#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Failures surfaced by a backend. Only `Transient` is retry-eligible.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("transient backend failure: {0}")]
    Transient(String),
    #[error("permanent backend failure: {0}")]
    Permanent(String),
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Produce the next model turn for the given conversation.
    async fn complete(&self, model: &str, turns: &[ChatTurn]) -> Result<String, BackendError>;
}
