//! Resilient chat client.
//!
//! Owns one append-only conversation with the backend. The configured
//! direction text is injected exactly once, before the first user-visible
//! exchange. Transient backend failures are retried with exponential backoff
//! (`base × 2^attempt`); the final attempt's failure propagates to the caller
//! and is the one unrecoverable path in the runtime.

use crate::backend::{BackendError, ChatBackend, ChatRole, ChatTurn};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts (including the first) before giving up.
    pub max_attempts: u32,
    /// Wait before attempt i+1 is `base_delay × 2^i`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(10),
        }
    }
}

pub struct ChatClient {
    backend: Arc<dyn ChatBackend>,
    model: String,
    directions: String,
    retry: RetryPolicy,
    initialized: bool,
    history: Vec<ChatTurn>,
}

impl ChatClient {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        model: impl Into<String>,
        directions: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            directions: directions.into(),
            retry,
            initialized: false,
            history: Vec::new(),
        }
    }

    /// Send one user message and return the model's completion.
    ///
    /// The first call injects the direction message (set-once) before the
    /// user text goes out. Every successful exchange appends both sides to
    /// the history.
    pub async fn send(&mut self, message: &str) -> Result<String> {
        if !self.initialized {
            self.exchange(ChatRole::Direction, self.directions.clone())
                .await?;
            self.initialized = true;
        }
        self.exchange(ChatRole::User, message.to_string()).await
    }

    async fn exchange(&mut self, role: ChatRole, text: String) -> Result<String> {
        self.history.push(ChatTurn::new(role, text));
        match self.complete_with_retry().await {
            Ok(reply) => {
                self.history.push(ChatTurn::new(ChatRole::Model, reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                // Keep the history consistent: a turn the model never saw
                // answered must not linger.
                self.history.pop();
                Err(e)
            }
        }
    }

    async fn complete_with_retry(&self) -> Result<String> {
        let mut attempt: u32 = 0;
        loop {
            match self.backend.complete(&self.model, &self.history).await {
                Ok(reply) => {
                    if attempt > 0 {
                        tracing::info!("backend succeeded on attempt {}", attempt + 1);
                    }
                    return Ok(reply);
                }
                Err(BackendError::Permanent(msg)) => {
                    return Err(anyhow::anyhow!("permanent backend failure: {msg}"));
                }
                Err(BackendError::Transient(msg)) => {
                    if attempt + 1 >= self.retry.max_attempts {
                        return Err(anyhow::anyhow!(
                            "backend failed after {} attempts: {msg}",
                            self.retry.max_attempts
                        ));
                    }
                    let wait = self.retry.base_delay * 2u32.pow(attempt);
                    tracing::warn!(
                        "transient backend failure (attempt {}/{}), retrying in {:?}: {}",
                        attempt + 1,
                        self.retry.max_attempts,
                        wait,
                        msg
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Render the conversation with caller-supplied labels, one turn per
    /// line.
    pub fn transcript(&self, direction_label: &str, user_label: &str, model_label: &str) -> String {
        let mut out = String::new();
        for turn in &self.history {
            let label = match turn.role {
                ChatRole::Direction => direction_label,
                ChatRole::User => user_label,
                ChatRole::Model => model_label,
            };
            out.push_str(label);
            out.push_str(&turn.text);
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }
        out
    }
}
