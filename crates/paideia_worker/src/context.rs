//! Application context threaded through the worker and request layer.

use crate::session::SessionStore;
use paideia_core::PaideiaConfig;
use paideia_reasoning::{ChatBackend, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;

/// Everything a job needs to run: the chat backend, the session store and the
/// loaded configuration. Built once at startup and passed down explicitly.
pub struct AppContext {
    pub backend: Arc<dyn ChatBackend>,
    pub sessions: SessionStore,
    pub config: PaideiaConfig,
}

impl AppContext {
    pub fn new(backend: Arc<dyn ChatBackend>, config: PaideiaConfig) -> Self {
        Self {
            backend,
            sessions: SessionStore::new(),
            config,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.config.agent.max_attempts,
            base_delay: Duration::from_secs(self.config.agent.base_backoff_secs),
        }
    }
}
