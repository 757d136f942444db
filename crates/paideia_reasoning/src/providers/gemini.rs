//! Gemini `generateContent` provider.
//!
//! Classifies HTTP 408/429/5xx and network-level failures as transient so the
//! chat client's backoff can retry them; other non-success statuses fail
//! immediately.

use crate::backend::{BackendError, ChatBackend, ChatRole, ChatTurn};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    /// Build from the environment: key from `api_key_env`, optional base URL
    /// from `GEMINI_BASE_URL`.
    pub fn from_env(api_key_env: &str, base_url: Option<String>) -> anyhow::Result<Self> {
        let api_key = env::var(api_key_env)
            .map_err(|_| anyhow::anyhow!("{} is not set", api_key_env))?;
        Ok(Self::new(api_key, base_url))
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<WireContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    role: String,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WirePart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: WireContent,
}

fn to_wire(turns: &[ChatTurn]) -> Vec<WireContent> {
    turns
        .iter()
        .map(|t| WireContent {
            // The direction turn travels as a user message; Gemini's chat API
            // only knows user/model roles.
            role: match t.role {
                ChatRole::Direction | ChatRole::User => "user".to_string(),
                ChatRole::Model => "model".to_string(),
            },
            parts: vec![WirePart {
                text: t.text.clone(),
            }],
        })
        .collect()
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    #[tracing::instrument(skip(self, turns), fields(model = %model, turns = turns.len()))]
    async fn complete(&self, model: &str, turns: &[ChatTurn]) -> Result<String, BackendError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            model,
            self.api_key
        );

        let body = GenerateRequest {
            contents: to_wire(turns),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Transient(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail: String = text.chars().take(300).collect();
            return if is_retryable_status(status) {
                Err(BackendError::Transient(format!("{status}: {detail}")))
            } else {
                Err(BackendError::Permanent(format!("{status}: {detail}")))
            };
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Permanent(format!("malformed response body: {e}")))?;

        let completion = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| BackendError::Permanent("response contained no candidates".into()))?;

        tracing::debug!("completion received ({} chars)", completion.len());
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::REQUEST_TIMEOUT));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_direction_travels_as_user_role() {
        let turns = vec![
            ChatTurn::new(ChatRole::Direction, "be helpful"),
            ChatTurn::new(ChatRole::Model, "Understood."),
            ChatTurn::new(ChatRole::User, "hello"),
        ];
        let wire = to_wire(&turns);
        assert_eq!(wire[0].role, "user");
        assert_eq!(wire[1].role, "model");
        assert_eq!(wire[2].role, "user");
        assert_eq!(wire[0].parts[0].text, "be helpful");
    }
}
