use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PaideiaConfig {
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub quiz: QuizConfig,
    pub worker: WorkerConfig,
}

impl PaideiaConfig {
    /// Load config from a TOML file, falling back to defaults for missing
    /// fields. After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: PaideiaConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if the file doesn't exist, return defaults with
    /// env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PAIDEIA_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("GEMINI_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("PAIDEIA_MAX_ATTEMPTS") {
            if let Ok(n) = v.parse() {
                self.agent.max_attempts = n;
            }
        }
        if let Ok(v) = std::env::var("PAIDEIA_BASE_BACKOFF_SECS") {
            if let Ok(n) = v.parse() {
                self.agent.base_backoff_secs = n;
            }
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier passed to the chat backend.
    pub model: String,
    /// Override for the backend base URL (proxies, self-hosted gateways).
    pub base_url: Option<String>,
    /// Env var holding the API key. The key itself never lives in the file.
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            base_url: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Total completion attempts before a transient failure becomes fatal.
    pub max_attempts: u32,
    /// Seconds; real wait before attempt i+1 is `base_backoff_secs * 2^i`.
    pub base_backoff_secs: u64,
    /// Corrective re-prompts allowed per `prompt` call before the turn is
    /// abandoned.
    pub max_corrections: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff_secs: 10,
            max_corrections: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    /// Scale factor for the √word-count size heuristic.
    pub size_k: f64,
    pub size_min: usize,
    pub size_max: usize,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            size_k: 0.35,
            size_min: 6,
            size_max: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Bounded job channel capacity; producers await when full.
    pub queue_capacity: usize,
    /// Hard deadline for the shutdown join, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            shutdown_timeout_secs: 10,
        }
    }
}
