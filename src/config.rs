//! Engine configuration with environment overrides.

use std::env;
use std::time::Duration;

use url::Url;

use crate::types::RagError;

/// Tunables for the whole pipeline: chunking geometry, batching, retrieval
/// depth, remote endpoints, and rate limiting.
///
/// Defaults match the corpus this engine was built for; binaries layer
/// environment variables on top via [`EngineConfig::from_env`].
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub batch_size: usize,
    pub top_k: usize,
    pub embedding_endpoint: String,
    pub embedding_model: String,
    pub chat_endpoint: String,
    pub chat_model: String,
    pub api_token: Option<String>,
    pub request_timeout: Duration,
    /// Vision calls allowed per rolling window.
    pub vision_call_budget: u32,
    pub vision_window: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 100,
            batch_size: 10,
            top_k: 5,
            embedding_endpoint: "https://api.openai.com/v1/embeddings".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            chat_endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            api_token: None,
            request_timeout: Duration::from_secs(60),
            vision_call_budget: 13,
            vision_window: Duration::from_secs(60),
        }
    }
}

impl EngineConfig {
    /// Builds a config from the environment, falling back to defaults for
    /// anything unset. Unparseable numeric variables fall back rather than
    /// fail; validation happens separately in [`EngineConfig::validate`].
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            chunk_size: env_usize("CHUNK_SIZE").unwrap_or(defaults.chunk_size),
            chunk_overlap: env_usize("CHUNK_OVERLAP").unwrap_or(defaults.chunk_overlap),
            batch_size: env_usize("EMBEDDING_BATCH_SIZE").unwrap_or(defaults.batch_size),
            top_k: env_usize("TOP_K").unwrap_or(defaults.top_k),
            embedding_endpoint: env::var("EMBEDDING_API_URL")
                .unwrap_or(defaults.embedding_endpoint),
            embedding_model: env::var("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            chat_endpoint: env::var("CHAT_API_URL").unwrap_or(defaults.chat_endpoint),
            chat_model: env::var("CHAT_MODEL").unwrap_or(defaults.chat_model),
            api_token: env::var("AIPROXY_TOKEN").ok().filter(|t| !t.is_empty()),
            request_timeout: env_usize("REQUEST_TIMEOUT_SECS")
                .map(|secs| Duration::from_secs(secs as u64))
                .unwrap_or(defaults.request_timeout),
            vision_call_budget: env_usize("VISION_CALL_BUDGET")
                .map(|b| b as u32)
                .unwrap_or(defaults.vision_call_budget),
            vision_window: defaults.vision_window,
        }
    }

    /// Fails fast on configurations that would make the pipeline loop or
    /// misroute requests, before any work starts.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunk_size == 0 {
            return Err(RagError::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.batch_size == 0 {
            return Err(RagError::Configuration(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(RagError::Configuration(
                "top_k must be greater than zero".to_string(),
            ));
        }
        for (name, endpoint) in [
            ("embedding endpoint", &self.embedding_endpoint),
            ("chat endpoint", &self.chat_endpoint),
        ] {
            Url::parse(endpoint).map_err(|err| {
                RagError::Configuration(format!("{name} '{endpoint}' is not a valid URL: {err}"))
            })?;
        }
        Ok(())
    }
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}
