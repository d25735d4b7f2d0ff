//! Embedding acquisition: the provider abstraction, the HTTP client for the
//! remote embedding service, and a deterministic mock for tests and offline
//! runs.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::RagError;

/// Produces dense vectors for texts.
///
/// `embed_batch` is positionally aligned with its input: vector `i` belongs to
/// `texts[i]`. A failed call reports the whole batch as failed; callers decide
/// whether that aborts anything (during index builds it must not).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Embeds a single text, used for query-time question embedding.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let input = vec![text.to_string()];
        let mut vectors = self.embed_batch(&input).await?;
        if vectors.len() != 1 {
            return Err(RagError::RemoteService(format!(
                "embedding service returned {} vectors for a single input",
                vectors.len()
            )));
        }
        Ok(vectors.remove(0))
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Client for an OpenAI-style `/embeddings` endpoint.
///
/// Wire contract: `{model, input: [..]}` in, `{data: [{embedding: [..]}]}`
/// out, positionally aligned. Any non-success status, transport error, or
/// misaligned response is a [`RagError::RemoteService`] for that call only.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_token: Option<String>,
}

impl HttpEmbeddingProvider {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RagError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RagError::Configuration(format!("embedding client: {err}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_token,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| RagError::RemoteService(format!("embedding request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::RemoteService(format!(
                "embedding service returned {status}: {body}"
            )));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|err| {
            RagError::RemoteService(format!("malformed embedding response: {err}"))
        })?;
        if parsed.data.len() != texts.len() {
            return Err(RagError::RemoteService(format!(
                "embedding service returned {} vectors for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Deterministic embedding provider for tests and offline pipeline runs.
///
/// Vectors are derived from a hash of the input text, so identical texts get
/// identical vectors, different texts get different ones, and no component is
/// ever zero (query vectors stay rankable).
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self::with_dimensions(16)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        use std::hash::{DefaultHasher, Hash, Hasher};

        (0..self.dimensions)
            .map(|component| {
                let mut hasher = DefaultHasher::new();
                text.hash(&mut hasher);
                component.hash(&mut hasher);
                ((hasher.finish() % 1000) as f32 + 1.0) / 1001.0
            })
            .collect()
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }
}
