//! Thin clients for the vision and generation collaborators.
//!
//! These sit outside the retrieval core: their responses are opaque text.
//! The core only depends on the request shape, the failure mapping onto
//! [`RagError::RemoteService`], and the sanitizing applied to image
//! descriptions before they join the query.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use crate::ratelimit::RateWindow;
use crate::types::RagError;

const DESCRIBE_PROMPT: &str = "Describe the image in detail.";

const SYSTEM_PROMPT: &str = "You are a teaching assistant for the course. Use only the given \
context to answer the question. Be specific, and always mention relevant course tools or \
methods. If unsure, say 'I don't know'.";

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

fn code_fences() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```.*?```").expect("hard-coded regex"))
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("hard-coded regex"))
}

/// Strips fenced code blocks and collapses whitespace so a model's image
/// description concatenates cleanly into a single-line query.
pub fn sanitize_description(raw: &str) -> String {
    let without_fences = code_fences().replace_all(raw, "");
    whitespace_runs()
        .replace_all(&without_fences, " ")
        .trim()
        .to_string()
}

async fn post_chat(
    client: &reqwest::Client,
    endpoint: &str,
    api_token: Option<&str>,
    payload: serde_json::Value,
    what: &str,
) -> Result<String, RagError> {
    let mut request = client.post(endpoint).json(&payload);
    if let Some(token) = api_token {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .map_err(|err| RagError::RemoteService(format!("{what} request failed: {err}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RagError::RemoteService(format!(
            "{what} service returned {status}: {body}"
        )));
    }

    let parsed: ChatResponse = response
        .json()
        .await
        .map_err(|err| RagError::RemoteService(format!("malformed {what} response: {err}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| RagError::RemoteService(format!("{what} response carried no choices")))
}

/// Client for the remote vision model that captions images.
///
/// Owns the rolling-window rate limit, since captioning is the one call site
/// that loops tightly over many images during corpus preparation.
pub struct VisionClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_token: Option<String>,
    rate: RateWindow,
}

impl VisionClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
        rate: RateWindow,
    ) -> Result<Self, RagError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RagError::Configuration(format!("vision client: {err}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_token,
            rate,
        })
    }

    /// Captions a base64-encoded image, returning sanitized description text.
    ///
    /// Bare payloads are wrapped into a webp data URL; payloads that already
    /// carry a `data:image` prefix pass through untouched.
    pub async fn describe(&self, image_base64: &str) -> Result<String, RagError> {
        self.rate.acquire().await;

        let data_url = if image_base64.starts_with("data:image") {
            image_base64.to_string()
        } else {
            format!("data:image/webp;base64,{image_base64}")
        };
        let payload = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": DESCRIBE_PROMPT},
                    {"type": "image_url", "image_url": {"url": data_url}},
                ],
            }],
        });

        let content = post_chat(
            &self.client,
            &self.endpoint,
            self.api_token.as_deref(),
            payload,
            "vision",
        )
        .await?;
        Ok(sanitize_description(&content))
    }
}

/// Client for the generative model that writes the final answer from the
/// assembled context.
pub struct GenerationClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_token: Option<String>,
}

impl GenerationClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RagError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RagError::Configuration(format!("generation client: {err}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_token,
        })
    }

    /// Asks the model to answer `question` grounded in `context`.
    pub async fn answer(&self, question: &str, context: &str) -> Result<String, RagError> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": format!("Context : {context}\nQuestion : {question}")},
            ],
        });

        post_chat(
            &self.client,
            &self.endpoint,
            self.api_token.as_deref(),
            payload,
            "generation",
        )
        .await
    }
}
