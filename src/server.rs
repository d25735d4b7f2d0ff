//! Single-endpoint serving boundary.
//!
//! `POST /api/` accepts `{question, image?}` and always returns a well-formed
//! body: `{answer, links}` on success or `{error}` on any internal failure.
//! Nothing raises past the handler; a failed request never takes the process
//! down.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::retrieval::RetrievalEngine;
use crate::synthesis::{GenerationClient, VisionClient};
use crate::types::{Link, RagError};

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    /// Optional base64-encoded image attached to the question.
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AskResponse {
    Answer { answer: String, links: Vec<Link> },
    Error { error: String },
}

/// Read-only serving state shared across requests.
pub struct AppState {
    pub engine: RetrievalEngine,
    pub vision: Option<VisionClient>,
    pub generation: GenerationClient,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/", post(answer_question))
        .with_state(state)
}

async fn answer_question(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> Json<AskResponse> {
    match handle(&state, &request).await {
        Ok(response) => Json(response),
        Err(err) => {
            tracing::error!(error = %err, "request failed");
            Json(AskResponse::Error {
                error: err.to_string(),
            })
        }
    }
}

async fn handle(state: &AppState, request: &AskRequest) -> Result<AskResponse, RagError> {
    let image = request.image.as_deref().filter(|image| !image.is_empty());
    let description = match image {
        Some(image) => match &state.vision {
            // A vision failure here is fatal for this query: without the
            // description no faithful answer to an image question exists.
            Some(vision) => Some(vision.describe(image).await?),
            None => {
                return Err(RagError::Configuration(
                    "image questions require a configured vision client".to_string(),
                ));
            }
        },
        None => None,
    };

    let retrieved = state
        .engine
        .retrieve(&request.question, description.as_deref())
        .await?;
    let answer = state
        .generation
        .answer(&request.question, &retrieved.context)
        .await?;

    Ok(AskResponse::Answer {
        answer,
        links: retrieved.links,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_response_serializes_flat() {
        let response = AskResponse::Answer {
            answer: "Use pandas.".to_string(),
            links: vec![Link {
                url: "https://forum.example.com/t/pandas/1".to_string(),
                text: "Pandas thread".to_string(),
            }],
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["answer"], "Use pandas.");
        assert_eq!(value["links"][0]["url"], "https://forum.example.com/t/pandas/1");
    }

    #[test]
    fn error_response_has_error_field_only() {
        let response = AskResponse::Error {
            error: "remote service failure: embedding service returned 500".to_string(),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("error").is_some());
        assert!(value.get("answer").is_none());
    }

    #[test]
    fn request_image_defaults_to_none() {
        let request: AskRequest =
            serde_json::from_str(r#"{"question": "what is docker?"}"#).unwrap();
        assert!(request.image.is_none());
    }
}
