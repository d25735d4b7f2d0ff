//! Serves the Q&A endpoint over a previously built index.

use std::env;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use ragtutor::ratelimit::RateWindow;
use ragtutor::server::{self, AppState};
use ragtutor::synthesis::{GenerationClient, VisionClient};
use ragtutor::{
    EmbeddingProvider, EngineConfig, HttpEmbeddingProvider, MockEmbeddingProvider, RagError,
    RetrievalEngine, VectorIndex,
};

#[tokio::main]
async fn main() -> Result<(), RagError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = EngineConfig::from_env();
    config.validate()?;

    let index_path =
        env::var("INDEX_FILE").unwrap_or_else(|_| "data_embeddings.json".to_string());
    let index = Arc::new(VectorIndex::load(&index_path).await?);
    tracing::info!(
        chunks = index.len(),
        dimensions = index.dimensions(),
        index = %index_path,
        "index loaded"
    );

    let provider: Arc<dyn EmbeddingProvider> = match &config.api_token {
        Some(token) => Arc::new(HttpEmbeddingProvider::new(
            config.embedding_endpoint.clone(),
            config.embedding_model.clone(),
            Some(token.clone()),
            config.request_timeout,
        )?),
        None => {
            tracing::warn!("no API token configured, using mock embeddings");
            Arc::new(MockEmbeddingProvider::new())
        }
    };

    let engine = RetrievalEngine::new(index, provider, config.top_k);

    let vision = match &config.api_token {
        Some(token) => Some(VisionClient::new(
            config.chat_endpoint.clone(),
            config.chat_model.clone(),
            Some(token.clone()),
            config.request_timeout,
            RateWindow::new(config.vision_call_budget, config.vision_window),
        )?),
        None => None,
    };
    let generation = GenerationClient::new(
        config.chat_endpoint.clone(),
        config.chat_model.clone(),
        config.api_token.clone(),
        config.request_timeout,
    )?;

    let state = Arc::new(AppState {
        engine,
        vision,
        generation,
    });

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = TcpListener::bind(bind_addr.as_str()).await?;
    tracing::info!(addr = %bind_addr, "serving");
    axum::serve(listener, server::router(state))
        .await
        .map_err(|err| RagError::Io(err.to_string()))?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
