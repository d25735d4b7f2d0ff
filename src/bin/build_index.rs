//! Offline index build: corpus JSON in, persisted vector index (plus a
//! skipped-chunk report when batches fail) out.

use std::env;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use ragtutor::{
    Cl100kTokenizer, EngineConfig, EmbeddingProvider, HttpEmbeddingProvider,
    MockEmbeddingProvider, RagError, TokenChunker, VectorIndex, build_records, load_documents,
};

#[tokio::main]
async fn main() -> Result<(), RagError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = EngineConfig::from_env();
    config.validate()?;

    let corpus_path = env::var("CORPUS_FILE").unwrap_or_else(|_| "data.json".to_string());
    let index_path =
        env::var("INDEX_FILE").unwrap_or_else(|_| "data_embeddings.json".to_string());
    let skipped_path =
        env::var("SKIPPED_FILE").unwrap_or_else(|_| "skipped_chunks.json".to_string());

    let documents = load_documents(&corpus_path).await?;
    tracing::info!(documents = documents.len(), corpus = %corpus_path, "loaded corpus");

    let tokenizer = Arc::new(Cl100kTokenizer::new()?);
    let chunker = TokenChunker::new(tokenizer, config.chunk_size, config.chunk_overlap)?;

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

    let outcome = build_records(&documents, &chunker, provider.as_ref(), config.batch_size).await?;
    if !outcome.skipped.is_empty() {
        outcome.save_skipped(&skipped_path).await?;
        tracing::warn!(
            skipped = outcome.skipped.len(),
            report = %skipped_path,
            "some chunks were skipped, report written"
        );
    }

    let index = VectorIndex::build(outcome.records)?;
    index.save(&index_path).await?;
    tracing::info!(
        chunks = index.len(),
        dimensions = index.dimensions(),
        index = %index_path,
        "index written"
    );

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
