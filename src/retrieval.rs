//! Query-time retrieval: question embedding, top-k ranking, context assembly,
//! and citation links.

use std::sync::Arc;

use crate::embeddings::EmbeddingProvider;
use crate::index::VectorIndex;
use crate::links::collect_links;
use crate::types::{ChunkMeta, Link, RagError};

/// A retrieved chunk together with its cosine similarity to the query.
#[derive(Clone, Debug)]
pub struct ScoredChunk {
    pub meta: ChunkMeta,
    pub score: f32,
}

/// Everything the answer synthesizer needs: grounding context ordered most
/// relevant first, deduplicated citation links, and the ranked chunks.
#[derive(Clone, Debug)]
pub struct Retrieved {
    pub context: String,
    pub links: Vec<Link>,
    pub results: Vec<ScoredChunk>,
}

/// Combines the read-only index with an embedding provider to serve queries.
pub struct RetrievalEngine {
    index: Arc<VectorIndex>,
    provider: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl RetrievalEngine {
    pub fn new(index: Arc<VectorIndex>, provider: Arc<dyn EmbeddingProvider>, top_k: usize) -> Self {
        Self {
            index,
            provider,
            top_k,
        }
    }

    /// Retrieves the chunks most relevant to `question`.
    ///
    /// An image description, when present, is appended to the question text
    /// before embedding so image content lands in the same semantic space as
    /// the text corpus. A failure embedding the question is fatal for this
    /// query only; the caller converts it into an error response.
    pub async fn retrieve(
        &self,
        question: &str,
        image_description: Option<&str>,
    ) -> Result<Retrieved, RagError> {
        let query_text = match image_description {
            Some(description) if !description.trim().is_empty() => {
                format!("{question} Description: {description}")
            }
            _ => question.to_string(),
        };

        let query_vector = self.provider.embed_one(&query_text).await?;
        let ranked = self.index.query(&query_vector, self.top_k)?;
        tracing::debug!(
            results = ranked.len(),
            top_score = ranked.first().map(|(_, s)| *s).unwrap_or(0.0),
            "ranked query against index"
        );

        let context = ranked
            .iter()
            .map(|(meta, _)| meta.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let links = collect_links(
            ranked
                .iter()
                .map(|(meta, _)| (meta.source.as_str(), meta.title.as_str())),
        );
        let results = ranked
            .into_iter()
            .map(|(meta, score)| ScoredChunk {
                meta: meta.clone(),
                score,
            })
            .collect();

        Ok(Retrieved {
            context,
            links,
            results,
        })
    }
}
