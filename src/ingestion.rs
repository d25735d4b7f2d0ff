//! Offline index construction: corpus loading, chunking, and batched
//! embedding with partial-failure tolerance.

use std::path::Path;

use tokio::fs;

use crate::chunking::TokenChunker;
use crate::embeddings::EmbeddingProvider;
use crate::types::{ChunkMeta, Document, EmbeddingRecord, RagError, SkippedChunk};

/// Result of an index build: the records that embedded successfully plus the
/// side report of chunks that did not.
#[derive(Debug)]
pub struct BuildOutcome {
    pub records: Vec<EmbeddingRecord>,
    pub skipped: Vec<SkippedChunk>,
}

impl BuildOutcome {
    /// Writes the skipped-chunk report so failed batches can be retried
    /// offline. No file is written when nothing was skipped.
    pub async fn save_skipped(&self, path: impl AsRef<Path>) -> Result<(), RagError> {
        if self.skipped.is_empty() {
            return Ok(());
        }
        let serialized = serde_json::to_string_pretty(&self.skipped)
            .map_err(|err| RagError::Io(err.to_string()))?;
        fs::write(path.as_ref(), serialized).await?;
        Ok(())
    }
}

/// Loads the corpus JSON produced by the scraping stage: an array of
/// `{title, source, filename, content}` objects.
pub async fn load_documents(path: impl AsRef<Path>) -> Result<Vec<Document>, RagError> {
    let data = fs::read_to_string(path.as_ref()).await?;
    serde_json::from_str(&data)
        .map_err(|err| RagError::InvalidDocument(format!("malformed corpus file: {err}")))
}

/// Chunks every document and embeds the chunk texts in fixed-size batches.
///
/// Batch boundaries ignore document boundaries. A failed batch does not abort
/// the build: its chunks land in the skipped report with the failure reason
/// and every sibling batch continues. The one fatal condition is vectors of
/// different dimensionality across batches, which would poison the index.
pub async fn build_records(
    documents: &[Document],
    chunker: &TokenChunker,
    provider: &dyn EmbeddingProvider,
    batch_size: usize,
) -> Result<BuildOutcome, RagError> {
    if batch_size == 0 {
        return Err(RagError::Configuration(
            "batch_size must be greater than zero".to_string(),
        ));
    }

    let mut pending: Vec<ChunkMeta> = Vec::new();
    let mut skipped: Vec<SkippedChunk> = Vec::new();

    for document in documents {
        if document.content.trim().is_empty() {
            continue;
        }
        match chunker.chunk_document(document) {
            Ok(chunks) => {
                for chunk in chunks {
                    pending.push(ChunkMeta {
                        title: document.title.clone(),
                        source: document.source.clone(),
                        filename: document.filename.clone(),
                        chunk_index: chunk.chunk_index,
                        text: chunk.text,
                    });
                }
            }
            Err(err) => {
                tracing::warn!(filename = %document.filename, error = %err, "failed to chunk document");
                skipped.push(SkippedChunk {
                    filename: document.filename.clone(),
                    chunk_index: 0,
                    reason: format!("chunking failed: {err}"),
                });
            }
        }
    }

    tracing::info!(chunks = pending.len(), "chunking complete, embedding in batches");

    let mut records: Vec<EmbeddingRecord> = Vec::with_capacity(pending.len());
    let mut dimensions: Option<usize> = None;

    for (batch_number, batch) in pending.chunks(batch_size).enumerate() {
        let texts: Vec<String> = batch.iter().map(|meta| meta.text.clone()).collect();
        match provider.embed_batch(&texts).await {
            Ok(vectors) if vectors.len() == batch.len() => {
                for (meta, vector) in batch.iter().zip(vectors) {
                    match dimensions {
                        None => dimensions = Some(vector.len()),
                        Some(d) if vector.len() != d => {
                            return Err(RagError::IndexConsistency(format!(
                                "batch {} returned dimension {}, index dimension is {d}",
                                batch_number + 1,
                                vector.len()
                            )));
                        }
                        Some(_) => {}
                    }
                    records.push(EmbeddingRecord {
                        meta: meta.clone(),
                        vector,
                    });
                }
                tracing::info!(
                    batch = batch_number + 1,
                    chunks = batch.len(),
                    "embedded batch"
                );
            }
            Ok(vectors) => {
                let reason = format!(
                    "embedding service returned {} vectors for {} inputs",
                    vectors.len(),
                    batch.len()
                );
                tracing::warn!(batch = batch_number + 1, %reason, "batch skipped");
                record_skipped_batch(&mut skipped, batch, &reason);
            }
            Err(err) => {
                tracing::warn!(batch = batch_number + 1, error = %err, "batch skipped");
                record_skipped_batch(&mut skipped, batch, &err.to_string());
            }
        }
    }

    tracing::info!(
        records = records.len(),
        skipped = skipped.len(),
        "embedding complete"
    );

    Ok(BuildOutcome { records, skipped })
}

fn record_skipped_batch(skipped: &mut Vec<SkippedChunk>, batch: &[ChunkMeta], reason: &str) {
    for meta in batch {
        skipped.push(SkippedChunk {
            filename: meta.filename.clone(),
            chunk_index: meta.chunk_index,
            reason: reason.to_string(),
        });
    }
}
