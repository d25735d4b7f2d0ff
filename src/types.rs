//! Core data types shared across the retrieval pipeline, plus the crate-wide
//! error taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the retrieval engine.
///
/// The taxonomy mirrors how failures are handled rather than where they occur:
/// configuration and index-consistency problems are fatal and fail fast, while
/// remote-service failures are recoverable per batch during index builds and
/// fatal only for the single query they affect at serving time.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid configuration detected before any work starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A remote embedding/vision/generation call failed (non-success status,
    /// timeout, or malformed payload).
    #[error("remote service failure: {0}")]
    RemoteService(String),

    /// The vector matrix and its metadata disagree (dimensionality or length).
    #[error("index consistency violation: {0}")]
    IndexConsistency(String),

    /// The query vector cannot be ranked (zero norm); signals an upstream fault.
    #[error("degenerate query: {0}")]
    DegenerateQuery(String),

    /// A source document could not be parsed or re-materialized.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Filesystem failure while loading or persisting pipeline artifacts.
    #[error("io failure: {0}")]
    Io(String),
}

impl From<std::io::Error> for RagError {
    fn from(err: std::io::Error) -> Self {
        RagError::Io(err.to_string())
    }
}

/// A source document handed to the chunker by upstream ingestion.
///
/// Field names follow the corpus JSON produced by the scraping stage:
/// `{title, source, filename, content}`. `filename` identifies the document
/// for traceability; uniqueness is not enforced here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub source: String,
    pub filename: String,
    pub content: String,
}

/// A token-bounded slice of a document, re-materialized as text.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    pub chunk_index: usize,
    pub text: String,
}

/// Metadata stored alongside each embedded chunk, persisted parallel to the
/// vector matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub title: String,
    pub source: String,
    pub filename: String,
    pub chunk_index: usize,
    pub text: String,
}

/// One successfully embedded chunk: its metadata plus the vector row.
#[derive(Clone, Debug)]
pub struct EmbeddingRecord {
    pub meta: ChunkMeta,
    pub vector: Vec<f32>,
}

/// A chunk excluded from the index because its embedding batch failed.
///
/// Collected into a side report during builds so failures can be retried
/// offline instead of being silently dropped.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SkippedChunk {
    pub filename: String,
    pub chunk_index: usize,
    pub reason: String,
}

/// A deduplicated citation assembled from a retrieved chunk's source URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub text: String,
}
