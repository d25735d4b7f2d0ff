//! Retrieval engine for a course Q&A assistant.
//!
//! ```text
//! Corpus JSON ──► ingestion::load_documents ──► TokenChunker ──► chunk texts
//!                                                     │
//!                                                     ▼
//!                              EmbeddingProvider (fixed-size batches,
//!                              failed batches → skipped report)
//!                                                     │
//!                                                     ▼
//!                              VectorIndex (metadata + row-major matrix,
//!                              persisted as two co-located arrays)
//!
//! Question (+ optional image description) ──► embed_one ──► VectorIndex::query
//!                                                     │
//!                                                     ▼
//!                              RetrievalEngine: context + deduplicated links
//!                                                     │
//!                                                     ▼
//!                              GenerationClient ──► answer ──► serving boundary
//! ```
//!
//! The index is built offline by `build_index` and loaded read-only by
//! `serve`; queries never mutate it.

pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod index;
pub mod ingestion;
pub mod links;
pub mod ratelimit;
pub mod retrieval;
pub mod server;
pub mod synthesis;
pub mod tokenizer;
pub mod types;

pub use chunking::TokenChunker;
pub use config::EngineConfig;
pub use embeddings::{EmbeddingProvider, HttpEmbeddingProvider, MockEmbeddingProvider};
pub use index::VectorIndex;
pub use ingestion::{BuildOutcome, build_records, load_documents};
pub use retrieval::{Retrieved, RetrievalEngine, ScoredChunk};
pub use tokenizer::{Cl100kTokenizer, Tokenizer};
pub use types::{ChunkMeta, Document, EmbeddingRecord, Link, RagError, SkippedChunk};
