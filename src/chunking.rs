//! Token-aware document chunking with a sliding, overlapping window.

use std::sync::Arc;

use crate::tokenizer::Tokenizer;
use crate::types::{Chunk, Document, RagError};

/// Splits text into overlapping token-bounded segments.
///
/// Boundaries are deterministic given `(text, chunk_size, overlap)`: a window
/// of `chunk_size` tokens advances by `chunk_size - overlap` tokens per step,
/// and the final window may be shorter. Text at or under `chunk_size` tokens
/// is passed through as a single chunk of the *stripped original* text rather
/// than the detokenized round trip, so short documents carry no lossy
/// artifacts.
pub struct TokenChunker {
    tokenizer: Arc<dyn Tokenizer>,
    chunk_size: usize,
    overlap: usize,
}

impl TokenChunker {
    /// Creates a chunker, rejecting configurations whose advance step would be
    /// zero or negative (`overlap >= chunk_size` would otherwise loop forever).
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        chunk_size: usize,
        overlap: usize,
    ) -> Result<Self, RagError> {
        if chunk_size == 0 {
            return Err(RagError::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(RagError::Configuration(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            tokenizer,
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Splits `text` into chunk strings. Empty or whitespace-only input yields
    /// no chunks.
    pub fn chunk(&self, text: &str) -> Result<Vec<String>, RagError> {
        let stripped = text.trim();
        if stripped.is_empty() {
            return Ok(Vec::new());
        }

        let tokens = self.tokenizer.encode(text);
        if tokens.len() <= self.chunk_size {
            return Ok(vec![stripped.to_string()]);
        }

        let stride = self.chunk_size - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(tokens.len());
            chunks.push(self.tokenizer.decode(&tokens[start..end])?);
            if end == tokens.len() {
                break;
            }
            start += stride;
        }
        Ok(chunks)
    }

    /// Chunks a document's content, attaching per-document chunk indices.
    pub fn chunk_document(&self, document: &Document) -> Result<Vec<Chunk>, RagError> {
        Ok(self
            .chunk(&document.content)?
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| Chunk { chunk_index, text })
            .collect())
    }
}
