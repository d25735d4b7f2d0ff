//! Tokenizer adapter over the fixed cl100k_base subword vocabulary.

use std::sync::{Arc, OnceLock};

use tiktoken_rs::CoreBPE;

use crate::types::RagError;

/// Maps text to token ids and back.
///
/// Implementations must be deterministic and side-effect free. The round trip
/// `decode(encode(x))` is not required to be byte-exact, but must lose no
/// tokens so re-materialized chunks stay usable for embedding.
pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Vec<u32>;
    fn decode(&self, tokens: &[u32]) -> Result<String, RagError>;
}

static CL100K: OnceLock<Arc<CoreBPE>> = OnceLock::new();

/// Tokenizer backed by the cl100k_base encoding, the vocabulary used by the
/// embedding model this pipeline targets.
///
/// The vocabulary table is loaded once per process and shared between clones.
#[derive(Clone)]
pub struct Cl100kTokenizer {
    bpe: Arc<CoreBPE>,
}

impl Cl100kTokenizer {
    pub fn new() -> Result<Self, RagError> {
        if let Some(bpe) = CL100K.get() {
            return Ok(Self { bpe: bpe.clone() });
        }
        let bpe = Arc::new(tiktoken_rs::cl100k_base().map_err(|err| {
            RagError::Configuration(format!("failed to load cl100k_base vocabulary: {err}"))
        })?);
        Ok(Self {
            bpe: CL100K.get_or_init(|| bpe).clone(),
        })
    }
}

impl Tokenizer for Cl100kTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe.encode_ordinary(text)
    }

    fn decode(&self, tokens: &[u32]) -> Result<String, RagError> {
        self.bpe
            .decode(tokens.to_vec())
            .map_err(|err| RagError::InvalidDocument(format!("token decode failed: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_deterministic() {
        let tokenizer = Cl100kTokenizer::new().unwrap();
        let first = tokenizer.encode("pandas read_csv with chunksize");
        let second = tokenizer.encode("pandas read_csv with chunksize");
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn round_trip_preserves_text() {
        let tokenizer = Cl100kTokenizer::new().unwrap();
        let text = "Use `uv run` to execute the notebook, then submit on Discourse.";
        let tokens = tokenizer.encode(text);
        let decoded = tokenizer.decode(&tokens).unwrap();
        assert_eq!(decoded, text);
    }

    #[test]
    fn empty_text_encodes_to_nothing() {
        let tokenizer = Cl100kTokenizer::new().unwrap();
        assert!(tokenizer.encode("").is_empty());
    }
}
