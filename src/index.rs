//! In-memory vector index with exact cosine-similarity top-k queries.

use std::cmp::Ordering;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::types::{ChunkMeta, EmbeddingRecord, RagError};

/// Metadata rows plus a parallel row-major matrix of chunk vectors.
///
/// Row `i` of the matrix belongs to `metadata[i]`; the two are sealed together
/// at build time and never mutated afterwards. Adding content means a full
/// rebuild. Queries are a linear scan over every row, which is the intended
/// contract at this scale (thousands of chunks); the query surface does not
/// preclude an approximate implementation behind the same signature later.
pub struct VectorIndex {
    metadata: Vec<ChunkMeta>,
    matrix: Vec<Vec<f32>>,
    dimensions: usize,
}

impl VectorIndex {
    /// Seals records into an index, rejecting mixed vector dimensionality.
    pub fn build(records: Vec<EmbeddingRecord>) -> Result<Self, RagError> {
        let mut metadata = Vec::with_capacity(records.len());
        let mut matrix = Vec::with_capacity(records.len());
        let mut dimensions = 0;

        for (row, record) in records.into_iter().enumerate() {
            if row == 0 {
                dimensions = record.vector.len();
            } else if record.vector.len() != dimensions {
                return Err(RagError::IndexConsistency(format!(
                    "row {row} has dimension {}, index dimension is {dimensions}",
                    record.vector.len()
                )));
            }
            metadata.push(record.meta);
            matrix.push(record.vector);
        }

        Ok(Self {
            metadata,
            matrix,
            dimensions,
        })
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Ranks every stored vector against `query` by cosine similarity and
    /// returns the top `k` rows, descending, ties broken by insertion order.
    ///
    /// An empty index yields an empty result. A zero-norm query is a
    /// [`RagError::DegenerateQuery`]: embedding services do not return zero
    /// vectors for non-empty text, so it signals an upstream fault.
    pub fn query(&self, query: &[f32], k: usize) -> Result<Vec<(&ChunkMeta, f32)>, RagError> {
        if self.matrix.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(RagError::IndexConsistency(format!(
                "query has dimension {}, index dimension is {}",
                query.len(),
                self.dimensions
            )));
        }

        let query_norm = norm(query);
        if query_norm == 0.0 {
            return Err(RagError::DegenerateQuery(
                "query vector has zero norm".to_string(),
            ));
        }

        let mut scored: Vec<(usize, f32)> = self
            .matrix
            .iter()
            .enumerate()
            .map(|(row, vector)| (row, cosine(query, query_norm, vector)))
            .collect();
        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(row, score)| (&self.metadata[row], score))
            .collect())
    }

    /// Persists the index as two co-located arrays: the vector matrix and the
    /// parallel metadata sequence.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), RagError> {
        let persisted = PersistedIndexRef {
            embeddings: &self.matrix,
            metadata: &self.metadata,
        };
        let serialized = serde_json::to_string(&persisted)
            .map_err(|err| RagError::Io(err.to_string()))?;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(path, serialized).await?;
        Ok(())
    }

    /// Loads a persisted index. A length mismatch between the matrix and the
    /// metadata is fatal, as is mixed dimensionality inside the matrix.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RagError> {
        let data = fs::read_to_string(path.as_ref()).await?;
        let persisted: PersistedIndex = serde_json::from_str(&data)
            .map_err(|err| RagError::IndexConsistency(format!("malformed index file: {err}")))?;

        if persisted.embeddings.len() != persisted.metadata.len() {
            return Err(RagError::IndexConsistency(format!(
                "matrix has {} rows but metadata has {} entries",
                persisted.embeddings.len(),
                persisted.metadata.len()
            )));
        }

        let records = persisted
            .metadata
            .into_iter()
            .zip(persisted.embeddings)
            .map(|(meta, vector)| EmbeddingRecord { meta, vector })
            .collect();
        Self::build(records)
    }
}

#[derive(Serialize)]
struct PersistedIndexRef<'a> {
    embeddings: &'a [Vec<f32>],
    metadata: &'a [ChunkMeta],
}

#[derive(Deserialize)]
struct PersistedIndex {
    embeddings: Vec<Vec<f32>>,
    metadata: Vec<ChunkMeta>,
}

fn norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine(query: &[f32], query_norm: f32, row: &[f32]) -> f32 {
    let row_norm = norm(row);
    if row_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = query.iter().zip(row).map(|(a, b)| a * b).sum();
    dot / (query_norm * row_norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(filename: &str, chunk_index: usize, vector: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            meta: ChunkMeta {
                title: "Topic".to_string(),
                source: format!("https://example.com/t/{filename}"),
                filename: filename.to_string(),
                chunk_index,
                text: format!("chunk {chunk_index} of {filename}"),
            },
            vector,
        }
    }

    #[test]
    fn self_retrieval_scores_one() {
        let vectors = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.3, 0.7, 0.1],
            vec![0.0, 0.0, 1.0],
        ];
        let records = vectors
            .iter()
            .enumerate()
            .map(|(i, v)| record("doc", i, v.clone()))
            .collect();
        let index = VectorIndex::build(records).unwrap();

        for target in &vectors {
            let results = index.query(target, 1).unwrap();
            assert_eq!(results.len(), 1);
            assert!((results[0].1 - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn results_are_sorted_descending() {
        let index = VectorIndex::build(vec![
            record("a", 0, vec![0.0, 1.0]),
            record("b", 0, vec![1.0, 0.0]),
            record("c", 0, vec![0.7, 0.7]),
        ])
        .unwrap();

        let results = index.query(&[1.0, 0.0], 3).unwrap();
        let order: Vec<&str> = results.iter().map(|(m, _)| m.filename.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
        assert!(results[0].1 >= results[1].1 && results[1].1 >= results[2].1);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let index = VectorIndex::build(vec![
            record("first", 0, vec![1.0, 0.0]),
            record("second", 0, vec![2.0, 0.0]),
            record("third", 0, vec![0.0, 1.0]),
        ])
        .unwrap();

        // Rows 0 and 1 both score 1.0 against the query.
        let results = index.query(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results[0].0.filename, "first");
        assert_eq!(results[1].0.filename, "second");
    }

    #[test]
    fn cosine_is_scale_invariant() {
        let index = VectorIndex::build(vec![
            record("a", 0, vec![0.2, 0.9]),
            record("b", 0, vec![0.8, 0.1]),
        ])
        .unwrap();

        let plain = index.query(&[0.4, 0.3], 2).unwrap();
        let doubled = index.query(&[0.8, 0.6], 2).unwrap();
        for (lhs, rhs) in plain.iter().zip(&doubled) {
            assert_eq!(lhs.0, rhs.0);
            assert!((lhs.1 - rhs.1).abs() < 1e-6);
        }
    }

    #[test]
    fn empty_index_returns_empty_result() {
        let index = VectorIndex::build(Vec::new()).unwrap();
        assert!(index.query(&[1.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn k_larger_than_index_returns_everything() {
        let index = VectorIndex::build(vec![
            record("a", 0, vec![1.0, 0.0]),
            record("b", 0, vec![0.0, 1.0]),
        ])
        .unwrap();
        assert_eq!(index.query(&[1.0, 1.0], 100).unwrap().len(), 2);
    }

    #[test]
    fn zero_norm_query_is_rejected() {
        let index = VectorIndex::build(vec![record("a", 0, vec![1.0, 0.0])]).unwrap();
        let result = index.query(&[0.0, 0.0], 1);
        assert!(matches!(result, Err(RagError::DegenerateQuery(_))));
    }

    #[test]
    fn mixed_dimensionality_is_rejected_at_build() {
        let result = VectorIndex::build(vec![
            record("a", 0, vec![1.0, 0.0, 0.0]),
            record("b", 0, vec![1.0, 0.0]),
        ]);
        assert!(matches!(result, Err(RagError::IndexConsistency(_))));
    }

    #[test]
    fn query_dimension_mismatch_is_rejected() {
        let index = VectorIndex::build(vec![record("a", 0, vec![1.0, 0.0, 0.0])]).unwrap();
        let result = index.query(&[1.0, 0.0], 1);
        assert!(matches!(result, Err(RagError::IndexConsistency(_))));
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let index = VectorIndex::build(vec![
            record("a", 0, vec![1.0, 0.0]),
            record("b", 1, vec![0.0, 1.0]),
        ])
        .unwrap();
        index.save(&path).await.unwrap();

        let loaded = VectorIndex::load(&path).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.dimensions(), 2);
        let results = loaded.query(&[1.0, 0.0], 1).unwrap();
        assert_eq!(results[0].0.filename, "a");
    }

    #[tokio::test]
    async fn length_mismatch_is_fatal_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        let broken = serde_json::json!({
            "embeddings": [[1.0, 0.0], [0.0, 1.0]],
            "metadata": [{
                "title": "t", "source": "s", "filename": "f",
                "chunk_index": 0, "text": "x"
            }]
        });
        tokio::fs::write(&path, broken.to_string()).await.unwrap();

        let result = VectorIndex::load(&path).await;
        assert!(matches!(result, Err(RagError::IndexConsistency(_))));
    }
}
