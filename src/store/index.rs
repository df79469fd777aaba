//! Flat nearest-neighbour index over chunk embeddings.
//!
//! Vectors are compared by squared Euclidean distance with an exhaustive scan, which is exact
//! and fast enough for a single document. The on-disk form is plain JSON data: loading an
//! index never runs code embedded in the file.

use crate::processing::DocumentChunk;
use serde::{Deserialize, Serialize};

use super::types::StoreError;

/// Number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 4;

const INDEX_FORMAT_VERSION: u32 = 1;

/// A chunk paired with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Source chunk.
    pub chunk: DocumentChunk,
    /// Embedding produced for `chunk.text`.
    pub vector: Vec<f32>,
}

/// Immutable vector index for one uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    version: u32,
    model: String,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

/// Retrieval hit borrowed from the index.
#[derive(Debug, Clone, Copy)]
pub struct ScoredChunk<'a> {
    /// Matching chunk.
    pub chunk: &'a DocumentChunk,
    /// Squared L2 distance to the query; smaller is closer.
    pub distance: f32,
}

impl VectorIndex {
    /// Pair chunks with their vectors and validate that every vector is usable.
    pub fn build(
        model: impl Into<String>,
        chunks: Vec<DocumentChunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self, StoreError> {
        if chunks.is_empty() {
            return Err(StoreError::InvalidIndex("no chunks to index".into()));
        }
        if chunks.len() != vectors.len() {
            return Err(StoreError::InvalidIndex(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect::<Vec<_>>();
        let dimension = entries[0].vector.len();

        let index = Self {
            version: INDEX_FORMAT_VERSION,
            model: model.into(),
            dimension,
            entries,
        };
        index.validate()?;
        Ok(index)
    }

    /// Decode an index previously written by [`VectorIndex::to_json_bytes`].
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        let index: Self = serde_json::from_slice(bytes)?;
        index.validate()?;
        Ok(index)
    }

    /// Encode the index for persistence.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(self)?)
    }

    fn validate(&self) -> Result<(), StoreError> {
        if self.version != INDEX_FORMAT_VERSION {
            return Err(StoreError::InvalidIndex(format!(
                "unsupported format version {}",
                self.version
            )));
        }
        if self.dimension == 0 {
            return Err(StoreError::InvalidIndex(
                "embedding dimension must be greater than zero".into(),
            ));
        }
        for entry in &self.entries {
            if entry.vector.len() != self.dimension {
                return Err(StoreError::InvalidIndex(format!(
                    "chunk {} has dimension {}, expected {}",
                    entry.chunk.chunk_index,
                    entry.vector.len(),
                    self.dimension
                )));
            }
            if entry.vector.iter().any(|value| !value.is_finite()) {
                return Err(StoreError::InvalidIndex(format!(
                    "chunk {} has a non-finite component",
                    entry.chunk.chunk_index
                )));
            }
        }
        Ok(())
    }

    /// Return up to `k` chunks closest to `query`, nearest first.
    ///
    /// Ties keep document order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk<'_>>, StoreError> {
        if query.len() != self.dimension {
            return Err(StoreError::InvalidIndex(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dimension
            )));
        }

        let mut hits = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk: &entry.chunk,
                distance: squared_l2(query, &entry.vector),
            })
            .collect::<Vec<_>>();
        hits.sort_by(|left, right| left.distance.total_cmp(&right.distance));
        hits.truncate(k);
        Ok(hits)
    }

    /// Embedding model that produced the stored vectors.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Length of every stored vector.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks. Built indexes are never empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn squared_l2(left: &[f32], right: &[f32]) -> f32 {
    left.iter()
        .zip(right)
        .map(|(a, b)| {
            let delta = a - b;
            delta * delta
        })
        .sum()
}
