use crate::chunking::TextChunk;
use crate::embeddings::{Embedder, Embedding};
use crate::error::{BackendError, RagError, Result};
use log::{debug, info};

/// A chunk returned from a search together with its cosine similarity
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: TextChunk,
    pub score: f32,
}

/// In-memory nearest-neighbour index over chunk embeddings
///
/// Built once from a complete set of chunks and never modified afterwards.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    entries: Vec<(TextChunk, Embedding)>,
    dimension: usize,
}

impl VectorIndex {
    /// Embed every chunk and build the index
    ///
    /// Whitespace-only chunks are not indexed. Any embedding failure aborts the
    /// whole build so a partial index is never produced.
    pub async fn build<E: Embedder>(embedder: &E, chunks: Vec<TextChunk>) -> Result<Self> {
        let mut entries = Vec::with_capacity(chunks.len());
        let mut dimension = None;

        for chunk in chunks {
            if chunk.text.trim().is_empty() {
                continue;
            }

            let embedding = embedder.embed(&chunk.text).await.map_err(RagError::Embedding)?;
            let expected = *dimension.get_or_insert(embedding.dimension());
            if embedding.dimension() != expected || expected == 0 {
                return Err(RagError::Embedding(BackendError::Malformed(format!(
                    "embedding has {} dimensions, expected {}",
                    embedding.dimension(),
                    expected
                ))));
            }
            entries.push((chunk, embedding));
            debug!("Indexed chunk {}", entries.len());
        }

        if entries.is_empty() {
            return Err(RagError::EmptyText);
        }

        let dimension = dimension.unwrap_or_default();
        info!(
            "Built vector index with {} chunks of {} dimensions",
            entries.len(),
            dimension
        );
        Ok(VectorIndex { entries, dimension })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Search for the `limit` chunks most similar to the query embedding
    ///
    /// Results are ordered by non-increasing similarity; equal scores keep
    /// insertion order.
    pub fn search(&self, query: &Embedding, limit: usize) -> Vec<ScoredChunk> {
        if limit == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, (_, embedding))| (idx, cosine_similarity(&query.values, &embedding.values)))
            .collect();

        // Stable sort keeps insertion order for ties
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);

        scored
            .into_iter()
            .map(|(idx, score)| ScoredChunk {
                chunk: self.entries[idx].0.clone(),
                score,
            })
            .collect()
    }
}

/// Calculate cosine similarity between two vectors
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot_product = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (x, y) in a.iter().zip(b.iter()) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = (norm_a * norm_b).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }

    dot_product / denominator
}

/// Text-in, chunks-out view over an index and the embedder that built it
pub struct Retriever<E> {
    embedder: E,
    index: VectorIndex,
}

impl<E: Embedder> Retriever<E> {
    pub fn new(embedder: E, index: VectorIndex) -> Self {
        Retriever { embedder, index }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Embed `text` and return the `limit` closest chunks
    pub async fn query(&self, text: &str, limit: usize) -> Result<Vec<ScoredChunk>> {
        let embedding = self
            .embedder
            .embed(text)
            .await
            .map_err(RagError::Retrieval)?;

        if embedding.dimension() != self.index.dimension() {
            return Err(RagError::Retrieval(BackendError::Malformed(format!(
                "query embedding has {} dimensions, index has {}",
                embedding.dimension(),
                self.index.dimension()
            ))));
        }
        Ok(self.index.search(&embedding, limit))
    }
}
