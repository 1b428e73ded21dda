//! Vector storage abstraction for docchat.
//!
//! The [`VectorStore`] trait defines the operations the retrieval pipeline
//! needs from a similarity index: append embedded chunks, search by query
//! vector with a score floor, and report size. Appending never rebuilds
//! entries that are already stored.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Chunk, ScoredChunk};

/// Abstract similarity index over embedded chunks.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`add`](VectorStore::add) | Append chunks with their vectors |
/// | [`search`](VectorStore::search) | Top-`limit` chunks scoring at least `min_score` |
/// | [`len`](VectorStore::len) | Number of stored chunks |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Append chunks and their embedding vectors.
    ///
    /// `vectors[i]` belongs to `chunks[i]`; the slices must have equal length.
    async fn add(&self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()>;

    /// Return at most `limit` chunks whose similarity to `query_vec` is at
    /// least `min_score`, ordered by descending score.
    async fn search(
        &self,
        query_vec: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredChunk>>;

    /// Number of stored chunks.
    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
