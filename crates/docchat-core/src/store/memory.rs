//! In-memory [`VectorStore`] implementation.
//!
//! Entries live in a `Vec` behind `std::sync::RwLock`. Search is brute-force
//! cosine similarity over every stored vector, which is fine for the
//! session-sized corpora docchat handles.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{Chunk, ScoredChunk};

use super::VectorStore;

struct StoredVector {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Append-only in-memory vector store.
pub struct InMemoryVectorStore {
    entries: RwLock<Vec<StoredVector>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<StoredVector>>> {
        self.entries
            .read()
            .map_err(|_| anyhow!("vector store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<StoredVector>>> {
        self.entries
            .write()
            .map_err(|_| anyhow!("vector store lock poisoned"))
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != vectors.len() {
            bail!("got {} vectors for {} chunks", vectors.len(), chunks.len());
        }

        let mut entries = self.write()?;
        let dims = entries
            .first()
            .map(|e| e.vector.len())
            .or_else(|| vectors.first().map(|v| v.len()));
        if let Some(dims) = dims {
            if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
                bail!(
                    "embedding dimension mismatch: index holds {}-d vectors, got {}-d",
                    dims,
                    bad.len()
                );
            }
        }

        entries.extend(
            chunks
                .iter()
                .zip(vectors.iter())
                .map(|(chunk, vector)| StoredVector {
                    chunk: chunk.clone(),
                    vector: vector.clone(),
                }),
        );
        Ok(())
    }

    async fn search(
        &self,
        query_vec: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredChunk>> {
        let entries = self.read()?;
        let mut scored: Vec<ScoredChunk> = entries
            .iter()
            .filter_map(|e| {
                let score = cosine_similarity(query_vec, &e.vector);
                (score >= min_score).then(|| ScoredChunk {
                    chunk: e.chunk.clone(),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;

    fn chunk(i: i64, text: &str) -> Chunk {
        Chunk {
            id: format!("c{}", i),
            source: "doc.pdf".to_string(),
            chunk_index: i,
            text: text.to_string(),
            hash: String::new(),
            metadata: Metadata::new(),
        }
    }

    async fn seeded() -> InMemoryVectorStore {
        let store = InMemoryVectorStore::new();
        store
            .add(
                &[
                    chunk(0, "east"),
                    chunk(1, "north-east"),
                    chunk(2, "north"),
                    chunk(3, "west"),
                ],
                &[
                    vec![1.0, 0.0],
                    vec![1.0, 1.0],
                    vec![0.0, 1.0],
                    vec![-1.0, 0.0],
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_search_orders_by_descending_score() {
        let store = seeded().await;
        let results = store.search(&[1.0, 0.1], 10, -1.0).await.unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["east", "north-east", "north", "west"]);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_search_respects_threshold_and_limit() {
        let store = seeded().await;

        let results = store.search(&[1.0, 0.0], 10, 0.3).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.score >= 0.3));

        let results = store.search(&[1.0, 0.0], 1, 0.3).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.text, "east");
    }

    #[tokio::test]
    async fn test_empty_store_returns_nothing() {
        let store = InMemoryVectorStore::new();
        assert!(store.is_empty().await.unwrap());
        assert!(store.search(&[1.0, 0.0], 6, 0.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_appends_without_replacing() {
        let store = seeded().await;
        store
            .add(&[chunk(4, "south")], &[vec![0.0, -1.0]])
            .await
            .unwrap();
        assert_eq!(store.len().await.unwrap(), 5);
        let results = store.search(&[1.0, 0.0], 1, 0.9).await.unwrap();
        assert_eq!(results[0].chunk.text, "east");
    }

    #[tokio::test]
    async fn test_add_rejects_mismatched_input() {
        let store = seeded().await;
        assert!(store.add(&[chunk(9, "x")], &[]).await.is_err());
        assert!(store
            .add(&[chunk(9, "x")], &[vec![1.0, 0.0, 0.0]])
            .await
            .is_err());
        assert_eq!(store.len().await.unwrap(), 4);
    }
}
