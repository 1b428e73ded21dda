//! The session's searchable knowledge base.
//!
//! [`VectorIndex`] pairs an [`EmbeddingProvider`] with a [`VectorStore`]:
//! `add` embeds chunk texts in batches and appends them, `query` embeds the
//! question and runs a thresholded cosine search.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::debug;

use docchat_core::embedding::EmbeddingProvider;
use docchat_core::models::{Chunk, ScoredChunk};
use docchat_core::store::memory::InMemoryVectorStore;
use docchat_core::store::VectorStore;

pub struct VectorIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Box<dyn VectorStore>,
    batch_size: usize,
}

impl VectorIndex {
    /// An empty index backed by [`InMemoryVectorStore`].
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        Self::with_store(embedder, Box::new(InMemoryVectorStore::new()), batch_size)
    }

    pub fn with_store(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Box<dyn VectorStore>,
        batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Embed and append `chunks`. Existing entries are never rebuilt.
    ///
    /// Every batch is embedded before anything is written, so a failed
    /// embedding call leaves the index as it was.
    pub async fn add(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embedded = self
                .embedder
                .embed(&texts)
                .await
                .with_context(|| format!("embedding {} chunks", texts.len()))?;
            if embedded.len() != texts.len() {
                bail!(
                    "{} returned {} vectors for {} texts",
                    self.embedder.model_name(),
                    embedded.len(),
                    texts.len()
                );
            }
            vectors.extend(embedded);
        }

        self.store.add(chunks, &vectors).await?;
        debug!(
            chunks = chunks.len(),
            model = self.embedder.model_name(),
            "appended to index"
        );
        Ok(chunks.len())
    }

    /// The `k` chunks most similar to `text` scoring at least `score_threshold`.
    pub async fn query(
        &self,
        text: &str,
        k: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredChunk>> {
        if self.store.is_empty().await? || k == 0 {
            return Ok(Vec::new());
        }

        let mut embedded = self
            .embedder
            .embed(&[text.to_string()])
            .await
            .context("embedding query")?;
        let query_vec = match embedded.pop() {
            Some(v) if embedded.is_empty() => v,
            _ => bail!(
                "{} returned no vector for the query",
                self.embedder.model_name()
            ),
        };

        let results = self.store.search(&query_vec, k, score_threshold).await?;
        debug!(
            hits = results.len(),
            k,
            score_threshold,
            "retrieved context"
        );
        Ok(results)
    }

    pub async fn len(&self) -> Result<usize> {
        self.store.len().await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        self.store.is_empty().await
    }
}
