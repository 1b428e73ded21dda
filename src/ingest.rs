//! Ingestion pipeline.
//!
//! Flow for one file: fingerprint → dedup check → extract (PDF pages or an
//! image description) → chunk → strip non-scalar metadata → embed and
//! append to the index → record the fingerprint.
//!
//! Any failure once the file kind is known resets the whole session
//! (index and fingerprint set) before the error is returned, so a half
//! ingested file can never answer questions.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info};

use docchat_core::chunk::chunk_documents;
use docchat_core::embedding::EmbeddingProvider;
use docchat_core::models::{filter_complex_metadata, Document, DocumentKind};

use crate::config::ChunkingConfig;
use crate::error::AssistantError;
use crate::extract::{encode_image, extract_pdf, image_document, ExtractError};
use crate::fingerprint::{fingerprint, Fingerprint};
use crate::index::VectorIndex;
use crate::vision::{ImageDescriber, DESCRIBE_INSTRUCTION};

/// Result of a successful ingestion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The file was new; `chunks` entries were added (possibly zero).
    Ingested { chunks: usize },
    /// A file with identical content was already ingested this session.
    AlreadyIngested,
}

/// Mutable per-session state: the index (absent until the first non-empty
/// add) and the fingerprints of every file ingested so far.
#[derive(Default)]
pub(crate) struct SessionState {
    pub(crate) index: Option<VectorIndex>,
    pub(crate) seen: HashSet<Fingerprint>,
}

impl SessionState {
    pub(crate) fn reset(&mut self) {
        self.index = None;
        self.seen.clear();
    }
}

/// The stateless half of ingestion: providers and chunking parameters.
pub(crate) struct Ingestor {
    pub(crate) embedder: Arc<dyn EmbeddingProvider>,
    pub(crate) describer: Option<Arc<dyn ImageDescriber>>,
    pub(crate) chunking: ChunkingConfig,
    pub(crate) batch_size: usize,
}

impl Ingestor {
    pub(crate) async fn ingest(
        &self,
        state: &mut SessionState,
        path: &Path,
        kind: DocumentKind,
    ) -> Result<IngestOutcome, AssistantError> {
        match self.try_ingest(state, path, kind).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if e.resets_session() {
                    error!(path = %path.display(), error = %e, "ingestion failed; session reset");
                    state.reset();
                }
                Err(e)
            }
        }
    }

    async fn try_ingest(
        &self,
        state: &mut SessionState,
        path: &Path,
        kind: DocumentKind,
    ) -> Result<IngestOutcome, AssistantError> {
        let fp = fingerprint(path)?;
        if state.seen.contains(&fp) {
            info!(path = %path.display(), %kind, "already ingested, skipping");
            return Ok(IngestOutcome::AlreadyIngested);
        }

        let docs = match kind {
            DocumentKind::Pdf => load_pdf(path).await?,
            DocumentKind::Image => vec![self.describe_image(path).await?],
        };
        debug!(path = %path.display(), documents = docs.len(), "extracted");

        let mut chunks = chunk_documents(&docs, self.chunking.size, self.chunking.overlap);
        filter_complex_metadata(&mut chunks);

        if !chunks.is_empty() {
            let index = state
                .index
                .get_or_insert_with(|| VectorIndex::new(self.embedder.clone(), self.batch_size));
            index
                .add(&chunks)
                .await
                .map_err(|e| AssistantError::provider("embedding", e))?;
        }

        state.seen.insert(fp);
        info!(path = %path.display(), %kind, chunks = chunks.len(), "ingested file");
        Ok(IngestOutcome::Ingested {
            chunks: chunks.len(),
        })
    }

    async fn describe_image(&self, path: &Path) -> Result<Document, AssistantError> {
        let describer = self.describer.as_ref().ok_or_else(|| {
            AssistantError::extraction(path, "no vision model is configured for images")
        })?;
        let image = encode_image(path).map_err(|e| extract_error(path, e))?;
        let description = describer
            .describe(&image, DESCRIBE_INSTRUCTION)
            .await
            .map_err(|e| AssistantError::provider(describer.model_name(), e))?;
        Ok(image_document(path, description))
    }
}

/// PDF parsing is CPU-bound, so it runs off the async worker threads.
async fn load_pdf(path: &Path) -> Result<Vec<Document>, AssistantError> {
    let owned: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_pdf(&owned))
        .await
        .map_err(|e| AssistantError::extraction(path, format!("extraction task failed: {}", e)))?
        .map_err(|e| extract_error(path, e))
}

fn extract_error(path: &Path, err: ExtractError) -> AssistantError {
    match err {
        ExtractError::Io(source) => AssistantError::io(path, source),
        other => AssistantError::extraction(path, other.to_string()),
    }
}
