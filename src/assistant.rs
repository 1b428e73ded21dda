//! The session facade.
//!
//! [`SessionAssistant`] owns everything a chat session accumulates and is
//! the only type most callers need:
//!
//! ```rust,no_run
//! use docchat::{Config, SessionAssistant};
//!
//! # async fn run() -> Result<(), docchat::AssistantError> {
//! let mut assistant = SessionAssistant::new(Config::default())?;
//! assistant.ingest_path("report.pdf".as_ref()).await?;
//! let reply = assistant.ask("What does the report conclude?").await?;
//! println!("{}", reply);
//! # Ok(())
//! # }
//! ```
//!
//! Ingestion and [`clear`](SessionAssistant::clear) take `&mut self`;
//! [`ask`](SessionAssistant::ask) only reads and may run concurrently.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use docchat_core::embedding::EmbeddingProvider;
use docchat_core::models::DocumentKind;

use crate::answer;
use crate::config::{Config, RetrievalConfig};
use crate::embedding::create_provider;
use crate::error::AssistantError;
use crate::ingest::{IngestOutcome, Ingestor, SessionState};
use crate::llm::{create_chat_model, ChatModel};
use crate::vision::{create_describer, ImageDescriber};

pub struct SessionAssistant {
    ingestor: Ingestor,
    model: Arc<dyn ChatModel>,
    retrieval: RetrievalConfig,
    state: SessionState,
}

impl SessionAssistant {
    /// Validate `config` and build every provider it names.
    pub fn new(config: Config) -> Result<Self, AssistantError> {
        config.validate()?;
        let embedder = create_provider(&config.embedding)
            .map_err(|e| AssistantError::Configuration(format!("{:#}", e)))?;
        let model = create_chat_model(&config.llm)?;
        let describer = create_describer(&config.vision)?;
        info!(
            embedding = embedder.model_name(),
            llm = model.provider(),
            model = model.model_name(),
            vision = config.vision.is_enabled(),
            "assistant ready"
        );
        Self::from_parts(config, embedder, model, describer)
    }

    /// Assemble an assistant from pre-built providers.
    ///
    /// Chunking, retrieval and batching settings still come from `config`
    /// and are checked with [`Config::validate_pipeline`]. Its provider
    /// sections are neither read nor validated.
    pub fn from_parts(
        config: Config,
        embedder: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn ChatModel>,
        describer: Option<Arc<dyn ImageDescriber>>,
    ) -> Result<Self, AssistantError> {
        config.validate_pipeline()?;
        Ok(Self {
            ingestor: Ingestor {
                embedder,
                describer,
                chunking: config.chunking,
                batch_size: config.embedding.batch_size,
            },
            model,
            retrieval: config.retrieval,
            state: SessionState::default(),
        })
    }

    /// Ingest `path` as `kind`.
    ///
    /// On failure the session is reset and the error returned.
    pub async fn ingest_file(
        &mut self,
        path: &Path,
        kind: DocumentKind,
    ) -> Result<IngestOutcome, AssistantError> {
        self.ingestor.ingest(&mut self.state, path, kind).await
    }

    /// Ingest `path`, inferring its kind from the extension.
    ///
    /// Unsupported extensions are rejected without touching session state.
    pub async fn ingest_path(&mut self, path: &Path) -> Result<IngestOutcome, AssistantError> {
        let kind = DocumentKind::from_path(path)
            .ok_or_else(|| AssistantError::UnsupportedType(path.display().to_string()))?;
        self.ingest_file(path, kind).await
    }

    /// Answer `question` from the ingested documents.
    ///
    /// Before anything has been ingested this returns
    /// [`NO_INDEX_MESSAGE`](crate::answer::NO_INDEX_MESSAGE).
    pub async fn ask(&self, question: &str) -> Result<String, AssistantError> {
        answer::answer(
            self.state.index.as_ref(),
            self.model.as_ref(),
            &self.retrieval,
            question,
        )
        .await
    }

    /// Forget every ingested file.
    pub fn clear(&mut self) {
        self.state.reset();
        info!("session cleared");
    }

    /// Number of distinct files ingested this session.
    pub fn ingested_count(&self) -> usize {
        self.state.seen.len()
    }

    pub fn has_index(&self) -> bool {
        self.state.index.is_some()
    }
}
