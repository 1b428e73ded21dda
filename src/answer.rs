//! Retrieval-augmented answering.
//!
//! A question is embedded, the best-matching chunks above the score
//! threshold are pulled from the [`VectorIndex`], and the language model is
//! called once with a prompt that carries both.

use tracing::{debug, info};

use docchat_core::models::ScoredChunk;

use crate::config::RetrievalConfig;
use crate::error::AssistantError;
use crate::index::VectorIndex;
use crate::llm::ChatModel;

/// Returned by `ask` while nothing has been ingested.
pub const NO_INDEX_MESSAGE: &str = "Please ingest a PDF or image file first.";

const PROMPT_PREAMBLE: &str = "\
You are an assistant for question-answering tasks.
Use the following pieces of retrieved context to answer the question.
If the context is empty or does not contain the answer, state that the information \
is not available in the provided documents.
Only when the context is empty may you add a brief, high-level summary from general \
knowledge; otherwise answer from the context alone.
Answer in four to six sentences and keep the answer concise.";

/// Build the prompt for `question` from the retrieved chunks.
///
/// Chunk texts are joined by blank lines in retrieval order.
pub fn compose_prompt(question: &str, context: &[ScoredChunk]) -> String {
    let context = context
        .iter()
        .map(|c| c.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "{}\nQuestion: {}\nContext: {}\nAnswer:",
        PROMPT_PREAMBLE, question, context
    )
}

/// Answer `question` against `index`, or return [`NO_INDEX_MESSAGE`] when
/// there is no index yet.
pub async fn answer(
    index: Option<&VectorIndex>,
    model: &dyn ChatModel,
    retrieval: &RetrievalConfig,
    question: &str,
) -> Result<String, AssistantError> {
    let Some(index) = index else {
        debug!("question asked before any ingestion");
        return Ok(NO_INDEX_MESSAGE.to_string());
    };

    let context = index
        .query(question, retrieval.k, retrieval.score_threshold)
        .await
        .map_err(|e| AssistantError::provider("embedding", e))?;
    info!(
        retrieved = context.len(),
        provider = model.provider(),
        model = model.model_name(),
        "answering question"
    );

    let prompt = compose_prompt(question, &context);
    model
        .generate(&prompt)
        .await
        .map_err(|e| AssistantError::provider(model.provider(), e))
}
