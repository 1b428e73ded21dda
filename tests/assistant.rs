//! End-to-end tests for `SessionAssistant` with in-process providers.
//!
//! The embedder is a hashed bag of words, so retrieval scores are plain
//! word-overlap cosines; the chat model echoes the context it was given.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tempfile::TempDir;

use docchat::answer::NO_INDEX_MESSAGE;
use docchat::docchat_core::embedding::EmbeddingProvider;
use docchat::extract::EncodedImage;
use docchat::llm::ChatModel;
use docchat::vision::ImageDescriber;
use docchat::{AssistantError, Config, DocumentKind, IngestOutcome, SessionAssistant};

const DIMS: usize = 4096;

struct BagOfWords {
    fail: AtomicBool,
}

impl BagOfWords {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            fail: AtomicBool::new(false),
        })
    }
}

fn bucket(word: &str) -> usize {
    // FNV-1a
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in word.bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash % DIMS as u64) as usize
}

#[async_trait]
impl EmbeddingProvider for BagOfWords {
    fn model_name(&self) -> &str {
        "bag-of-words"
    }
    fn dims(&self) -> usize {
        DIMS
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("embedding service unavailable");
        }
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0f32; DIMS];
                for word in t
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| !w.is_empty())
                {
                    v[bucket(&word.to_lowercase())] += 1.0;
                }
                v
            })
            .collect())
    }
}

/// Returns the context section of the prompt and records every prompt.
#[derive(Default)]
struct EchoModel {
    prompts: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl EchoModel {
    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
    fn last_prompt(&self) -> String {
        self.prompts
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for EchoModel {
    fn provider(&self) -> &str {
        "echo"
    }
    fn model_name(&self) -> &str {
        "echo-1"
    }
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail.load(Ordering::SeqCst) {
            bail!("rate limited");
        }
        let context = prompt
            .split("Context: ")
            .nth(1)
            .and_then(|rest| rest.split("\nAnswer:").next())
            .unwrap_or_default();
        Ok(format!("Based on the documents: {}", context.trim()))
    }
}

struct FixedDescriber(&'static str);

#[async_trait]
impl ImageDescriber for FixedDescriber {
    fn model_name(&self) -> &str {
        "fixed"
    }
    async fn describe(&self, _image: &EncodedImage, _instruction: &str) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// Single-page PDF showing `phrase` in Helvetica.
fn minimal_pdf(phrase: &str) -> Vec<u8> {
    pdf_with_content(&format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase))
}

/// Single-page PDF whose page draws `content`, with a correct xref table
/// so pdf-extract can parse it.
fn pdf_with_content(content: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(
        b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
          /Resources << /Font << /F1 5 0 R >> >> >> endobj\n",
    );
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            content.len(),
            content
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

struct Harness {
    _tmp: TempDir,
    dir: PathBuf,
    embedder: Arc<BagOfWords>,
    model: Arc<EchoModel>,
    assistant: SessionAssistant,
}

impl Harness {
    fn new() -> Self {
        Self::with_describer(None)
    }

    fn with_describer(describer: Option<Arc<dyn ImageDescriber>>) -> Self {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_path_buf();
        let embedder = BagOfWords::new();
        let model = Arc::new(EchoModel::default());
        let assistant = SessionAssistant::from_parts(
            Config::default(),
            embedder.clone(),
            model.clone(),
            describer,
        )
        .unwrap();
        Self {
            _tmp: tmp,
            dir,
            embedder,
            model,
            assistant,
        }
    }

    fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    async fn ingest(&mut self, path: &Path) -> Result<IngestOutcome, AssistantError> {
        self.assistant.ingest_path(path).await
    }
}

#[tokio::test]
async fn ask_before_ingest_returns_guidance_without_calling_model() {
    let h = Harness::new();
    let reply = h.assistant.ask("What color is the sky?").await.unwrap();
    assert_eq!(reply, "Please ingest a PDF or image file first.");
    assert_eq!(reply, NO_INDEX_MESSAGE);
    assert_eq!(h.model.calls(), 0);
    assert!(!h.assistant.has_index());
}

#[tokio::test]
async fn sky_is_blue_end_to_end() {
    let mut h = Harness::new();
    let pdf = h.write("sky.pdf", &minimal_pdf("The sky is blue."));

    let outcome = h.ingest(&pdf).await.unwrap();
    assert!(matches!(outcome, IngestOutcome::Ingested { chunks } if chunks >= 1));
    assert!(h.assistant.has_index());

    let reply = h.assistant.ask("What color is the sky?").await.unwrap();
    assert!(reply.contains("blue"), "reply was: {}", reply);
    let prompt = h.model.last_prompt();
    assert!(prompt.contains("Question: What color is the sky?"));
}

#[tokio::test]
async fn identical_content_is_ingested_once() {
    let mut h = Harness::new();
    let bytes = minimal_pdf("The sky is blue.");
    let first = h.write("a.pdf", &bytes);
    let renamed = h.write("copy of a.pdf", &bytes);

    assert!(matches!(
        h.ingest(&first).await.unwrap(),
        IngestOutcome::Ingested { .. }
    ));
    assert_eq!(
        h.ingest(&first).await.unwrap(),
        IngestOutcome::AlreadyIngested
    );
    assert_eq!(
        h.ingest(&renamed).await.unwrap(),
        IngestOutcome::AlreadyIngested
    );
    assert_eq!(h.assistant.ingested_count(), 1);

    // A single copy of the passage reaches the prompt.
    h.assistant.ask("What color is the sky?").await.unwrap();
    assert_eq!(h.model.last_prompt().matches("blue").count(), 1);
}

#[tokio::test]
async fn failed_ingestion_resets_session() {
    let mut h = Harness::new();
    let good = h.write("sky.pdf", &minimal_pdf("The sky is blue."));
    let broken = h.write("broken.pdf", b"this is not a pdf at all");

    h.ingest(&good).await.unwrap();
    assert!(h.assistant.has_index());

    let err = h.ingest(&broken).await.unwrap_err();
    assert!(
        matches!(err, AssistantError::Extraction { .. }),
        "{:?}",
        err
    );
    assert!(!h.assistant.has_index());
    assert_eq!(h.assistant.ingested_count(), 0);
    assert_eq!(
        h.assistant.ask("What color is the sky?").await.unwrap(),
        NO_INDEX_MESSAGE
    );

    // The earlier file is new again after the reset.
    assert!(matches!(
        h.ingest(&good).await.unwrap(),
        IngestOutcome::Ingested { .. }
    ));
}

#[tokio::test]
async fn pdf_without_text_is_recorded_but_not_indexed() {
    let mut h = Harness::new();
    let blank = h.write("blank.pdf", &pdf_with_content(""));

    assert_eq!(
        h.ingest(&blank).await.unwrap(),
        IngestOutcome::Ingested { chunks: 0 }
    );
    assert!(!h.assistant.has_index());
    assert_eq!(h.assistant.ingested_count(), 1);
    assert_eq!(
        h.assistant.ask("What is in the scan?").await.unwrap(),
        NO_INDEX_MESSAGE
    );
    assert_eq!(h.model.calls(), 0);

    assert_eq!(
        h.ingest(&blank).await.unwrap(),
        IngestOutcome::AlreadyIngested
    );
}

#[tokio::test]
async fn embedding_failure_is_provider_error_and_resets() {
    let mut h = Harness::new();
    let first = h.write("one.pdf", &minimal_pdf("The sky is blue."));
    let second = h.write("two.pdf", &minimal_pdf("Grass is green."));
    h.ingest(&first).await.unwrap();

    h.embedder.fail.store(true, Ordering::SeqCst);
    let err = h.ingest(&second).await.unwrap_err();
    assert!(matches!(err, AssistantError::Provider { .. }), "{:?}", err);
    assert!(err.to_string().contains("embedding service unavailable"));
    assert!(!h.assistant.has_index());
    assert_eq!(h.assistant.ingested_count(), 0);
}

#[tokio::test]
async fn unsupported_type_leaves_session_intact() {
    let mut h = Harness::new();
    let pdf = h.write("sky.pdf", &minimal_pdf("The sky is blue."));
    let notes = h.write("notes.txt", b"The sky is blue.");
    h.ingest(&pdf).await.unwrap();

    let err = h.ingest(&notes).await.unwrap_err();
    assert!(matches!(err, AssistantError::UnsupportedType(_)));
    assert!(!err.resets_session());
    assert!(h.assistant.has_index());
    assert_eq!(h.assistant.ingested_count(), 1);
}

#[tokio::test]
async fn unrelated_question_gets_empty_context() {
    let mut h = Harness::new();
    let pdf = h.write("sky.pdf", &minimal_pdf("The sky is blue."));
    h.ingest(&pdf).await.unwrap();

    let reply = h.assistant.ask("Where do penguins nest?").await.unwrap();
    assert_eq!(reply, "Based on the documents: ");
    assert!(h.model.last_prompt().contains("Context: \nAnswer:"));
}

#[tokio::test]
async fn chat_failure_keeps_session() {
    let mut h = Harness::new();
    let pdf = h.write("sky.pdf", &minimal_pdf("The sky is blue."));
    h.ingest(&pdf).await.unwrap();

    h.model.fail.store(true, Ordering::SeqCst);
    let err = h.assistant.ask("What color is the sky?").await.unwrap_err();
    assert!(matches!(err, AssistantError::Provider { ref provider, .. } if provider == "echo"));
    assert!(h.assistant.has_index());
    assert_eq!(h.assistant.ingested_count(), 1);
}

#[tokio::test]
async fn clear_forgets_everything() {
    let mut h = Harness::new();
    let pdf = h.write("sky.pdf", &minimal_pdf("The sky is blue."));
    h.ingest(&pdf).await.unwrap();

    h.assistant.clear();
    assert!(!h.assistant.has_index());
    assert_eq!(h.assistant.ingested_count(), 0);
    assert_eq!(
        h.assistant.ask("Anything?").await.unwrap(),
        NO_INDEX_MESSAGE
    );

    assert!(matches!(
        h.ingest(&pdf).await.unwrap(),
        IngestOutcome::Ingested { .. }
    ));
}

#[tokio::test]
async fn described_image_is_searchable() {
    let mut h = Harness::with_describer(Some(Arc::new(FixedDescriber(
        "The bicycle in the photo is red.",
    ))));
    let photo = h.write("photo.jpg", &[0xff, 0xd8, 0xff, 0xe0, 0, 0x10]);

    assert_eq!(
        h.assistant
            .ingest_file(&photo, DocumentKind::Image)
            .await
            .unwrap(),
        IngestOutcome::Ingested { chunks: 1 }
    );
    let reply = h.assistant.ask("What color is the bicycle?").await.unwrap();
    assert!(
        reply.contains("bicycle in the photo is red"),
        "reply was: {}",
        reply
    );
}

#[tokio::test]
async fn image_without_vision_model_fails_and_resets() {
    let mut h = Harness::new();
    let pdf = h.write("sky.pdf", &minimal_pdf("The sky is blue."));
    let photo = h.write("photo.png", &[0x89, b'P', b'N', b'G']);
    h.ingest(&pdf).await.unwrap();

    let err = h.ingest(&photo).await.unwrap_err();
    assert!(matches!(err, AssistantError::Extraction { .. }));
    assert!(!h.assistant.has_index());
}

#[tokio::test]
async fn missing_file_is_io_error() {
    let mut h = Harness::new();
    let missing = h.dir.join("gone.pdf");
    let err = h.ingest(&missing).await.unwrap_err();
    assert!(matches!(err, AssistantError::Io { .. }));
}

#[test]
fn hosted_llm_without_key_is_configuration_error() {
    let mut config = Config::default();
    config.embedding.provider = "ollama".to_string();
    config.embedding.model = Some("nomic-embed-text".to_string());
    config.llm.provider = "openai".to_string();
    config.llm.api_key_env = Some("DOCCHAT_TEST_DEFINITELY_UNSET".to_string());

    let err = SessionAssistant::new(config).err().unwrap();
    assert!(
        matches!(err, AssistantError::Configuration(_)),
        "{:?}",
        err
    );
}

#[test]
fn invalid_chunking_is_rejected_by_from_parts() {
    let mut config = Config::default();
    config.chunking.overlap = config.chunking.size;
    let err = SessionAssistant::from_parts(
        config,
        BagOfWords::new(),
        Arc::new(EchoModel::default()),
        None,
    )
    .err()
    .unwrap();
    assert!(matches!(err, AssistantError::Configuration(_)));
}

#[test]
fn from_parts_ignores_provider_sections() {
    let mut config = Config::default();
    config.embedding.provider = "openai".to_string();
    config.embedding.model = None;
    config.vision.provider = "mystery".to_string();
    let assistant = SessionAssistant::from_parts(
        config,
        BagOfWords::new(),
        Arc::new(EchoModel::default()),
        None,
    )
    .unwrap();
    assert!(!assistant.has_index());
}
