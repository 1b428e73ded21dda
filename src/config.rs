//! TOML configuration parsing and validation.
//!
//! Every section is optional; [`Config::default`] describes a fully local
//! setup (fastembed embeddings, Ollama chat, no vision model).
//!
//! ```toml
//! [chunking]
//! size = 1024
//! overlap = 100
//!
//! [retrieval]
//! k = 6
//! score_threshold = 0.3
//!
//! [embedding]
//! provider = "local"            # local | openai | ollama
//! model = "bge-small-en-v1.5"
//!
//! [llm]
//! provider = "openai"           # openai | groq | gemini | ollama
//! model = "gpt-4o-mini"
//! api_key_env = "OPENAI_API_KEY"
//!
//! [vision]
//! provider = "ollama"           # disabled | ollama | openai
//! model = "llava"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use docchat_core::chunk::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

use crate::error::AssistantError;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub vision: VisionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            score_threshold: default_score_threshold(),
        }
    }
}

fn default_k() -> usize {
    6
}
fn default_score_threshold() -> f32 {
    0.3
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            api_key: None,
            api_key_env: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: None,
            url: None,
            api_key: None,
            api_key_env: None,
            temperature: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_llm_provider() -> String {
    "ollama".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct VisionConfig {
    #[serde(default = "default_vision_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            provider: default_vision_provider(),
            model: None,
            url: None,
            api_key: None,
            api_key_env: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_vision_provider() -> String {
    "disabled".to_string()
}

impl VisionConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

/// Chat providers that cannot be reached without an API key.
pub const CREDENTIAL_PROVIDERS: &[&str] = &["openai", "groq", "gemini"];

/// Resolve a credential: an inline key wins, then the named environment
/// variable. Blank values count as missing.
pub fn resolve_credential(api_key: Option<&str>, api_key_env: Option<&str>) -> Option<String> {
    if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
        return Some(key.to_string());
    }
    api_key_env
        .and_then(|var| std::env::var(var).ok())
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

impl Config {
    /// Check [`validate_pipeline`](Self::validate_pipeline) ranges and
    /// provider names.
    ///
    /// Credentials are checked later, when providers are constructed,
    /// because they may come from the environment.
    pub fn validate(&self) -> Result<(), AssistantError> {
        self.validate_pipeline()?;
        let bad = |msg: String| Err(AssistantError::Configuration(msg));

        match self.embedding.provider.as_str() {
            "local" | "openai" | "ollama" => {}
            other => {
                return bad(format!(
                    "Unknown embedding provider: '{}'. Must be local, openai, or ollama.",
                    other
                ))
            }
        }
        if self.embedding.provider != "local" && self.embedding.model.is_none() {
            return bad(format!(
                "embedding.model must be specified when provider is '{}'",
                self.embedding.provider
            ));
        }

        match self.llm.provider.as_str() {
            "openai" | "groq" | "groq3" | "gemini" | "ollama" => {}
            other => {
                return bad(format!(
                    "Unknown llm provider: '{}'. Must be openai, groq, gemini, or ollama.",
                    other
                ))
            }
        }

        match self.vision.provider.as_str() {
            "disabled" | "ollama" | "openai" => {}
            other => {
                return bad(format!(
                    "Unknown vision provider: '{}'. Must be disabled, ollama, or openai.",
                    other
                ))
            }
        }

        Ok(())
    }

    /// Check only the chunking, retrieval and batching ranges, which every
    /// session uses whatever its providers are.
    pub fn validate_pipeline(&self) -> Result<(), AssistantError> {
        let bad = |msg: String| Err(AssistantError::Configuration(msg));

        if self.chunking.size == 0 {
            return bad("chunking.size must be > 0".into());
        }
        if self.chunking.overlap >= self.chunking.size {
            return bad(format!(
                "chunking.overlap ({}) must be smaller than chunking.size ({})",
                self.chunking.overlap, self.chunking.size
            ));
        }
        if self.retrieval.k < 1 {
            return bad("retrieval.k must be >= 1".into());
        }
        if !(0.0..=1.0).contains(&self.retrieval.score_threshold) {
            return bad("retrieval.score_threshold must be in [0.0, 1.0]".into());
        }
        if self.embedding.batch_size == 0 {
            return bad("embedding.batch_size must be > 0".into());
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}
