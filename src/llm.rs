//! Language-model providers.
//!
//! The [`ChatModel`] trait turns a fully composed prompt into generated
//! text with a single request. Backends:
//!
//! | `llm.provider` | Backend | Credential |
//! |----------------|---------|------------|
//! | `openai` | OpenAI `/v1/chat/completions` | required |
//! | `groq` (alias `groq3`) | Groq's OpenAI-compatible endpoint | required |
//! | `gemini` | Gemini `generateContent` | required |
//! | `ollama` | Ollama `/api/chat` | none |
//!
//! Calls are never retried here; the caller decides whether to ask again.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::{resolve_credential, LlmConfig, CREDENTIAL_PROVIDERS};
use crate::error::AssistantError;
use crate::http::{http_client, send_json};

const OPENAI_DEFAULT_URL: &str = "https://api.openai.com/v1";
const GROQ_DEFAULT_URL: &str = "https://api.groq.com/openai/v1";
const GROQ_DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
const GEMINI_DEFAULT_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// A language model that answers a single prompt.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Provider identifier, e.g. `"openai"`.
    fn provider(&self) -> &str;
    fn model_name(&self) -> &str;
    /// Generate a completion for `prompt` and return its text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

// ============ OpenAI-compatible (OpenAI, Groq) ============

/// Chat completions against OpenAI or any server speaking its API.
pub struct OpenAIChat {
    provider: String,
    model: String,
    url: String,
    api_key: String,
    temperature: Option<f32>,
    client: reqwest::Client,
}

impl OpenAIChat {
    fn new(
        provider: &str,
        default_url: &str,
        default_model: &str,
        config: &LlmConfig,
        api_key: String,
    ) -> Result<Self> {
        Ok(Self {
            provider: provider.to_string(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| default_model.to_string()),
            url: config
                .url
                .as_deref()
                .unwrap_or(default_url)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            temperature: config.temperature,
            client: http_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAIChat {
    fn provider(&self) -> &str {
        &self.provider
    }
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": false,
        });
        if let (Some(t), Some(obj)) = (self.temperature, body.as_object_mut()) {
            obj.insert("temperature".to_string(), json!(t));
        }

        debug!(provider = %self.provider, model = %self.model, "sending chat completion");
        let request = self
            .client
            .post(format!("{}/chat/completions", self.url))
            .bearer_auth(&self.api_key)
            .json(&body);
        let payload = send_json(request, &self.provider)
            .await
            .context("chat completion")?;
        parse_openai_chat(&payload)
    }
}

fn parse_openai_chat(payload: &Value) -> Result<String> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid chat response: missing choices[0].message.content"))
}

// ============ Gemini ============

/// Text generation with Google's Gemini API.
pub struct GeminiChat {
    model: String,
    url: String,
    api_key: String,
    temperature: Option<f32>,
    client: reqwest::Client,
}

impl GeminiChat {
    fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "gemini-1.5-flash".to_string()),
            url: config
                .url
                .as_deref()
                .unwrap_or(GEMINI_DEFAULT_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            temperature: config.temperature,
            client: http_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl ChatModel for GeminiChat {
    fn provider(&self) -> &str {
        "gemini"
    }
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut body = json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
        });
        if let (Some(t), Some(obj)) = (self.temperature, body.as_object_mut()) {
            obj.insert("generationConfig".to_string(), json!({"temperature": t}));
        }

        debug!(model = %self.model, "sending gemini generateContent");
        let endpoint = format!("{}/models/{}:generateContent", self.url, self.model);
        let request = self
            .client
            .post(endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        let payload = send_json(request, "gemini")
            .await
            .context("generateContent")?;
        parse_gemini(&payload)
    }
}

fn parse_gemini(payload: &Value) -> Result<String> {
    let parts = payload["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| anyhow!("Invalid Gemini response: missing candidates[0].content.parts"))?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    Ok(text)
}

// ============ Ollama ============

/// Chat with a model served by a local Ollama instance.
pub struct OllamaChat {
    model: String,
    url: String,
    temperature: Option<f32>,
    client: reqwest::Client,
}

impl OllamaChat {
    fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "qwen3:1.7b".to_string()),
            url: config
                .url
                .as_deref()
                .unwrap_or(OLLAMA_DEFAULT_URL)
                .trim_end_matches('/')
                .to_string(),
            temperature: config.temperature,
            client: http_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    fn provider(&self) -> &str {
        "ollama"
    }
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": false,
        });
        if let (Some(t), Some(obj)) = (self.temperature, body.as_object_mut()) {
            obj.insert("options".to_string(), json!({"temperature": t}));
        }

        debug!(model = %self.model, "sending ollama chat");
        let request = self
            .client
            .post(format!("{}/api/chat", self.url))
            .json(&body);
        let payload = send_json(request, "ollama")
            .await
            .with_context(|| format!("ollama chat (is Ollama running at {}?)", self.url))?;
        parse_ollama_chat(&payload)
    }
}

fn parse_ollama_chat(payload: &Value) -> Result<String> {
    payload["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing message.content"))
}

/// Build the [`ChatModel`] named by `llm.provider`.
///
/// Providers listed in [`CREDENTIAL_PROVIDERS`] fail with
/// [`AssistantError::Configuration`] when no credential can be resolved.
pub fn create_chat_model(config: &LlmConfig) -> Result<Arc<dyn ChatModel>, AssistantError> {
    let provider = match config.provider.as_str() {
        "groq3" => "groq",
        other => other,
    };

    let api_key = if CREDENTIAL_PROVIDERS.contains(&provider) {
        Some(
            resolve_credential(config.api_key.as_deref(), config.api_key_env.as_deref()).ok_or_else(
                || {
                    AssistantError::Configuration(format!(
                        "Please supply an API key for {} (llm.api_key or llm.api_key_env)",
                        provider.to_uppercase()
                    ))
                },
            )?,
        )
    } else {
        None
    };

    let built: Result<Arc<dyn ChatModel>> = match (provider, api_key) {
        ("openai", Some(key)) => {
            OpenAIChat::new("openai", OPENAI_DEFAULT_URL, "gpt-4o-mini", config, key)
                .map(|m| Arc::new(m) as Arc<dyn ChatModel>)
        }
        ("groq", Some(key)) => {
            OpenAIChat::new("groq", GROQ_DEFAULT_URL, GROQ_DEFAULT_MODEL, config, key)
                .map(|m| Arc::new(m) as Arc<dyn ChatModel>)
        }
        ("gemini", Some(key)) => {
            GeminiChat::new(config, key).map(|m| Arc::new(m) as Arc<dyn ChatModel>)
        }
        ("ollama", _) => OllamaChat::new(config).map(|m| Arc::new(m) as Arc<dyn ChatModel>),
        (other, _) => {
            return Err(AssistantError::Configuration(format!(
                "Unknown llm provider: '{}'",
                other
            )))
        }
    };

    built.map_err(|e| AssistantError::Configuration(format!("{:#}", e)))
}
