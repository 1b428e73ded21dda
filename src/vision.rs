//! Multimodal describers that turn an image into searchable text.
//!
//! Vision is off by default (`vision.provider = "disabled"`). When enabled,
//! an image is sent once with a fixed instruction and the model's reply
//! becomes the image's only document.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::{resolve_credential, VisionConfig};
use crate::error::AssistantError;
use crate::extract::EncodedImage;
use crate::http::{http_client, send_json};

/// Instruction sent alongside every image.
pub const DESCRIBE_INSTRUCTION: &str = "Provide a detailed description of the image content.";

const MISSING_OPENAI_KEY: &str =
    "Please supply an API key for OPENAI vision (vision.api_key or vision.api_key_env)";

/// A multimodal model able to describe an image in prose.
#[async_trait]
pub trait ImageDescriber: Send + Sync {
    fn model_name(&self) -> &str;
    async fn describe(&self, image: &EncodedImage, instruction: &str) -> Result<String>;
}

/// Image description via Ollama's `/api/generate` with an `images` array.
pub struct OllamaDescriber {
    model: String,
    url: String,
    client: reqwest::Client,
}

#[async_trait]
impl ImageDescriber for OllamaDescriber {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn describe(&self, image: &EncodedImage, instruction: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "prompt": instruction,
            "images": [image.base64],
            "stream": false,
        });
        debug!(model = %self.model, "describing image with ollama");
        let request = self
            .client
            .post(format!("{}/api/generate", self.url))
            .json(&body);
        let payload = send_json(request, "ollama")
            .await
            .context("ollama image description")?;
        payload["response"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Invalid Ollama response: missing response"))
    }
}

/// Image description via OpenAI chat completions with a data-URL image part.
pub struct OpenAIDescriber {
    model: String,
    url: String,
    api_key: String,
    client: reqwest::Client,
}

#[async_trait]
impl ImageDescriber for OpenAIDescriber {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn describe(&self, image: &EncodedImage, instruction: &str) -> Result<String> {
        let body = openai_vision_body(&self.model, image, instruction);
        debug!(model = %self.model, media_type = image.media_type, "describing image with openai");
        let request = self
            .client
            .post(format!("{}/chat/completions", self.url))
            .bearer_auth(&self.api_key)
            .json(&body);
        let payload = send_json(request, "openai")
            .await
            .context("openai image description")?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Invalid chat response: missing choices[0].message.content"))
    }
}

fn openai_vision_body(model: &str, image: &EncodedImage, instruction: &str) -> Value {
    json!({
        "model": model,
        "messages": [{
            "role": "user",
            "content": [
                {"type": "text", "text": instruction},
                {
                    "type": "image_url",
                    "image_url": {
                        "url": format!("data:{};base64,{}", image.media_type, image.base64)
                    }
                }
            ]
        }],
    })
}

/// Build the describer named by `vision.provider`, or `None` when disabled.
pub fn create_describer(
    config: &VisionConfig,
) -> Result<Option<Arc<dyn ImageDescriber>>, AssistantError> {
    let client = || {
        http_client(config.timeout_secs)
            .map_err(|e| AssistantError::Configuration(format!("{:#}", e)))
    };
    let base_url = |default: &str| {
        config
            .url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    };

    let describer: Arc<dyn ImageDescriber> = match config.provider.as_str() {
        "disabled" => return Ok(None),
        "ollama" => Arc::new(OllamaDescriber {
            model: config.model.clone().unwrap_or_else(|| "llava".to_string()),
            url: base_url("http://localhost:11434"),
            client: client()?,
        }),
        "openai" => {
            let api_key =
                resolve_credential(config.api_key.as_deref(), config.api_key_env.as_deref())
                    .ok_or_else(|| AssistantError::Configuration(MISSING_OPENAI_KEY.to_string()))?;
            Arc::new(OpenAIDescriber {
                model: config
                    .model
                    .clone()
                    .unwrap_or_else(|| "gpt-4o-mini".to_string()),
                url: base_url("https://api.openai.com/v1"),
                api_key,
                client: client()?,
            })
        }
        other => {
            return Err(AssistantError::Configuration(format!(
                "Unknown vision provider: '{}'",
                other
            )))
        }
    };
    Ok(Some(describer))
}
