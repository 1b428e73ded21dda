//! Error types surfaced by the assistant.
//!
//! Provider and store internals return `anyhow::Result`; the facade folds
//! those into [`AssistantError`] so callers can tell a bad file from a bad
//! configuration from a failing model provider.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors returned by [`SessionAssistant`](crate::assistant::SessionAssistant).
#[derive(Debug, Error)]
pub enum AssistantError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document or image could not be parsed or described.
    #[error("could not extract content from {}: {message}", path.display())]
    Extraction { path: PathBuf, message: String },

    /// Invalid configuration, such as a missing provider credential.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An embedding, chat, or vision provider call failed.
    #[error("{provider} request failed: {message}")]
    Provider { provider: String, message: String },

    /// The file is neither a PDF nor a supported image.
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
}

impl AssistantError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        AssistantError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn extraction(path: &Path, message: impl Into<String>) -> Self {
        AssistantError::Extraction {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Wrap an `anyhow` error from a provider, keeping the whole context chain.
    pub(crate) fn provider(provider: &str, err: anyhow::Error) -> Self {
        AssistantError::Provider {
            provider: provider.to_string(),
            message: format!("{:#}", err),
        }
    }

    /// Whether this failure discards the session's ingested state.
    ///
    /// Only `UnsupportedType` is detected before any state is touched.
    pub fn resets_session(&self) -> bool {
        !matches!(
            self,
            AssistantError::UnsupportedType(_) | AssistantError::Configuration(_)
        )
    }
}
