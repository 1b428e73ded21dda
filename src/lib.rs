//! # docchat
//!
//! Chat with your PDFs and images. Files are ingested into a session-scoped
//! in-memory vector index; questions are answered by a language model that
//! sees the most relevant passages.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ PDF/Image  │──▶│ Extract+Chunk│──▶│ VectorIndex  │
//! │   files    │   │   +Embed     │   │ (in memory)  │
//! └────────────┘   └──────────────┘   └──────┬───────┘
//!                                            │ top-k ≥ threshold
//!                                            ▼
//!                  ┌──────────────┐   ┌──────────────┐
//!                  │  ChatModel   │◀──│    Prompt    │
//!                  └──────────────┘   └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`assistant`] | Session facade: ingest, ask, clear |
//! | [`ingest`] | Fingerprint, extract, chunk, embed, with reset on failure |
//! | [`answer`] | Retrieval and prompt composition |
//! | [`index`] | Embedding-backed vector index |
//! | [`extract`] | PDF page text and image encoding |
//! | [`fingerprint`] | Streaming SHA-256 content fingerprints |
//! | [`embedding`] | fastembed, OpenAI, and Ollama embedding providers |
//! | [`llm`] | OpenAI, Groq, Gemini, and Ollama chat models |
//! | [`vision`] | Optional image describers |
//! | [`config`] | TOML configuration |
//! | [`error`] | Public error type |
//!
//! Runtime-independent pieces (models, chunker, vector store) live in the
//! `docchat-core` crate, re-exported as [`docchat_core`].

pub mod answer;
pub mod assistant;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod fingerprint;
mod http;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod vision;

pub use docchat_core;

pub use assistant::SessionAssistant;
pub use config::{load_config, Config};
pub use docchat_core::models::DocumentKind;
pub use error::AssistantError;
pub use ingest::IngestOutcome;
