//! Core data models used throughout docchat.
//!
//! These types represent the documents, chunks, and retrieval results that
//! flow through the ingestion and answering pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde_json::Value;

/// Metadata attached to documents and chunks.
///
/// Keys are strings; values are JSON. Only scalar values survive
/// [`filter_complex_metadata`] before chunks reach the vector store.
pub type Metadata = BTreeMap<String, Value>;

/// The kind of file a [`Document`] was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Pdf,
    Image,
}

impl DocumentKind {
    /// Detect the kind from a file extension (`pdf`, `png`, `jpg`, `jpeg`).
    ///
    /// Matching is case-insensitive. Returns `None` for anything else.
    ///
    /// ```rust
    /// use docchat_core::models::DocumentKind;
    ///
    /// assert_eq!(DocumentKind::from_path("report.PDF"), Some(DocumentKind::Pdf));
    /// assert_eq!(DocumentKind::from_path("notes.txt"), None);
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "png" | "jpg" | "jpeg" => Some(DocumentKind::Image),
            _ => None,
        }
    }

    /// Detect the kind from a MIME type as reported by an upload widget.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "application/pdf" => Some(DocumentKind::Pdf),
            "image/jpeg" | "image/jpg" | "image/png" => Some(DocumentKind::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Image => "image",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of extracted content: one PDF page or one image description.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub metadata: Metadata,
    pub source_path: String,
    pub kind: DocumentKind,
}

/// A bounded window of a [`Document`]'s content; the unit of embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: String,
    /// Source path of the parent document.
    pub source: String,
    pub chunk_index: i64,
    pub text: String,
    /// SHA-256 of `text`.
    pub hash: String,
    pub metadata: Metadata,
}

/// A chunk returned from similarity search, with its cosine score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Returns `true` for metadata values the vector store can persist.
fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// Drop every metadata value that is not a flat scalar.
///
/// Arrays, objects and `null` are removed; strings, numbers and booleans
/// are kept unchanged. The filter is lossy but deterministic.
pub fn filter_complex_metadata(chunks: &mut [Chunk]) {
    for chunk in chunks.iter_mut() {
        chunk.metadata.retain(|_, v| is_scalar(v));
    }
}
