//! Overlapping fixed-window text chunker.
//!
//! Splits a [`Document`]'s content into [`Chunk`]s of at most `chunk_size`
//! characters, where each chunk starts `chunk_size - overlap` characters
//! after the previous one. Consecutive chunks therefore share exactly
//! `overlap` characters at their boundary, so a sentence that straddles a
//! boundary still appears whole in at least one chunk as long as it is no
//! longer than the overlap.
//!
//! Sizes are counted in `char`s (Unicode scalar values), so a window never
//! cuts through a multi-byte UTF-8 sequence.
//!
//! Each chunk receives a random UUID, a contiguous index, a copy of the
//! parent document's metadata, and a SHA-256 hash of its text.
//!
//! # Example
//!
//! ```rust
//! use docchat_core::chunk::chunk_document;
//! use docchat_core::models::{Document, DocumentKind, Metadata};
//!
//! let doc = Document {
//!     content: "abcdefghij".to_string(),
//!     metadata: Metadata::new(),
//!     source_path: "a.pdf".to_string(),
//!     kind: DocumentKind::Pdf,
//! };
//! let chunks = chunk_document(&doc, 4, 1);
//! let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
//! assert_eq!(texts, vec!["abcd", "defg", "ghij"]);
//! ```

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{Chunk, Document};

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;
/// Default overlap between consecutive windows, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Split one document into overlapping windows.
///
/// Returns no chunks when the content is empty or whitespace-only.
/// `overlap` must be smaller than `chunk_size`; if it is not, windows are
/// laid end to end with no overlap.
pub fn chunk_document(doc: &Document, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    if doc.content.trim().is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let text = doc.content.as_str();
    let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let total = offsets.len();
    offsets.push(text.len());

    let step = if overlap < chunk_size {
        chunk_size - overlap
    } else {
        chunk_size
    };

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut chunk_index: i64 = 0;

    loop {
        let end = (start + chunk_size).min(total);
        let piece = &text[offsets[start]..offsets[end]];
        chunks.push(make_chunk(doc, chunk_index, piece));
        chunk_index += 1;

        if end == total {
            break;
        }
        start += step;
    }

    chunks
}

/// Chunk a batch of documents, concatenating the results in order.
pub fn chunk_documents(docs: &[Document], chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    docs.iter()
        .flat_map(|doc| chunk_document(doc, chunk_size, overlap))
        .collect()
}

fn make_chunk(doc: &Document, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        source: doc.source_path.clone(),
        chunk_index: index,
        text: text.to_string(),
        hash,
        metadata: doc.metadata.clone(),
    }
}
