//! Turning raw files into [`Document`]s.
//!
//! PDFs are split into one document per page with `pdf-extract`. Images are
//! read and base64-encoded here; turning them into text is the job of an
//! [`ImageDescriber`](crate::vision::ImageDescriber).

use std::path::Path;

use base64::Engine as _;
use pdf_extract::extract_text_from_mem_by_pages;
use serde_json::json;
use thiserror::Error;

use docchat_core::models::{Document, DocumentKind, Metadata};

/// Extraction error. Never panics; the pipeline reports and resets instead.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("image encoding failed: {0}")]
    Image(String),
}

/// An image ready to send to a multimodal model.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// Standard (padded) base64 of the raw file bytes.
    pub base64: String,
    /// MIME type inferred from the extension, e.g. `image/png`.
    pub media_type: &'static str,
}

/// Extract one [`Document`] per PDF page.
///
/// Each page carries `source` (the path) and a 0-based `page` in its
/// metadata. A PDF with no pages yields an empty vector.
pub fn extract_pdf(path: &Path) -> Result<Vec<Document>, ExtractError> {
    let bytes = std::fs::read(path)?;
    let pages = extract_pdf_pages(&bytes)?;
    let source = path.display().to_string();

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(page, content)| {
            let mut metadata = Metadata::new();
            metadata.insert("source".to_string(), json!(source));
            metadata.insert("page".to_string(), json!(page));
            Document {
                content,
                metadata,
                source_path: source.clone(),
                kind: DocumentKind::Pdf,
            }
        })
        .collect())
}

const PARSER_PANICKED: &str = "parser panicked on malformed input";

/// Page texts of an in-memory PDF.
///
/// `pdf-extract` can panic on malformed input; that is reported as an
/// ordinary extraction error.
pub fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    let parsed = std::panic::catch_unwind(|| extract_text_from_mem_by_pages(bytes));
    match parsed {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(ExtractError::Pdf(e.to_string())),
        Err(_) => Err(ExtractError::Pdf(PARSER_PANICKED.to_string())),
    }
}

/// Read an image file and base64-encode it.
pub fn encode_image(path: &Path) -> Result<EncodedImage, ExtractError> {
    let media_type = image_media_type(path).ok_or_else(|| {
        ExtractError::Image(format!("{} is not a png or jpeg file", path.display()))
    })?;
    let bytes = std::fs::read(path)?;
    if bytes.is_empty() {
        return Err(ExtractError::Image(format!("{} is empty", path.display())));
    }

    Ok(EncodedImage {
        base64: base64::engine::general_purpose::STANDARD.encode(&bytes),
        media_type,
    })
}

/// Wrap a model-produced description as the single document for an image.
pub fn image_document(path: &Path, description: String) -> Document {
    let source = path.display().to_string();
    let mut metadata = Metadata::new();
    metadata.insert("source".to_string(), json!(source));
    metadata.insert("type".to_string(), json!("image"));
    Document {
        content: description,
        metadata,
        source_path: source,
        kind: DocumentKind::Image,
    }
}

fn image_media_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        _ => None,
    }
}
