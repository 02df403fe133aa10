//! Text extraction for uploaded resume documents.
//!
//! Converts a PDF or DOCX file into plain text for the heuristic parser.
//! Extraction failures are reported upward — no retry or masking here; the
//! orchestrator decides what a failed extraction means for the resume.

use std::path::Path;

use docx_rs::{read_docx, DocumentChild};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type '.{0}'. Only PDF/DOCX supported.")]
    UnsupportedFormat(String),

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

/// Accepted upload formats, derived from the declared filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    /// Maps a filename to a supported format by its extension
    /// (case-insensitive). Anything else is `UnsupportedFormat`.
    pub fn from_filename(filename: &str) -> Result<Self, ExtractError> {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Ok(DocumentKind::Pdf),
            "docx" => Ok(DocumentKind::Docx),
            _ => Err(ExtractError::UnsupportedFormat(ext)),
        }
    }
}

/// Extracts plain text from the document at `path`, dispatching on the
/// declared `filename` extension. Output is trimmed of surrounding
/// whitespace.
pub fn extract_text(path: &Path, filename: &str) -> Result<String, ExtractError> {
    match DocumentKind::from_filename(filename)? {
        DocumentKind::Pdf => extract_pdf(path),
        DocumentKind::Docx => extract_docx(path),
    }
}

/// Page texts concatenated with newlines. Pages with no extractable text
/// (image-only scans) contribute an empty string rather than failing the
/// whole document.
fn extract_pdf(path: &Path) -> Result<String, ExtractError> {
    let pages =
        pdf_extract::extract_text_by_pages(path).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(pages.join("\n").trim().to_string())
}

/// Paragraph texts in document order, concatenated with newlines.
fn extract_docx(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path)?;
    let docx = read_docx(&bytes).map_err(|e| ExtractError::Docx(e.to_string()))?;

    let mut paragraphs = Vec::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(p) = child {
            paragraphs.push(p.raw_text());
        }
    }
    Ok(paragraphs.join("\n").trim().to_string())
}
