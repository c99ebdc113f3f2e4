//! PDF text extraction using lopdf and pdf-extract.

use lazy_static::lazy_static;
use lopdf::Document;
use regex::Regex;
use tracing::debug;

use super::{Result, TextExtractor};
use crate::error::PdfError;

lazy_static! {
    static ref TRAILING_SPACE: Regex = Regex::new(r"[ \t\u{a0}]+\n").unwrap();
    static ref BLANK_RUNS: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// PDF text extractor using lopdf for loading and pdf-extract for text.
#[derive(Debug, Clone, Default)]
pub struct PdfExtractor;

/// A parsed PDF, decrypted if it was protected with an empty password.
#[derive(Debug, Clone)]
pub struct LoadedPdf {
    raw_data: Vec<u8>,
    page_count: usize,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self
    }

    /// Parse a PDF from bytes.
    pub fn load(&self, data: &[u8]) -> Result<LoadedPdf> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        let raw_data = if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract reads bytes, so hand it the decrypted document
            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        Ok(LoadedPdf {
            raw_data,
            page_count,
        })
    }
}

impl LoadedPdf {
    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Text of every page in reading order.
    pub fn text(&self) -> Result<String> {
        pdf_extract::extract_text_from_mem(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }
}

impl TextExtractor for PdfExtractor {
    fn extract_text(&self, data: &[u8]) -> Result<String> {
        let pdf = self.load(data)?;
        let text = pdf.text()?;
        let text = clean_text(&text);

        debug!(
            "Extracted {} chars of text from {} page(s)",
            text.len(),
            pdf.page_count()
        );
        Ok(text)
    }
}

/// Normalize line endings, drop trailing whitespace and collapse runs of
/// blank lines. Content is otherwise untouched.
pub fn clean_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = TRAILING_SPACE.replace_all(&text, "\n");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}
