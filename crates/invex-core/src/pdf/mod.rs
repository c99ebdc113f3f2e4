//! PDF processing module.

mod extractor;

pub use extractor::{clean_text, LoadedPdf, PdfExtractor};

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for turning document bytes into plain text.
pub trait TextExtractor: Send + Sync {
    /// Extract the full text of the document. May be empty.
    fn extract_text(&self, data: &[u8]) -> Result<String>;
}
