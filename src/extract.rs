//! Text extraction boundary.
//!
//! The pipeline treats byte-level parsing as an opaque collaborator behind
//! [`TextExtractor`]: raw text plus a page count in, nothing else. A concrete
//! PDF implementation is available with the `pdf` feature.

use std::path::Path;

use crate::error::Result;

/// Raw text extracted from one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// The full document text.
    pub text: String,
    /// Number of pages in the source.
    pub pages: usize,
}

/// Extracts raw text and a page count from a source file.
///
/// Extraction is local and synchronous; failures are reported per file and
/// tolerated by the ingestion orchestrator.
pub trait TextExtractor: Send + Sync {
    /// Extract text from the file at `path`.
    fn extract(&self, path: &Path) -> Result<ExtractedText>;
}

#[cfg(feature = "pdf")]
pub use self::pdf::PdfTextExtractor;

#[cfg(feature = "pdf")]
mod pdf {
    use std::path::Path;

    use tracing::debug;

    use super::{ExtractedText, TextExtractor};
    use crate::error::{RagError, Result};

    /// A [`TextExtractor`] for PDF files.
    ///
    /// Text comes from `pdf-extract`; the page count from `lopdf`.
    #[derive(Debug, Clone, Default)]
    pub struct PdfTextExtractor;

    impl PdfTextExtractor {
        /// Create a new PDF extractor.
        pub fn new() -> Self {
            Self
        }
    }

    impl TextExtractor for PdfTextExtractor {
        fn extract(&self, path: &Path) -> Result<ExtractedText> {
            debug!(path = %path.display(), "extracting PDF text");

            let file = path.display().to_string();
            let text = pdf_extract::extract_text(path).map_err(|e| RagError::Extraction {
                file: file.clone(),
                message: format!("text extraction failed: {e}"),
            })?;

            let pages = lopdf::Document::load(path)
                .map_err(|e| RagError::Extraction {
                    file: file.clone(),
                    message: format!("page count failed: {e}"),
                })?
                .get_pages()
                .len();

            Ok(ExtractedText { text, pages })
        }
    }
}
