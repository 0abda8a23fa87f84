//! Plain-text extraction from uploaded files, one string per page.

use lopdf::Document;

pub const PDF_MIME: &str = "application/pdf";
pub const TEXT_MIME: &str = "text/plain";

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Failed to parse PDF: {0}")]
    InvalidPdf(String),
    #[error("File is not valid UTF-8 text")]
    InvalidText,
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
}

/// Page texts, in page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub pages: Vec<String>,
}

impl ExtractedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn has_text(&self) -> bool {
        self.pages.iter().any(|p| !p.trim().is_empty())
    }

    /// All pages joined by blank lines, with the byte offset where each page
    /// begins in the joined text.
    pub fn joined(&self) -> (String, Vec<usize>) {
        let mut text = String::new();
        let mut page_starts = Vec::with_capacity(self.pages.len());
        for (i, page) in self.pages.iter().enumerate() {
            if i > 0 {
                text.push_str("\n\n");
            }
            page_starts.push(text.len());
            text.push_str(page);
        }
        (text, page_starts)
    }
}

/// 1-based page containing byte `offset`.
pub fn page_for_offset(page_starts: &[usize], offset: usize) -> usize {
    page_starts
        .iter()
        .take_while(|&&start| start <= offset)
        .count()
        .max(1)
}

/// CPU-bound; callers on the async runtime should run it via `spawn_blocking`.
pub fn extract_text(bytes: &[u8], mime_type: &str) -> Result<ExtractedDocument, ExtractionError> {
    match mime_type {
        PDF_MIME => extract_pdf(bytes),
        TEXT_MIME => {
            let text = std::str::from_utf8(bytes).map_err(|_| ExtractionError::InvalidText)?;
            Ok(ExtractedDocument {
                pages: vec![text.to_string()],
            })
        }
        other => Err(ExtractionError::UnsupportedType(other.to_string())),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<ExtractedDocument, ExtractionError> {
    let doc = Document::load_mem(bytes).map_err(|e| ExtractionError::InvalidPdf(e.to_string()))?;

    let pages = doc
        .get_pages()
        .keys()
        .map(|&page_number| {
            // A page whose content stream cannot be decoded contributes no text
            doc.extract_text(&[page_number]).unwrap_or_else(|e| {
                tracing::debug!(page = page_number, error = %e, "Skipping unreadable PDF page");
                String::new()
            })
        })
        .collect();

    Ok(ExtractedDocument { pages })
}
