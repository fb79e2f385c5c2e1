//! PDF extraction
//!
//! `pdf-extract` yields one string with pages separated by form feeds. Pages
//! are kept so chunks can point back at where a clause was found.

use crate::{Chunk, DocumentExtraction};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Text of one PDF, page by page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfDocument {
    pub file_name: Option<String>,
    pub pages: Vec<PdfPage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfPage {
    /// 1-based, counting only pages that carry text
    pub number: usize,
    pub text: String,
}

impl PdfDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Paragraph chunks tagged with the page they came from.
    pub fn to_extraction(&self, doc_id: &str) -> DocumentExtraction {
        let chunks = self
            .pages
            .iter()
            .flat_map(|page| {
                page.text
                    .split("\n\n")
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(move |p| (page.number, p))
            })
            .enumerate()
            .map(|(idx, (number, para))| Chunk {
                chunk_id: format!("{doc_id}_{idx}"),
                document_id: doc_id.to_string(),
                page: Some(number),
                span_id: format!("p{number}_para_{idx}"),
                text: para.to_string(),
                metadata: HashMap::new(),
            })
            .collect();

        DocumentExtraction {
            source_path: String::new(),
            document_id: doc_id.to_string(),
            title: self.file_name.clone(),
            chunks,
            metadata: HashMap::from([("page_count".to_string(), self.page_count().to_string())]),
        }
    }
}

#[derive(Debug, Default)]
pub struct PdfParser;

impl PdfParser {
    pub fn new() -> Self {
        Self
    }

    #[cfg(feature = "pdf")]
    pub fn parse_file(&self, path: &Path) -> Result<PdfDocument, PdfError> {
        let bytes = std::fs::read(path)?;
        let mut doc = self.parse_bytes(&bytes)?;
        doc.file_name = path.file_name().map(|s| s.to_string_lossy().to_string());
        Ok(doc)
    }

    #[cfg(feature = "pdf")]
    pub fn parse_bytes(&self, data: &[u8]) -> Result<PdfDocument, PdfError> {
        let text = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| PdfError::Unreadable(e.to_string()))?;
        Ok(Self::from_text(&text))
    }

    #[cfg(not(feature = "pdf"))]
    pub fn parse_file(&self, _path: &Path) -> Result<PdfDocument, PdfError> {
        Err(PdfError::FeatureNotEnabled)
    }

    #[cfg(not(feature = "pdf"))]
    pub fn parse_bytes(&self, _data: &[u8]) -> Result<PdfDocument, PdfError> {
        Err(PdfError::FeatureNotEnabled)
    }

    /// Split already-extracted text on form feeds, dropping blank pages.
    pub fn from_text(text: &str) -> PdfDocument {
        let pages = text
            .split('\x0C')
            .filter(|page| !page.trim().is_empty())
            .enumerate()
            .map(|(i, page)| PdfPage {
                number: i + 1,
                text: page.to_string(),
            })
            .collect();
        PdfDocument {
            file_name: None,
            pages,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("unreadable PDF: {0}")]
    Unreadable(String),
    #[error("failed to read PDF: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF support not compiled in (enable the `pdf` feature)")]
    FeatureNotEnabled,
}
