//! Document ingestion for Aegis
//!
//! Turns uploaded documents into bounded text chunks:
//! - PDF documents (feature `pdf`)
//! - Markdown (heading-delimited sections)
//! - Plain text (paragraphs)
//!
//! Every chunk leaving this crate is at most `TextSplitter::chunk_size`
//! characters; chunks are what the corpus index stores and what the evidence
//! source hands back to the orchestrator.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub mod pdf;
pub mod splitter;

pub use pdf::{PdfDocument, PdfError, PdfPage, PdfParser};
pub use splitter::TextSplitter;

// ============================================================================
// Chunk representation
// ============================================================================

/// A document chunk with source pointer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub document_id: String,
    pub page: Option<usize>,
    pub span_id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

/// Document extraction result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentExtraction {
    pub source_path: String,
    pub document_id: String,
    pub title: Option<String>,
    pub chunks: Vec<Chunk>,
    pub metadata: HashMap<String, String>,
}

impl DocumentExtraction {
    fn empty(doc_id: &str) -> Self {
        Self {
            source_path: String::new(),
            document_id: doc_id.to_string(),
            title: None,
            chunks: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Re-split any chunk longer than the splitter's bound.
    ///
    /// Span ids of split chunks get a `.N` suffix; metadata and page carry over.
    pub fn bounded(mut self, splitter: &TextSplitter) -> Self {
        let mut out = Vec::with_capacity(self.chunks.len());
        for chunk in self.chunks.drain(..) {
            if chunk.text.chars().count() <= splitter.chunk_size() {
                out.push(chunk);
                continue;
            }
            for (i, piece) in splitter.split(&chunk.text).into_iter().enumerate() {
                out.push(Chunk {
                    chunk_id: String::new(),
                    document_id: chunk.document_id.clone(),
                    page: chunk.page,
                    span_id: format!("{}.{}", chunk.span_id, i),
                    text: piece,
                    metadata: chunk.metadata.clone(),
                });
            }
        }
        for (i, chunk) in out.iter_mut().enumerate() {
            chunk.chunk_id = format!("{}_{}", self.document_id, i);
        }
        self.chunks = out;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Pdf(#[from] PdfError),
    #[error("no text could be extracted from {0}")]
    Empty(String),
}

// ============================================================================
// Text extraction
// ============================================================================

/// Extract chunks from plain text, one per paragraph
pub fn extract_text(text: &str, doc_id: &str) -> DocumentExtraction {
    let mut extraction = DocumentExtraction::empty(doc_id);

    let paragraphs = text
        .split("\n\n")
        .map(str::trim)
        .filter(|s| !s.is_empty());

    for (i, para) in paragraphs.enumerate() {
        extraction.chunks.push(Chunk {
            chunk_id: format!("{}_{}", doc_id, i),
            document_id: doc_id.to_string(),
            page: None,
            span_id: format!("para_{}", i),
            text: para.to_string(),
            metadata: HashMap::new(),
        });
    }

    extraction
}

/// Extract chunks from markdown, one per heading-delimited section
pub fn extract_markdown(text: &str, doc_id: &str) -> DocumentExtraction {
    let mut extraction = DocumentExtraction::empty(doc_id);
    let mut current_section = String::new();
    let mut current_text = String::new();

    let flush = |section: &str, body: &str, chunks: &mut Vec<Chunk>| {
        if body.trim().is_empty() {
            return;
        }
        let idx = chunks.len();
        let mut metadata = HashMap::new();
        if !section.is_empty() {
            metadata.insert("section".to_string(), section.to_string());
        }
        chunks.push(Chunk {
            chunk_id: format!("{}_{}", doc_id, idx),
            document_id: doc_id.to_string(),
            page: None,
            span_id: format!("section_{}", idx),
            text: body.trim().to_string(),
            metadata,
        });
    };

    for line in text.lines() {
        if line.starts_with('#') {
            flush(&current_section, &current_text, &mut extraction.chunks);
            current_section = line.trim_start_matches('#').trim().to_string();
            current_text.clear();
            if extraction.title.is_none() && !current_section.is_empty() {
                extraction.title = Some(current_section.clone());
            }
        } else {
            current_text.push_str(line);
            current_text.push('\n');
        }
    }
    flush(&current_section, &current_text, &mut extraction.chunks);

    extraction
}

/// Extract a document from disk, dispatching on extension.
///
/// `pdf` goes through [`PdfParser`], `md`/`markdown` through
/// [`extract_markdown`], everything else is treated as plain text. The result
/// is always bounded by `splitter`.
pub fn extract_document(
    path: &Path,
    splitter: &TextSplitter,
) -> Result<DocumentExtraction, IngestError> {
    let doc_id = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "doc".to_string());
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    let read = |path: &Path| {
        std::fs::read_to_string(path).map_err(|source| IngestError::Io {
            path: path.display().to_string(),
            source,
        })
    };

    let mut extraction = match ext.as_str() {
        "pdf" => {
            let doc = PdfParser::new().parse_file(path)?;
            doc.to_extraction(&doc_id)
        }
        "md" | "markdown" => extract_markdown(&read(path)?, &doc_id),
        _ => extract_text(&read(path)?, &doc_id),
    };
    extraction.source_path = path.display().to_string();
    if extraction.title.is_none() {
        extraction.title = path.file_name().map(|s| s.to_string_lossy().to_string());
    }

    let extraction = extraction.bounded(splitter);
    if extraction.chunks.is_empty() {
        return Err(IngestError::Empty(path.display().to_string()));
    }

    tracing::debug!(
        path = %path.display(),
        chunks = extraction.chunks.len(),
        "extracted document"
    );
    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn paragraphs_become_chunks() {
        let extraction = extract_text("First clause.\n\n\nSecond clause.\n\n  ", "policy");
        assert_eq!(extraction.chunks.len(), 2);
        assert_eq!(extraction.chunks[1].chunk_id, "policy_1");
        assert_eq!(extraction.chunks[1].text, "Second clause.");
    }

    #[test]
    fn markdown_sections_keep_titles() {
        let md = "# Data Protection Act\nPreamble text.\n\n## Section 12\nProcessors must notify.\n";
        let extraction = extract_markdown(md, "act");

        assert_eq!(extraction.title.as_deref(), Some("Data Protection Act"));
        assert_eq!(extraction.chunks.len(), 2);
        assert_eq!(
            extraction.chunks[1].metadata.get("section").map(String::as_str),
            Some("Section 12")
        );
    }

    #[test]
    fn bounded_resplits_long_chunks() {
        let long = (0..400).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
        let extraction = extract_text(&long, "law").bounded(&TextSplitter::new(200, 20));

        assert!(extraction.chunks.len() > 1);
        for (i, chunk) in extraction.chunks.iter().enumerate() {
            assert!(chunk.text.chars().count() <= 200);
            assert_eq!(chunk.chunk_id, format!("law_{i}"));
        }
    }

    #[test]
    fn extract_document_reads_markdown_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
        writeln!(file, "# Policy\nEmployees may terminate with 30 days notice.").unwrap();

        let extraction = extract_document(file.path(), &TextSplitter::default()).unwrap();
        assert_eq!(extraction.chunks.len(), 1);
        assert!(extraction.chunks[0].text.contains("30 days"));
    }

    #[test]
    fn extract_document_rejects_empty_files() {
        let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        let err = extract_document(file.path(), &TextSplitter::default()).unwrap_err();
        assert!(matches!(err, IngestError::Empty(_)));
    }
}
