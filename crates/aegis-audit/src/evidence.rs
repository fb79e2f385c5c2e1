//! Evidence retrieval seam.

use aegis_storage::{CorpusHandle, CorpusInfo, CorpusRole, CorpusStore, StorageError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// A retrieved snippet and the document it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceFragment {
    pub text: String,
    pub source: String,
}

#[async_trait]
pub trait EvidenceSource: Send + Sync {
    /// At most `k` fragments, most relevant first.
    async fn search(
        &self,
        corpus: &CorpusHandle,
        query: &str,
        k: usize,
    ) -> Result<Vec<EvidenceFragment>, StorageError>;

    /// `None` once the corpus has been detached.
    fn info(&self, corpus: &CorpusHandle) -> Option<CorpusInfo>;
}

#[async_trait]
impl EvidenceSource for CorpusStore {
    async fn search(
        &self,
        corpus: &CorpusHandle,
        query: &str,
        k: usize,
    ) -> Result<Vec<EvidenceFragment>, StorageError> {
        let hits = CorpusStore::search(self, corpus, query, k)?;
        Ok(hits
            .into_iter()
            .map(|hit| EvidenceFragment {
                text: hit.chunk.text,
                source: hit.document_name,
            })
            .collect())
    }

    fn info(&self, corpus: &CorpusHandle) -> Option<CorpusInfo> {
        CorpusStore::info(self, corpus)
    }
}

/// Both corpora's fragments, each tagged with its role and source.
pub fn evidence_block(reference: &[EvidenceFragment], subject: &[EvidenceFragment]) -> String {
    let mut out = String::new();
    section(&mut out, CorpusRole::Reference, reference);
    out.push('\n');
    section(&mut out, CorpusRole::Subject, subject);
    out
}

fn section(out: &mut String, role: CorpusRole, fragments: &[EvidenceFragment]) {
    let label = role.as_str().to_ascii_uppercase();
    if fragments.is_empty() {
        let _ = writeln!(out, "[{label}] (no evidence retrieved)");
        return;
    }
    for (i, f) in fragments.iter().enumerate() {
        let _ = writeln!(out, "[{label} {} | source: {}]", i + 1, f.source);
        let _ = writeln!(out, "{}", f.text.trim());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(text: &str, source: &str) -> EvidenceFragment {
        EvidenceFragment {
            text: text.into(),
            source: source.into(),
        }
    }

    #[test]
    fn block_tags_provenance() {
        let block = evidence_block(
            &[frag("Notify within 72 hours.", "act.pdf")],
            &[frag(" Notify within 30 days. ", "policy.pdf")],
        );
        assert!(block.contains("[REFERENCE 1 | source: act.pdf]\nNotify within 72 hours."));
        assert!(block.contains("[SUBJECT 1 | source: policy.pdf]\nNotify within 30 days.\n"));
        assert!(block.find("REFERENCE").unwrap() < block.find("SUBJECT").unwrap());
    }

    #[test]
    fn empty_side_is_explicit() {
        let block = evidence_block(&[], &[frag("x", "p")]);
        assert!(block.starts_with("[REFERENCE] (no evidence retrieved)"));
    }
}
