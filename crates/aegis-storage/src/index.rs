//! Lexical corpus index (Okapi BM25 over chunk text).
//!
//! Ranking follows vector-search semantics: every chunk gets a score and the
//! top `k` are returned even when nothing matches, so a non-empty corpus always
//! yields `min(k, chunks)` fragments. Ties keep document order.

use aegis_ingest::Chunk;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

const K1: f32 = 1.2;
const B: f32 = 0.75;

pub const INDEX_FILE_VERSION: u32 = 1;

/// On-disk form; term statistics are rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PersistedIndex {
    pub version: u32,
    pub document_name: String,
    pub digest: String,
    pub chunks: Vec<Chunk>,
}

#[derive(Debug)]
pub struct CorpusIndex {
    document_name: String,
    digest: String,
    chunks: Vec<Chunk>,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<usize>,
    doc_freq: HashMap<String, usize>,
    avg_len: f32,
}

impl CorpusIndex {
    pub fn build(document_name: &str, chunks: Vec<Chunk>) -> Self {
        let digest = content_digest(&chunks);
        Self::from_parts(document_name.to_string(), digest, chunks)
    }

    fn from_parts(document_name: String, digest: String, chunks: Vec<Chunk>) -> Self {
        let mut term_freqs = Vec::with_capacity(chunks.len());
        let mut doc_lens = Vec::with_capacity(chunks.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for chunk in &chunks {
            let tokens = tokenize(&chunk.text);
            doc_lens.push(tokens.len());
            let mut tf: HashMap<String, u32> = HashMap::new();
            for t in tokens {
                *tf.entry(t).or_default() += 1;
            }
            for term in tf.keys() {
                *doc_freq.entry(term.clone()).or_default() += 1;
            }
            term_freqs.push(tf);
        }

        let avg_len = if doc_lens.is_empty() {
            0.0
        } else {
            doc_lens.iter().sum::<usize>() as f32 / doc_lens.len() as f32
        };

        Self {
            document_name,
            digest,
            chunks,
            term_freqs,
            doc_lens,
            doc_freq,
            avg_len,
        }
    }

    pub(crate) fn from_persisted(p: PersistedIndex) -> Self {
        Self::from_parts(p.document_name, p.digest, p.chunks)
    }

    pub(crate) fn to_persisted(&self) -> PersistedIndex {
        PersistedIndex {
            version: INDEX_FILE_VERSION,
            document_name: self.document_name.clone(),
            digest: self.digest.clone(),
            chunks: self.chunks.clone(),
        }
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Top `k` chunks for `query`, best first.
    pub fn search(&self, query: &str, k: usize) -> Vec<(f32, &Chunk)> {
        let terms: HashSet<String> = tokenize(query).into_iter().collect();
        let n = self.chunks.len() as f32;

        let mut scored: Vec<(f32, usize)> = (0..self.chunks.len())
            .map(|i| {
                let score = terms
                    .iter()
                    .map(|term| self.term_score(i, term, n))
                    .sum::<f32>();
                (score, i)
            })
            .collect();

        // stable: equal scores keep document order
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored
            .into_iter()
            .take(k)
            .map(|(score, i)| (score, &self.chunks[i]))
            .collect()
    }

    fn term_score(&self, doc: usize, term: &str, n: f32) -> f32 {
        let Some(&tf) = self.term_freqs[doc].get(term) else {
            return 0.0;
        };
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f32;
        let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
        let tf = tf as f32;
        let len_norm = if self.avg_len > 0.0 {
            self.doc_lens[doc] as f32 / self.avg_len
        } else {
            1.0
        };
        idf * (tf * (K1 + 1.0)) / (tf + K1 * (1.0 - B + B * len_norm))
    }
}

/// SHA-256 over chunk texts, NUL separated.
pub fn content_digest(chunks: &[Chunk]) -> String {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk.text.as_bytes());
        hasher.update([0u8]);
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn stopwords() -> &'static HashSet<&'static str> {
    static STOPWORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    STOPWORDS.get_or_init(|| {
        [
            "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has",
            "had", "do", "does", "did", "will", "would", "could", "should", "may", "might",
            "must", "shall", "can", "what", "when", "where", "which", "who", "whom", "whose",
            "why", "how", "this", "that", "these", "those", "you", "they", "them", "its", "our",
            "their", "and", "but", "if", "then", "than", "so", "as", "for", "with", "about",
            "from", "into", "onto", "not", "any", "all",
        ]
        .into_iter()
        .collect()
    })
}

/// Lowercased alphanumeric terms; short words and stopwords are dropped,
/// numbers are kept regardless of length (clause and section numbers matter).
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .filter(|w| w.chars().all(|c| c.is_ascii_digit()) || w.chars().count() > 2)
        .filter(|w| !stopwords().contains(w))
        .map(String::from)
        .collect()
}
