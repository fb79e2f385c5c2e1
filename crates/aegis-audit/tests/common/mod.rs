//! Shared fixtures: a scripted completion service and on-disk corpora.

#![allow(dead_code)]

use aegis_ingest::extract_text;
use aegis_llm::{CompletionService, LlmError, TextStream, Turn};
use aegis_storage::{CorpusHandle, CorpusRole, CorpusStore};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

// ============================================================================
// Scripted completion service
// ============================================================================

#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Text(Vec<&'static str>),
    /// Streams the pieces, then fails
    TextThenError(Vec<&'static str>),
    FormatError,
    NetworkError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Stream,
    Json,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub mode: Mode,
    pub prompt: String,
    pub history: Vec<Turn>,
}

/// Replies chosen by the first rule whose needle occurs in the prompt.
///
/// Unmatched JSON calls fail with a format error, unmatched stream calls with
/// a network error.
#[derive(Default)]
pub struct ScriptedCompletion {
    rules: Vec<(String, Reply)>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, needle: &str, reply: Reply) -> Self {
        self.rules.push((needle.to_string(), reply));
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Calls whose prompt contains `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.prompt.contains(needle))
            .count()
    }

    fn reply_for(&self, mode: Mode, prompt: &str, history: &[Turn]) -> Option<Reply> {
        self.calls.lock().push(Call {
            mode,
            prompt: prompt.to_string(),
            history: history.to_vec(),
        });
        self.rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn generate_stream(&self, prompt: &str, history: &[Turn]) -> Result<TextStream, LlmError> {
        let pieces = |items: Vec<&'static str>| -> Vec<Result<String, LlmError>> {
            items.into_iter().map(|s| Ok(s.to_string())).collect()
        };
        match self.reply_for(Mode::Stream, prompt, history) {
            Some(Reply::Text(items)) => Ok(stream::iter(pieces(items)).boxed()),
            Some(Reply::TextThenError(items)) => {
                let mut items = pieces(items);
                items.push(Err(LlmError::Network("connection reset".into())));
                Ok(stream::iter(items).boxed())
            }
            Some(Reply::Json(v)) => Ok(stream::iter(vec![Ok(v.to_string())]).boxed()),
            Some(Reply::FormatError) => Err(LlmError::Format("scripted".into())),
            Some(Reply::NetworkError) | None => Err(LlmError::Network("scripted outage".into())),
        }
    }

    async fn generate_json(&self, prompt: &str) -> Result<Value, LlmError> {
        match self.reply_for(Mode::Json, prompt, &[]) {
            Some(Reply::Json(v)) => Ok(v),
            Some(Reply::NetworkError) => Err(LlmError::Network("scripted outage".into())),
            Some(Reply::Text(_) | Reply::TextThenError(_) | Reply::FormatError) | None => {
                Err(LlmError::Format("scripted non-JSON output".into()))
            }
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// Corpora
// ============================================================================

pub const ACT: &str = "Section 12. A processor must notify the supervisory authority of a personal data breach within 72 hours.\n\n\
Section 13. Records of processing activities shall be retained for five years.\n\n\
Section 20. Either party may terminate the agreement with 30 days written notice.";

pub const POLICY: &str = "Clause 4. Security incidents are reported to management within 30 days.\n\n\
Clause 7. Processing logs are kept for one year.\n\n\
Clause 9. The company may terminate services at any time without notice.";

pub struct Fixture {
    _dir: TempDir,
    pub store: Arc<CorpusStore>,
    pub session: Uuid,
    pub reference: CorpusHandle,
    pub subject: CorpusHandle,
}

impl Fixture {
    pub fn new(reference: &str, subject: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CorpusStore::new(dir.path()));
        let session = Uuid::new_v4();
        let reference = store
            .create(
                session,
                CorpusRole::Reference,
                "act.pdf",
                extract_text(reference, "act").chunks,
            )
            .unwrap();
        let subject = store
            .create(
                session,
                CorpusRole::Subject,
                "policy.pdf",
                extract_text(subject, "policy").chunks,
            )
            .unwrap();
        Self {
            _dir: dir,
            store,
            session,
            reference,
            subject,
        }
    }

    pub fn standard() -> Self {
        Self::new(ACT, POLICY)
    }
}
