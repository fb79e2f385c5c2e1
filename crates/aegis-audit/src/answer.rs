//! Query-time answers.
//!
//! - no documents (absent or detached): conversational prompt that must not
//!   invent document contents; the router is skipped
//! - documents + conversational query: conversational prompt, no retrieval
//! - documents + evidence-seeking query: top `answer_k` fragments from each
//!   corpus, answer constrained to that context
//!
//! History is passed through untouched.

use crate::config::AuditConfig;
use crate::evidence::{evidence_block, EvidenceFragment, EvidenceSource};
use crate::prompts::{conversational_prompt, grounded_answer_prompt};
use crate::router::IntentRouter;
use crate::types::Intent;
use crate::AuditError;
use aegis_llm::{CompletionService, Turn};
use aegis_storage::CorpusHandle;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::Arc;

/// Answer text increments; single reader, not restartable.
pub type AnswerStream = BoxStream<'static, Result<String, AuditError>>;

pub struct Assistant {
    llm: Arc<dyn CompletionService>,
    evidence: Arc<dyn EvidenceSource>,
    router: IntentRouter,
    k: usize,
}

impl Assistant {
    pub fn new(
        llm: Arc<dyn CompletionService>,
        evidence: Arc<dyn EvidenceSource>,
        config: &AuditConfig,
    ) -> Self {
        Self {
            router: IntentRouter::new(Arc::clone(&llm)),
            llm,
            evidence,
            k: config.answer_k,
        }
    }

    pub async fn answer(
        &self,
        query: &str,
        reference: Option<&CorpusHandle>,
        subject: Option<&CorpusHandle>,
        history: &[Turn],
    ) -> Result<AnswerStream, AuditError> {
        let prompt = self.build_prompt(query, reference, subject).await;
        let stream = self.llm.generate_stream(&prompt, history).await?;
        Ok(stream.map(|piece| piece.map_err(AuditError::from)).boxed())
    }

    async fn build_prompt(
        &self,
        query: &str,
        reference: Option<&CorpusHandle>,
        subject: Option<&CorpusHandle>,
    ) -> String {
        let documents = match (reference, subject) {
            (Some(r), Some(s)) if self.evidence.info(r).is_some() && self.evidence.info(s).is_some() => {
                Some((r, s))
            }
            _ => None,
        };
        let Some((reference, subject)) = documents else {
            tracing::debug!("no documents attached, answering conversationally");
            return conversational_prompt(query, false);
        };

        if self.router.classify(query).await == Intent::Conversational {
            return conversational_prompt(query, true);
        }

        match self.retrieve(query, reference, subject).await {
            Some((r, s)) => grounded_answer_prompt(query, &evidence_block(&r, &s)),
            None => conversational_prompt(query, false),
        }
    }

    async fn retrieve(
        &self,
        query: &str,
        reference: &CorpusHandle,
        subject: &CorpusHandle,
    ) -> Option<(Vec<EvidenceFragment>, Vec<EvidenceFragment>)> {
        let r = self.evidence.search(reference, query, self.k).await;
        let s = self.evidence.search(subject, query, self.k).await;
        match (r, s) {
            (Ok(r), Ok(s)) => {
                tracing::debug!(reference = r.len(), subject = s.len(), "retrieved answer context");
                Some((r, s))
            }
            (Err(err), _) | (_, Err(err)) => {
                // detached mid-request: same as no documents
                tracing::warn!(error = %err, "answer retrieval failed, treating documents as absent");
                None
            }
        }
    }
}
