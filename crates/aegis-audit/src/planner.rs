//! Audit plan discovery.
//!
//! The plan is proposed by the model from a small sample of both corpora, so
//! pillars fit the documents actually uploaded. The returned list is used as
//! given: truncated to `max_pillars`, never padded. Every failure falls back to
//! [`DEFAULT_PILLARS`].

use crate::evidence::{evidence_block, EvidenceSource};
use crate::prompts::plan_prompt;
use aegis_llm::CompletionService;
use aegis_storage::CorpusHandle;
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_PILLARS: [&str; 8] = [
    "Scope and Applicability",
    "Definitions",
    "Obligations and Responsibilities",
    "Data Protection and Privacy",
    "Termination",
    "Liability and Indemnification",
    "Dispute Resolution and Jurisdiction",
    "Compliance Monitoring and Reporting",
];

const SAMPLE_QUERY: &str = "summary scope purpose application obligations";

pub fn default_plan() -> Vec<String> {
    DEFAULT_PILLARS.iter().map(|p| p.to_string()).collect()
}

pub struct PlanGenerator {
    llm: Arc<dyn CompletionService>,
    evidence: Arc<dyn EvidenceSource>,
    sample_k: usize,
    max_pillars: usize,
}

impl PlanGenerator {
    pub fn new(
        llm: Arc<dyn CompletionService>,
        evidence: Arc<dyn EvidenceSource>,
        sample_k: usize,
        max_pillars: usize,
    ) -> Self {
        Self {
            llm,
            evidence,
            sample_k,
            max_pillars: max_pillars.max(1),
        }
    }

    /// Ordered pillar names, `1..=max_pillars` long.
    pub async fn generate_plan(
        &self,
        reference: &CorpusHandle,
        subject: &CorpusHandle,
    ) -> Vec<String> {
        let sample = async {
            let r = self.evidence.search(reference, SAMPLE_QUERY, self.sample_k).await?;
            let s = self.evidence.search(subject, SAMPLE_QUERY, self.sample_k).await?;
            Ok::<_, aegis_storage::StorageError>((r, s))
        };
        let (reference_sample, subject_sample) = match sample.await {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(error = %err, "plan sampling failed, using default pillars");
                return self.fallback();
            }
        };
        if reference_sample.is_empty() && subject_sample.is_empty() {
            tracing::warn!("both corpora are empty, using default pillars");
            return self.fallback();
        }

        let prompt = plan_prompt(
            self.max_pillars,
            &evidence_block(&reference_sample, &subject_sample),
        );
        let value = match self.llm.generate_json(&prompt).await {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(error = %err, "plan generation failed, using default pillars");
                return self.fallback();
            }
        };

        match parse_pillars(&value) {
            Some(mut pillars) => {
                pillars.truncate(self.max_pillars);
                tracing::info!(count = pillars.len(), "generated audit plan");
                pillars
            }
            None => {
                tracing::warn!(output = %value, "unusable plan output, using default pillars");
                self.fallback()
            }
        }
    }

    fn fallback(&self) -> Vec<String> {
        let mut plan = default_plan();
        plan.truncate(self.max_pillars);
        plan
    }
}

/// `{"pillars": [...]}` or a bare array; non-string and blank entries are skipped.
fn parse_pillars(value: &Value) -> Option<Vec<String>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => map.get("pillars")?.as_array()?,
        _ => return None,
    };
    let pillars: Vec<String> = items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    (!pillars.is_empty()).then_some(pillars)
}
