//! Per-pillar pipeline and report assembly.
//!
//! For each pillar, in plan order:
//! 1. analyze against both corpora
//! 2. gate on the normalized confidence
//! 3. below the threshold, critique exactly once; a correction replaces the
//!    finding whole, a failed critique keeps the original
//! 4. a pillar whose retrieval failed is still critiqued once but stays
//!    inconclusive
//!
//! With `concurrency > 1` pillars run on a bounded pool, but results are
//! still emitted in plan order.

use crate::analyzer::{PillarAnalysis, PillarAnalyzer};
use crate::confidence::ConfidenceArbiter;
use crate::critic::Critic;
use crate::types::{Finding, ReportEntry};
use aegis_storage::CorpusHandle;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};

#[async_trait]
pub trait Analyze: Send + Sync {
    async fn analyze(
        &self,
        pillar: &str,
        reference: &CorpusHandle,
        subject: &CorpusHandle,
    ) -> PillarAnalysis;
}

#[async_trait]
pub trait Critique: Send + Sync {
    async fn critique(&self, pillar: &str, finding: &Finding, evidence: &str) -> Option<Finding>;
}

#[async_trait]
impl Analyze for PillarAnalyzer {
    async fn analyze(
        &self,
        pillar: &str,
        reference: &CorpusHandle,
        subject: &CorpusHandle,
    ) -> PillarAnalysis {
        PillarAnalyzer::analyze(self, pillar, reference, subject).await
    }
}

#[async_trait]
impl Critique for Critic {
    async fn critique(&self, pillar: &str, finding: &Finding, evidence: &str) -> Option<Finding> {
        Critic::critique(self, pillar, finding, evidence).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReportAssembler {
    arbiter: ConfidenceArbiter,
    concurrency: usize,
}

impl ReportAssembler {
    pub fn new(arbiter: ConfidenceArbiter, concurrency: usize) -> Self {
        Self {
            arbiter,
            concurrency: concurrency.max(1),
        }
    }

    /// One entry per pillar; entry `i` belongs to `pillars[i]`.
    pub async fn assemble<A, C>(
        &self,
        pillars: &[String],
        reference: &CorpusHandle,
        subject: &CorpusHandle,
        analyzer: &A,
        critic: &C,
    ) -> Vec<ReportEntry>
    where
        A: Analyze + ?Sized,
        C: Critique + ?Sized,
    {
        stream::iter(pillars)
            .map(|pillar| self.run_pillar(pillar, reference, subject, analyzer, critic))
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn run_pillar<A, C>(
        &self,
        pillar: &str,
        reference: &CorpusHandle,
        subject: &CorpusHandle,
        analyzer: &A,
        critic: &C,
    ) -> ReportEntry
    where
        A: Analyze + ?Sized,
        C: Critique + ?Sized,
    {
        let PillarAnalysis {
            finding,
            evidence,
            grounded,
        } = analyzer.analyze(pillar, reference, subject).await;

        if !self.arbiter.requires_critique(finding.confidence) {
            return ReportEntry {
                finding,
                verified: false,
            };
        }

        tracing::debug!(
            pillar = %pillar,
            confidence = finding.confidence,
            threshold = self.arbiter.threshold(),
            "confidence below threshold, critiquing"
        );
        match critic.critique(pillar, &finding, &evidence).await {
            Some(_) if !grounded => {
                tracing::warn!(pillar = %pillar, "ignoring critique of ungrounded pillar");
                ReportEntry {
                    finding,
                    verified: false,
                }
            }
            Some(mut corrected) => {
                corrected.pillar = pillar.to_string();
                ReportEntry {
                    finding: corrected,
                    verified: true,
                }
            }
            None => ReportEntry {
                finding,
                verified: false,
            },
        }
    }
}
