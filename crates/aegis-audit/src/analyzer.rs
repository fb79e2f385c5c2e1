use crate::evidence::{evidence_block, EvidenceSource};
use crate::prompts::analysis_prompt;
use crate::types::Finding;
use aegis_llm::CompletionService;
use aegis_storage::CorpusHandle;
use std::sync::Arc;

/// A finding together with the evidence block it was produced from.
///
/// The critique pass is handed the same block. `grounded` is false when
/// retrieval failed: the block then says no evidence was retrieved and the
/// finding must stay inconclusive whatever the critique returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PillarAnalysis {
    pub finding: Finding,
    pub evidence: String,
    pub grounded: bool,
}

/// Retrieval-grounded analysis of one pillar.
pub struct PillarAnalyzer {
    llm: Arc<dyn CompletionService>,
    evidence: Arc<dyn EvidenceSource>,
    k: usize,
}

impl PillarAnalyzer {
    pub fn new(
        llm: Arc<dyn CompletionService>,
        evidence: Arc<dyn EvidenceSource>,
        k: usize,
    ) -> Self {
        Self { llm, evidence, k }
    }

    /// Never fails: any retrieval, service, or format error yields
    /// [`Finding::inconclusive`] for this pillar.
    pub async fn analyze(
        &self,
        pillar: &str,
        reference: &CorpusHandle,
        subject: &CorpusHandle,
    ) -> PillarAnalysis {
        let retrieved = async {
            let r = self.evidence.search(reference, pillar, self.k).await?;
            let s = self.evidence.search(subject, pillar, self.k).await?;
            Ok::<_, aegis_storage::StorageError>(evidence_block(&r, &s))
        };
        let evidence = match retrieved.await {
            Ok(block) => block,
            Err(err) => {
                tracing::warn!(pillar = %pillar, error = %err, "evidence retrieval failed");
                return PillarAnalysis {
                    finding: Finding::inconclusive(pillar),
                    evidence: evidence_block(&[], &[]),
                    grounded: false,
                };
            }
        };

        let finding = match self.llm.generate_json(&analysis_prompt(pillar, &evidence)).await {
            Ok(value) => Finding::from_model_output(pillar, &value).unwrap_or_else(|| {
                tracing::warn!(pillar = %pillar, output = %value, "malformed finding");
                Finding::inconclusive(pillar)
            }),
            Err(err) => {
                tracing::warn!(pillar = %pillar, error = %err, "pillar analysis failed");
                Finding::inconclusive(pillar)
            }
        };

        tracing::info!(
            pillar = %pillar,
            rating = %finding.rating,
            confidence = finding.confidence,
            "analyzed pillar"
        );
        PillarAnalysis {
            finding,
            evidence,
            grounded: true,
        }
    }
}
