use crate::analyzer::PillarAnalyzer;
use crate::assembler::ReportAssembler;
use crate::config::AuditConfig;
use crate::confidence::ConfidenceArbiter;
use crate::critic::Critic;
use crate::evidence::EvidenceSource;
use crate::planner::PlanGenerator;
use crate::types::AuditReport;
use crate::AuditError;
use aegis_llm::CompletionService;
use aegis_storage::CorpusHandle;
use chrono::Utc;
use std::sync::Arc;

/// End-to-end audit run: plan, analyze each pillar, critique, assemble.
pub struct Auditor {
    llm: Arc<dyn CompletionService>,
    evidence: Arc<dyn EvidenceSource>,
    config: AuditConfig,
}

impl Auditor {
    pub fn new(
        llm: Arc<dyn CompletionService>,
        evidence: Arc<dyn EvidenceSource>,
        config: AuditConfig,
    ) -> Self {
        Self {
            llm,
            evidence,
            config,
        }
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Fails only when documents are missing: a handle is absent or detached,
    /// or both corpora are empty. Every other failure degrades the report.
    pub async fn run(
        &self,
        reference: Option<&CorpusHandle>,
        subject: Option<&CorpusHandle>,
    ) -> Result<AuditReport, AuditError> {
        let (Some(reference), Some(subject)) = (reference, subject) else {
            return Err(AuditError::DocumentsUnavailable);
        };
        let (Some(reference_info), Some(subject_info)) =
            (self.evidence.info(reference), self.evidence.info(subject))
        else {
            return Err(AuditError::DocumentsUnavailable);
        };
        if reference_info.chunk_count == 0 && subject_info.chunk_count == 0 {
            return Err(AuditError::DocumentsUnavailable);
        }

        tracing::info!(
            session = %reference.session(),
            reference = %reference_info.document_name,
            subject = %subject_info.document_name,
            "starting audit"
        );

        let planner = PlanGenerator::new(
            Arc::clone(&self.llm),
            Arc::clone(&self.evidence),
            self.config.plan_sample_k,
            self.config.max_pillars,
        );
        let pillars = planner.generate_plan(reference, subject).await;

        let analyzer = PillarAnalyzer::new(
            Arc::clone(&self.llm),
            Arc::clone(&self.evidence),
            self.config.pillar_k,
        );
        let critic = Critic::new(Arc::clone(&self.llm));
        let assembler = ReportAssembler::new(
            ConfidenceArbiter::new(self.config.confidence_threshold),
            self.config.concurrency,
        );
        let findings = assembler
            .assemble(&pillars, reference, subject, &analyzer, &critic)
            .await;

        tracing::info!(
            pillars = pillars.len(),
            verified = findings.iter().filter(|f| f.verified).count(),
            inconclusive = findings.iter().filter(|f| f.finding.is_inconclusive()).count(),
            "audit complete"
        );

        Ok(AuditReport {
            session_id: reference.session(),
            reference_document: reference_info.document_name,
            subject_document: subject_info.document_name,
            generated_at: Utc::now(),
            model: self.llm.model_name().to_string(),
            pillars,
            findings,
        })
    }
}
