//! Aegis Audit: agentic compliance-audit orchestrator
//!
//! Compares a **reference** corpus (law, regulation, standard) against a
//! **subject** corpus (internal policy, contract) and answers questions about
//! both.
//!
//! ## Control flow
//!
//! ```text
//!                    ┌──────────────┐
//!   user query ─────►│ IntentRouter │
//!                    └──────┬───────┘
//!          CONVERSATIONAL   │   EVIDENCE_SEEKING
//!        ┌──────────────────┴───────────────────┐
//!        ▼                                      ▼
//!  ┌────────────┐                      ┌────────────────┐
//!  │ Completion │◄──── context ────────│ EvidenceSource │
//!  │  (stream)  │                      └────────────────┘
//!  └────────────┘
//!
//!   audit run:
//!  ┌───────────────┐   pillars   ┌─────────────────────────────────────────┐
//!  │ PlanGenerator │────────────►│ ReportAssembler (per pillar, in order)  │
//!  └───────────────┘             │   PillarAnalyzer ─► ConfidenceArbiter   │
//!                                │        └─ < threshold ─► Critic (once)  │
//!                                └──────────────────┬──────────────────────┘
//!                                                   ▼
//!                                              AuditReport ─► export
//! ```
//!
//! ## Failure policy
//! - Format and shape failures recover locally: default pillar list, fallback
//!   finding, neutral confidence.
//! - A failing pillar is marked inconclusive; the run continues.
//! - A failing critique keeps the original finding.
//! - Only missing documents abort a run ([`AuditError::DocumentsUnavailable`]).

pub mod analyzer;
pub mod answer;
pub mod assembler;
pub mod auditor;
pub mod config;
pub mod confidence;
pub mod critic;
pub mod evidence;
pub mod export;
pub mod planner;
pub mod prompts;
pub mod router;
pub mod session;
pub mod types;

pub use analyzer::{PillarAnalysis, PillarAnalyzer};
pub use answer::{AnswerStream, Assistant};
pub use assembler::{Analyze, Critique, ReportAssembler};
pub use auditor::Auditor;
pub use config::AuditConfig;
pub use confidence::{ConfidenceArbiter, RawConfidence};
pub use critic::Critic;
pub use evidence::{EvidenceFragment, EvidenceSource};
pub use planner::{PlanGenerator, DEFAULT_PILLARS};
pub use router::IntentRouter;
pub use session::ChatSession;
pub use types::{AuditReport, Finding, Intent, Rating, ReportEntry};

use aegis_llm::LlmError;
use aegis_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("documents not available: upload both a reference and a subject document")]
    DocumentsUnavailable,
    #[error("completion service error: {0}")]
    Completion(#[from] LlmError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
