//! Findings and reports.

use crate::confidence::RawConfidence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Route taken for a user query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Conversational,
    EvidenceSeeking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rating {
    Low,
    Medium,
    High,
    Critical,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Critical, Rating::High, Rating::Medium, Rating::Low];

    /// Case-insensitive; unrecognized labels are `Medium`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Rating::Low,
            "high" => Rating::High,
            "critical" => Rating::Critical,
            _ => Rating::Medium,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Low => "Low",
            Rating::Medium => "Medium",
            Rating::High => "High",
            Rating::Critical => "Critical",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const INCONCLUSIVE_FINDING: &str =
    "Inconclusive: the analysis for this pillar could not be completed.";
pub const REVIEW_MANUALLY: &str = "Review manually.";
pub const NO_CITATION: &str = "N/A";

/// One analyzed pillar. `confidence` is always normalized to `0..=100`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub pillar: String,
    pub rating: Rating,
    pub finding: String,
    pub remediation: String,
    pub confidence: u8,
    pub citation: String,
}

impl Finding {
    /// Stand-in for a pillar whose analysis failed.
    pub fn inconclusive(pillar: &str) -> Self {
        Self {
            pillar: pillar.to_string(),
            rating: Rating::Low,
            finding: INCONCLUSIVE_FINDING.to_string(),
            remediation: REVIEW_MANUALLY.to_string(),
            confidence: 0,
            citation: NO_CITATION.to_string(),
        }
    }

    pub fn is_inconclusive(&self) -> bool {
        self.finding == INCONCLUSIVE_FINDING
    }

    /// Build a finding for `pillar` from model output.
    ///
    /// `rating` and `finding` are required; everything else has a default and
    /// `confidence` goes through [`RawConfidence`]. The pillar name always
    /// comes from the caller, never from the model. A one-element array is
    /// unwrapped since models sometimes return `[{...}]`.
    pub fn from_model_output(pillar: &str, value: &serde_json::Value) -> Option<Self> {
        let value = match value {
            serde_json::Value::Array(items) if items.len() == 1 => &items[0],
            other => other,
        };
        let raw: RawFinding = serde_json::from_value(value.clone()).ok()?;

        let finding = text(raw.finding)?;
        let rating = Rating::parse(&text(raw.rating)?);
        Some(Self {
            pillar: pillar.to_string(),
            rating,
            finding,
            remediation: text(raw.remediation).unwrap_or_else(|| REVIEW_MANUALLY.to_string()),
            confidence: raw.confidence.normalize(),
            citation: text(raw.citation).unwrap_or_else(|| NO_CITATION.to_string()),
        })
    }
}

#[derive(Deserialize)]
struct RawFinding {
    rating: Option<serde_json::Value>,
    finding: Option<serde_json::Value>,
    remediation: Option<serde_json::Value>,
    #[serde(default)]
    confidence: RawConfidence,
    citation: Option<serde_json::Value>,
}

/// Non-empty string form of a scalar; arrays of strings are joined.
fn text(value: Option<serde_json::Value>) -> Option<String> {
    let s = match value? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join("; "),
        _ => return None,
    };
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// A final finding plus whether the critique pass replaced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    #[serde(flatten)]
    pub finding: Finding,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub session_id: Uuid,
    pub reference_document: String,
    pub subject_document: String,
    pub generated_at: DateTime<Utc>,
    pub model: String,
    pub pillars: Vec<String>,
    pub findings: Vec<ReportEntry>,
}

impl AuditReport {
    /// Findings per rating, most severe first; zero counts included.
    pub fn risk_tally(&self) -> Vec<(Rating, usize)> {
        Rating::ALL
            .iter()
            .map(|r| {
                (
                    *r,
                    self.findings
                        .iter()
                        .filter(|e| e.finding.rating == *r)
                        .count(),
                )
            })
            .collect()
    }
}
