//! Report rendering. Presentation only.

use crate::types::{AuditReport, Rating};
use std::fmt::Write;

pub const REPORT_TITLE: &str = "Aegis Audit: Compliance Verification Report";

/// Markdown document: executive summary, then one section per pillar.
pub fn to_markdown(report: &AuditReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {REPORT_TITLE}\n");

    let _ = writeln!(out, "## 1. Executive Summary\n");
    let _ = writeln!(out, "- **Reference document:** {}", report.reference_document);
    let _ = writeln!(out, "- **Subject document:** {}", report.subject_document);
    let _ = writeln!(out, "- **Session:** `{}`", report.session_id);
    let _ = writeln!(
        out,
        "- **Generated:** {} by `{}`",
        report.generated_at.format("%Y-%m-%d %H:%M UTC"),
        report.model
    );
    let tally: Vec<String> = report
        .risk_tally()
        .into_iter()
        .map(|(rating, n)| format!("{rating}: {n}"))
        .collect();
    let _ = writeln!(
        out,
        "- **Pillars audited:** {} ({})\n",
        report.findings.len(),
        tally.join(", ")
    );

    let _ = writeln!(out, "## 2. Detailed Findings & Remediation\n");
    for entry in &report.findings {
        let f = &entry.finding;
        let _ = writeln!(out, "### {}\n", f.pillar);
        let _ = writeln!(out, "**RISK LEVEL: {}** {}\n", f.rating, risk_marker(f.rating));
        let _ = writeln!(out, "**Finding:** {}\n", f.finding);
        let verified = if entry.verified { " | Verified" } else { "" };
        let _ = writeln!(
            out,
            "_Source: {} | Confidence: {}%{verified}_\n",
            f.citation, f.confidence
        );
        let _ = writeln!(out, "#### Remediation Plan\n");
        let _ = writeln!(out, "{}\n", f.remediation);
    }
    out
}

fn risk_marker(rating: Rating) -> &'static str {
    match rating {
        Rating::Critical | Rating::High => "🔴",
        Rating::Medium => "🟠",
        Rating::Low => "🟢",
    }
}

pub fn to_json(report: &AuditReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}
