//! Prompt templates.
//!
//! Each structured prompt names the exact JSON shape it expects; parsing on
//! our side stays lenient regardless.

use crate::types::Finding;

pub fn intent_prompt(query: &str) -> String {
    format!(
        r#"Classify the user's message into exactly one category.

CONVERSATION: greetings, small talk, general questions unrelated to any uploaded document.
DOCUMENT: anything about documents, contracts, policies, laws, clauses, compliance, or audits.

Reply with the single word CONVERSATION or DOCUMENT.

USER MESSAGE: {query}"#
    )
}

pub fn plan_prompt(max_pillars: usize, evidence: &str) -> String {
    format!(
        r#"You are planning a compliance audit of a SUBJECT document against a REFERENCE document.
Based on the excerpts below, propose exactly {max_pillars} audit pillars: distinct topics
on which the two documents should be compared (for example obligations, retention, termination).
Tailor the pillars to what these documents actually cover.

Return ONLY JSON of the form {{"pillars": ["<pillar>", ...]}}.

EXCERPTS:
{evidence}"#
    )
}

pub fn analysis_prompt(pillar: &str, evidence: &str) -> String {
    format!(
        r#"You are a compliance auditor. Compare the SUBJECT against the REFERENCE for one pillar,
using ONLY the evidence below. Do not rely on outside knowledge.

AUDIT PILLAR: {pillar}

EVIDENCE:
{evidence}

Return ONLY a JSON object:
{{
  "pillar": "{pillar}",
  "rating": "Low" | "Medium" | "High" | "Critical",
  "finding": "<gap or alignment, grounded in the evidence>",
  "remediation": "<concrete change to the subject document>",
  "confidence": <integer 0-100, how well the evidence supports the finding>,
  "citation": "<sections or passages relied on>"
}}"#
    )
}

pub fn critique_prompt(pillar: &str, finding: &Finding, evidence: &str) -> String {
    let original = serde_json::to_string_pretty(finding).unwrap_or_default();
    format!(
        r#"You are reviewing a compliance finding that was produced with low confidence.
Check every claim in the ORIGINAL FINDING against the EVIDENCE. Remove or correct anything the
evidence does not support, fix the rating if needed, and cite the passages that support it.

AUDIT PILLAR: {pillar}

ORIGINAL FINDING:
{original}

EVIDENCE:
{evidence}

Return ONLY the corrected finding as a JSON object with the keys
"pillar", "rating", "finding", "remediation", "confidence" (integer 0-100), "citation"."#
    )
}

pub fn grounded_answer_prompt(query: &str, context: &str) -> String {
    format!(
        r#"You are Aegis, a compliance assistant. Answer the question using ONLY the CONTEXT,
which holds excerpts from the REFERENCE (law, regulation, standard) and the SUBJECT
(internal policy, contract). Cite the source of each claim. If the context does not
contain the answer, say so instead of guessing.

CONTEXT:
{context}

QUESTION: {query}"#
    )
}

pub fn conversational_prompt(query: &str, documents_available: bool) -> String {
    let documents = if documents_available {
        "A reference and a subject document are loaded. This message is casual conversation, \
         so answer without quoting them."
    } else {
        "NO DOCUMENTS are available. If the user asks about documents, contracts, policies, \
         or an audit, say plainly that no documents have been uploaded yet and ask them to \
         upload a reference and a subject document. Never invent document contents."
    };
    format!(
        r#"You are Aegis, a friendly assistant that can also audit documents for compliance.
{documents}

USER MESSAGE: {query}"#
    )
}
