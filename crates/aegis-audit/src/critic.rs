use crate::prompts::critique_prompt;
use crate::types::Finding;
use aegis_llm::CompletionService;
use std::sync::Arc;

/// One verification pass over a low-confidence finding.
pub struct Critic {
    llm: Arc<dyn CompletionService>,
}

impl Critic {
    pub fn new(llm: Arc<dyn CompletionService>) -> Self {
        Self { llm }
    }

    /// The corrected finding, whole, or `None` when correction failed and the
    /// original should stand.
    pub async fn critique(&self, pillar: &str, finding: &Finding, evidence: &str) -> Option<Finding> {
        let value = match self
            .llm
            .generate_json(&critique_prompt(pillar, finding, evidence))
            .await
        {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(pillar = %pillar, error = %err, "critique failed, keeping original");
                return None;
            }
        };

        let corrected = Finding::from_model_output(pillar, &value);
        match &corrected {
            Some(c) => tracing::info!(
                pillar = %pillar,
                before = finding.confidence,
                after = c.confidence,
                "finding corrected"
            ),
            None => tracing::warn!(pillar = %pillar, output = %value, "malformed critique, keeping original"),
        }
        corrected
    }
}
