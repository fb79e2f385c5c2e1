use crate::prompts::intent_prompt;
use crate::types::Intent;
use aegis_llm::CompletionService;
use std::sync::Arc;

const CONVERSATIONAL_LABEL: &str = "conversation";

/// Single best-effort intent classification.
///
/// Anything but a clear conversational label, including a failed call, routes
/// to evidence.
pub struct IntentRouter {
    llm: Arc<dyn CompletionService>,
}

impl IntentRouter {
    pub fn new(llm: Arc<dyn CompletionService>) -> Self {
        Self { llm }
    }

    pub async fn classify(&self, query: &str) -> Intent {
        match self.llm.complete(&intent_prompt(query), &[]).await {
            Ok(label) => {
                let intent = parse_label(&label);
                tracing::debug!(label = %label.trim(), ?intent, "classified query");
                intent
            }
            Err(err) => {
                tracing::warn!(error = %err, "intent classification failed, routing to evidence");
                Intent::EvidenceSeeking
            }
        }
    }
}

fn parse_label(label: &str) -> Intent {
    if label.to_lowercase().contains(CONVERSATIONAL_LABEL) {
        Intent::Conversational
    } else {
        Intent::EvidenceSeeking
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_matching() {
        assert_eq!(parse_label("CONVERSATION"), Intent::Conversational);
        assert_eq!(parse_label("  Conversation.\n"), Intent::Conversational);
        assert_eq!(parse_label("DOCUMENT"), Intent::EvidenceSeeking);
        assert_eq!(parse_label(""), Intent::EvidenceSeeking);
    }
}
