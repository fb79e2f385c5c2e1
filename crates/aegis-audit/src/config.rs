use crate::confidence::DEFAULT_CONFIDENCE_THRESHOLD;
use serde::{Deserialize, Serialize};

/// Retrieval depths and gates for one orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Fragments sampled per corpus when proposing the plan
    pub plan_sample_k: usize,
    /// Fragments retrieved per corpus for each pillar
    pub pillar_k: usize,
    /// Fragments retrieved per corpus for a grounded answer
    pub answer_k: usize,
    pub max_pillars: usize,
    /// Findings strictly below this go through one critique pass
    pub confidence_threshold: u8,
    /// Pillars analyzed at once; output order is unaffected
    pub concurrency: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            plan_sample_k: 3,
            pillar_k: 5,
            answer_k: 6,
            max_pillars: 8,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            concurrency: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: AuditConfig = serde_json::from_str(r#"{"concurrency": 4}"#).unwrap();
        assert_eq!(cfg.concurrency, 4);
        assert_eq!(cfg.pillar_k, 5);
        assert_eq!(cfg.confidence_threshold, 80);
    }
}
