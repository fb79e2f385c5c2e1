//! Confidence arbitration.
//!
//! Models report confidence as numbers, percentage strings, or words. Every
//! shape is parsed once into [`RawConfidence`] and normalized here; nothing
//! downstream looks at the raw value.

use serde::{Deserialize, Serialize};

pub const NEUTRAL_CONFIDENCE: u8 = 50;
pub const DEFAULT_CONFIDENCE_THRESHOLD: u8 = 80;

/// Confidence exactly as the model produced it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawConfidence {
    Number(f64),
    Text(String),
    /// Absent or `null`
    #[default]
    Missing,
    Other(serde_json::Value),
}

impl RawConfidence {
    pub fn from_value(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(RawConfidence::Other(value.clone()))
    }

    /// Integer in `0..=100`. Total: unknown shapes score [`NEUTRAL_CONFIDENCE`].
    pub fn normalize(&self) -> u8 {
        match self {
            RawConfidence::Number(n) => from_number(*n),
            RawConfidence::Text(s) => from_text(s),
            RawConfidence::Missing | RawConfidence::Other(_) => NEUTRAL_CONFIDENCE,
        }
    }
}

impl From<i64> for RawConfidence {
    fn from(n: i64) -> Self {
        RawConfidence::Number(n as f64)
    }
}

impl From<&str> for RawConfidence {
    fn from(s: &str) -> Self {
        RawConfidence::Text(s.to_string())
    }
}

impl<T: Into<RawConfidence>> From<Option<T>> for RawConfidence {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(RawConfidence::Missing)
    }
}

fn from_number(n: f64) -> u8 {
    if !n.is_finite() {
        return NEUTRAL_CONFIDENCE;
    }
    n.round().clamp(0.0, 100.0) as u8
}

fn from_text(s: &str) -> u8 {
    let trimmed = s.trim();
    let numeric = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    if let Ok(n) = numeric.parse::<f64>() {
        if n.is_finite() {
            return from_number(n);
        }
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "critical" | "very high" => 95,
        "high" => 90,
        "medium" | "moderate" => 50,
        "low" => 25,
        _ => NEUTRAL_CONFIDENCE,
    }
}

/// Decides which findings go through the critique pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidenceArbiter {
    threshold: u8,
}

impl Default for ConfidenceArbiter {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl ConfidenceArbiter {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn normalize(raw: impl Into<RawConfidence>) -> u8 {
        raw.into().normalize()
    }

    /// Strictly below the threshold.
    pub fn requires_critique(&self, confidence: u8) -> bool {
        confidence < self.threshold
    }
}
