//! AI-written narrative insights for the tracked indicators
//!
//! The orchestrator summarizes the latest values, asks a narrative client to
//! describe them, and repairs whatever comes back into `InsightRecord`s.

mod client;
mod orchestrator;
mod parsing;

pub use client::{InsightError, NarrativeClient, PerplexityClient};
pub use orchestrator::{IndicatorSummary, InsightOrchestrator};
pub use parsing::{parse_insights, strip_code_fences};

use serde::{Deserialize, Deserializer, Serialize};

/// Coarse direction attached to an insight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rise,
    #[default]
    Neutral,
    Lower,
}

impl Trend {
    /// Parses a trend label, returning `None` for anything unrecognized
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "rise" => Some(Trend::Rise),
            "neutral" => Some(Trend::Neutral),
            "lower" => Some(Trend::Lower),
            _ => None,
        }
    }
}

// Unknown labels ("bullish", 1, ...) become Neutral instead of failing
impl<'de> Deserialize<'de> for Trend {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = serde_json::Value::deserialize(deserializer)?;
        Ok(label.as_str().and_then(Trend::from_label).unwrap_or_default())
    }
}

/// A narrative insight for one indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRecord {
    pub indicator: String,
    pub summary: String,
    pub trend: Trend,
    pub drivers: Vec<String>,
    pub forward_outlook: String,
}
