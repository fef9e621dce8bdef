//! Parsing of narrative responses into insight records
//!
//! Language models sometimes wrap JSON in markdown fences even when told not
//! to. Fences are stripped first; everything after that is strict JSON.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::client::InsightError;
use super::{InsightRecord, Trend};

/// Insight as returned by the model, before validation
#[derive(Debug, Deserialize)]
struct RawInsight {
    indicator: Option<String>,
    summary: Option<String>,
    /// Kept untyped so a non-string trend still yields a record
    trend: Option<Value>,
    drivers: Option<Vec<String>>,
    forward_outlook: Option<String>,
}

impl RawInsight {
    /// Names of required fields that are missing or empty
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let blank = |field: &Option<String>| field.as_deref().map_or(true, str::is_empty);
        if blank(&self.indicator) {
            missing.push("indicator");
        }
        if blank(&self.summary) {
            missing.push("summary");
        }
        if self.trend_label().map_or(self.trend.is_none(), str::is_empty) {
            missing.push("trend");
        }
        if self.drivers.is_none() {
            missing.push("drivers");
        }
        if blank(&self.forward_outlook) {
            missing.push("forward_outlook");
        }
        missing
    }

    fn trend_label(&self) -> Option<&str> {
        self.trend.as_ref().and_then(Value::as_str)
    }

    /// True when a trend was given but is not one of the known labels
    fn has_unknown_trend(&self) -> bool {
        match (&self.trend, self.trend_label()) {
            (None, _) => false,
            (Some(_), Some("")) => false,
            (Some(_), label) => label.and_then(Trend::from_label).is_none(),
        }
    }

    fn into_record(self) -> InsightRecord {
        let trend = self
            .trend_label()
            .and_then(Trend::from_label)
            .unwrap_or_default();
        InsightRecord {
            indicator: self.indicator.unwrap_or_default(),
            summary: self.summary.unwrap_or_default(),
            trend,
            drivers: self.drivers.unwrap_or_default(),
            forward_outlook: self.forward_outlook.unwrap_or_default(),
        }
    }
}

/// Removes a surrounding ```` ``` ```` or ```` ```json ```` fence, if present
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Info string ("json"), if any
    let body = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parses a narrative response into insight records
///
/// Unknown trends are coerced to neutral and records with missing fields are
/// kept with a warning. Records whose fields have the wrong JSON type are
/// dropped.
pub fn parse_insights(content: &str) -> Result<Vec<InsightRecord>, InsightError> {
    let cleaned = strip_code_fences(content);
    let parsed: Value = serde_json::from_str(cleaned)?;

    let items = parsed
        .get("insights")
        .and_then(Value::as_array)
        .ok_or_else(|| InsightError::InvalidStructure("missing insights array".to_string()))?;

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let raw: RawInsight = match RawInsight::deserialize(item) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(index, error = %e, "dropping unreadable insight");
                continue;
            }
        };

        let missing = raw.missing_fields();
        if !missing.is_empty() {
            warn!(index, ?missing, "incomplete insight");
        }
        if raw.has_unknown_trend() {
            let trend = raw.trend.clone().unwrap_or_default();
            warn!(index, trend = %trend, "coercing unknown trend to neutral");
        }

        records.push(raw.into_record());
    }

    Ok(records)
}
