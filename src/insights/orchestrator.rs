//! Builds narrative insights from the latest indicator values

use std::collections::HashMap;

use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use super::client::{InsightError, NarrativeClient};
use super::parsing::parse_insights;
use super::InsightRecord;
use crate::data::{all_indicators, Category, Indicator, Series};

const SYSTEM_PROMPT: &str = r#"You are a professional economic analyst providing clear, balanced market insights for everyday users. Your analysis must be:

1. CONTEXT-APPROPRIATE LANGUAGE:
   - For UNEMPLOYMENT: Use empathetic, socially-aware language. Focus on economic and human impact. NEVER use investor slang like "bullish" or "bearish".
   - For CPI, INFLATION, GDP: Use standard economic terminology.
   - For ENERGY PRICES (Oil, Natural Gas): Use market-standard terminology (supply/demand dynamics).

2. TONE: Neutral, educational, accessible to non-experts. Avoid hype or promotional language.

3. OUTPUT FORMAT: You MUST return ONLY valid JSON matching this exact schema:

{
  "insights": [
    {
      "indicator": "string (exact name from input)",
      "summary": "string (2-3 sentences, clear explanation of current market context)",
      "trend": "rise | neutral | lower",
      "drivers": ["string", "string", ...] (3-5 key factors),
      "forward_outlook": "string (1-2 sentences, forward-looking expectation)"
    }
  ]
}

DO NOT include any text outside the JSON structure. DO NOT use markdown code blocks."#;

/// Latest values of one indicator, as supplied to the narrative client
///
/// `current_value` and `previous_value` are the first and second points of
/// the series. Alpha Vantage returns newest first, so these are normally the
/// two latest observations, but nothing here sorts them.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSummary {
    pub name: String,
    pub current_value: Option<f64>,
    pub previous_value: Option<f64>,
    pub units: String,
    pub category: Category,
}

impl IndicatorSummary {
    fn from_series(indicator: &Indicator, series: Option<&Series>) -> Self {
        match series {
            Some(series) => Self {
                name: series.label.clone(),
                current_value: series.current_value(),
                previous_value: series.previous_value(),
                units: series.units.clone(),
                category: indicator.category,
            },
            None => Self {
                name: indicator.label.to_string(),
                current_value: None,
                previous_value: None,
                units: indicator.units.to_string(),
                category: indicator.category,
            },
        }
    }

    /// Percent change from previous to current, when both exist and previous is non-zero
    pub fn percent_change(&self) -> Option<f64> {
        match (self.current_value, self.previous_value) {
            (Some(current), Some(previous)) if previous != 0.0 => {
                Some((current - previous) / previous * 100.0)
            }
            _ => None,
        }
    }

    /// One prompt line, e.g. `- Crude Oil (WTI) [energy]: 70.50 dollars per barrel (+1.2% change)`
    fn prompt_line(&self) -> String {
        let value = self
            .current_value
            .map_or_else(|| "N/A".to_string(), |v| format!("{v:.2}"));
        let change = self
            .percent_change()
            .map(|c| format!(" ({}{c:.1}% change)", if c > 0.0 { "+" } else { "" }))
            .unwrap_or_default();
        format!(
            "- {} [{}]: {} {}{}",
            self.name,
            self.category.as_str(),
            value,
            self.units,
            change
        )
    }
}

/// Summarizes indicators and asks a narrative client to explain them
pub struct InsightOrchestrator {
    client: Option<Box<dyn NarrativeClient>>,
    indicators: Vec<&'static Indicator>,
}

impl InsightOrchestrator {
    /// Creates an orchestrator over every tracked indicator
    ///
    /// With no client, every build returns an empty insight list.
    pub fn new(client: Option<Box<dyn NarrativeClient>>) -> Self {
        Self {
            client,
            indicators: all_indicators().iter().collect(),
        }
    }

    /// Restricts the orchestrator to a subset of indicators
    pub fn with_indicators(mut self, indicators: Vec<&'static Indicator>) -> Self {
        self.indicators = indicators;
        self
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// One summary per tracked indicator, in catalog order
    pub fn summarize(&self, series: &HashMap<String, Series>) -> Vec<IndicatorSummary> {
        self.indicators
            .iter()
            .map(|indicator| IndicatorSummary::from_series(indicator, series.get(indicator.key)))
            .collect()
    }

    /// Builds the user instruction for the given summaries
    pub fn user_prompt(summaries: &[IndicatorSummary], today: NaiveDate) -> String {
        let lines: Vec<String> = summaries.iter().map(IndicatorSummary::prompt_line).collect();
        format!(
            "Analyze the following economic indicators and provide insights for each using today's date ({}). \
             Consider recent economic news, trends, and market dynamics.\n\n\
             Indicators:\n{}\n\n\
             Return a JSON object with an \"insights\" array containing one object per indicator. \
             Each insight must follow the schema provided in the system prompt.",
            today.format("%Y-%m-%d"),
            lines.join("\n")
        )
    }

    /// Requests and parses insights, surfacing every failure as an error
    pub async fn try_build_insights_on(
        &self,
        series: &HashMap<String, Series>,
        today: NaiveDate,
    ) -> Result<Vec<InsightRecord>, InsightError> {
        let client = self.client.as_ref().ok_or(InsightError::MissingApiKey)?;

        let summaries = self.summarize(series);
        let user = Self::user_prompt(&summaries, today);
        let content = client.complete(SYSTEM_PROMPT, &user).await?;
        let insights = parse_insights(&content)?;

        info!(count = insights.len(), "received insights");
        Ok(insights)
    }

    /// Requests insights for today, returning an empty list on any failure
    pub async fn build_insights(&self, series: &HashMap<String, Series>) -> Vec<InsightRecord> {
        match self
            .try_build_insights_on(series, Local::now().date_naive())
            .await
        {
            Ok(insights) => insights,
            Err(e) => {
                warn!(error = %e, "returning empty insights");
                Vec::new()
            }
        }
    }
}
