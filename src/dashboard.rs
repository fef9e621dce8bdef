//! Per-run pipeline producing the dashboard payload
//!
//! Indicators are fetched one after another through the cache, normalized,
//! summarized, and finally narrated. A failure in any one step degrades that
//! part of the payload to empty and never aborts the rest.

use std::collections::HashMap;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::cache::{CacheStore, InsightCache};
use crate::data::{all_indicators, normalize, Indicator, ProviderClient, ProviderPayload, Series};
use crate::insights::{InsightOrchestrator, InsightRecord};
use crate::stats::{summarize, Statistics};

/// Everything the renderer needs
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dashboard {
    pub series: Vec<Series>,
    pub insights: Vec<InsightRecord>,
    pub statistics: Statistics,
}

/// Loads indicator data and insights for one run
pub struct DashboardLoader {
    provider: ProviderClient,
    cache: CacheStore,
    insight_cache: InsightCache,
    orchestrator: Option<InsightOrchestrator>,
    indicators: Vec<&'static Indicator>,
}

impl DashboardLoader {
    /// Creates a loader over every tracked indicator
    ///
    /// Pass `None` as the orchestrator to skip insights entirely.
    pub fn new(
        provider: ProviderClient,
        cache: CacheStore,
        insight_cache: InsightCache,
        orchestrator: Option<InsightOrchestrator>,
    ) -> Self {
        Self {
            provider,
            cache,
            insight_cache,
            orchestrator,
            indicators: all_indicators().iter().collect(),
        }
    }

    /// Restricts the loader to a subset of indicators
    pub fn with_indicators(mut self, indicators: Vec<&'static Indicator>) -> Self {
        self.indicators = indicators;
        self
    }

    /// Runs the whole pipeline for today
    pub async fn load(&self) -> Dashboard {
        self.load_on(Local::now().date_naive()).await
    }

    /// Runs the whole pipeline as of the given day
    pub async fn load_on(&self, today: NaiveDate) -> Dashboard {
        let series = self.load_series().await;
        let statistics = summarize(&series);
        let insights = self.load_insights(&series, today).await;

        Dashboard {
            series,
            insights,
            statistics,
        }
    }

    /// Fetches every indicator sequentially to respect provider limits
    pub async fn load_series(&self) -> Vec<Series> {
        let mut series = Vec::with_capacity(self.indicators.len());
        for indicator in &self.indicators {
            series.push(self.load_indicator(indicator).await);
        }
        info!(
            loaded = series.iter().filter(|s| !s.points.is_empty()).count(),
            total = series.len(),
            "indicators loaded"
        );
        series
    }

    /// Fetches one indicator, returning an empty series when no usable data exists
    async fn load_indicator(&self, indicator: &Indicator) -> Series {
        let outcome = self
            .cache
            .get_or_fetch(indicator.key, || self.provider.fetch(indicator))
            .await;

        match outcome {
            Some(ProviderPayload::Ok(raw)) => series_from_payload(indicator, &raw),
            _ => {
                debug!(indicator = indicator.key, "no usable data");
                Series::empty(indicator)
            }
        }
    }

    async fn load_insights(&self, series: &[Series], today: NaiveDate) -> Vec<InsightRecord> {
        let Some(orchestrator) = &self.orchestrator else {
            return Vec::new();
        };

        let by_key: HashMap<String, Series> =
            series.iter().map(|s| (s.key.clone(), s.clone())).collect();

        self.insight_cache
            .get_or_refresh_on(today, || orchestrator.try_build_insights_on(&by_key, today))
            .await
    }
}

/// Builds a series from a usable payload, preferring the payload's own units
pub fn series_from_payload(indicator: &Indicator, raw: &Value) -> Series {
    let units = raw
        .get("unit")
        .and_then(Value::as_str)
        .filter(|u| !u.trim().is_empty())
        .unwrap_or(indicator.units);

    Series {
        key: indicator.key.to_string(),
        label: indicator.label.to_string(),
        units: units.to_string(),
        points: normalize(Some(raw), indicator.key),
    }
}
