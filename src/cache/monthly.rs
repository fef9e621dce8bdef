//! Month-scoped cache for narrative insights
//!
//! Insights are expensive and change slowly, so they are refreshed at most
//! once a month, and only during the last three days of it. Outside that
//! window the previous month's insights keep being served.

use std::fmt::Display;
use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::store::{read_json, write_json};
use crate::insights::InsightRecord;

/// File name of the insight cache document
pub const INSIGHT_CACHE_FILE: &str = "insights.json";

/// Number of trailing days in a month during which a refresh may happen
const REFRESH_WINDOW_DAYS: u32 = 3;

/// Insights together with the month they were generated in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyInsightCache {
    pub insights: Vec<InsightRecord>,
    /// 1-12
    pub cached_month: u32,
    pub cached_year: i32,
}

impl MonthlyInsightCache {
    pub fn new(insights: Vec<InsightRecord>, date: NaiveDate) -> Self {
        Self {
            insights,
            cached_month: date.month(),
            cached_year: date.year(),
        }
    }

    fn is_from_month_of(&self, date: NaiveDate) -> bool {
        self.cached_month == date.month() && self.cached_year == date.year()
    }
}

/// Number of days in the given month, or 0 for an invalid month
pub fn days_in_month(year: i32, month: u32) -> u32 {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next| next.pred_opt())
        .map_or(0, |last| last.day())
}

/// Whether `date` falls within the last three days of its month
pub fn is_refresh_window(date: NaiveDate) -> bool {
    date.day() + (REFRESH_WINDOW_DAYS - 1) >= days_in_month(date.year(), date.month())
}

/// Whether cached insights should be regenerated on `today`
///
/// Missing or unreadable caches always refresh. Otherwise a refresh happens
/// only when the cache is from another month and today is in the refresh
/// window.
pub fn needs_refresh(cached: Option<&MonthlyInsightCache>, today: NaiveDate) -> bool {
    match cached {
        None => true,
        Some(cached) => !cached.is_from_month_of(today) && is_refresh_window(today),
    }
}

/// File-backed monthly insight cache
#[derive(Debug, Clone)]
pub struct InsightCache {
    path: PathBuf,
}

impl InsightCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates an InsightCache whose document lives in the given directory
    pub fn with_dir(cache_dir: &Path) -> Self {
        Self::new(cache_dir.join(INSIGHT_CACHE_FILE))
    }

    /// Loads the cached insights, `None` when missing or corrupt
    pub async fn load(&self) -> Option<MonthlyInsightCache> {
        read_json(&self.path).await
    }

    /// Returns cached insights, refreshing them when the monthly policy allows
    pub async fn get_or_refresh<F, Fut, E>(&self, refresh: F) -> Vec<InsightRecord>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<InsightRecord>, E>>,
        E: Display,
    {
        self.get_or_refresh_on(Local::now().date_naive(), refresh).await
    }

    /// Same as `get_or_refresh`, evaluated on the given day
    ///
    /// A refresh that fails or yields no insights falls back to the old
    /// cached insights, or an empty list when there are none.
    pub async fn get_or_refresh_on<F, Fut, E>(
        &self,
        today: NaiveDate,
        refresh: F,
    ) -> Vec<InsightRecord>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<InsightRecord>, E>>,
        E: Display,
    {
        let cached = self.load().await;

        if !needs_refresh(cached.as_ref(), today) {
            debug!("serving cached insights");
            return cached.map(|c| c.insights).unwrap_or_default();
        }

        let fallback = |reason: &str| {
            warn!(reason, has_cached = cached.is_some(), "insight refresh failed");
            cached.clone().map(|c| c.insights).unwrap_or_default()
        };

        match refresh().await {
            Ok(insights) if !insights.is_empty() => {
                let entry = MonthlyInsightCache::new(insights, today);
                match write_json(&self.path, &entry).await {
                    Ok(()) => info!(
                        month = entry.cached_month,
                        year = entry.cached_year,
                        "cached insights"
                    ),
                    Err(e) => warn!(error = %e, "failed to persist insights"),
                }
                entry.insights
            }
            Ok(_) => fallback("no insights returned"),
            Err(e) => fallback(&e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::Trend;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn record(indicator: &str) -> InsightRecord {
        InsightRecord {
            indicator: indicator.to_string(),
            summary: "Summary.".to_string(),
            trend: Trend::Rise,
            drivers: vec!["Demand".to_string()],
            forward_outlook: "Outlook.".to_string(),
        }
    }

    fn create_test_cache() -> (InsightCache, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = InsightCache::with_dir(temp_dir.path());
        (cache, temp_dir)
    }

    async fn ok(insights: Vec<InsightRecord>) -> Result<Vec<InsightRecord>, String> {
        Ok(insights)
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 1), 31);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(days_in_month(2023, 11), 30);
        assert_eq!(days_in_month(2024, 13), 0);
    }

    #[test]
    fn test_refresh_window_is_last_three_days() {
        assert!(!is_refresh_window(date(2024, 1, 28)));
        assert!(is_refresh_window(date(2024, 1, 29)));
        assert!(is_refresh_window(date(2024, 1, 31)));
        assert!(!is_refresh_window(date(2024, 4, 27)));
        assert!(is_refresh_window(date(2024, 4, 28)));
        assert!(is_refresh_window(date(2024, 2, 27)));
        assert!(!is_refresh_window(date(2023, 2, 25)));
        assert!(is_refresh_window(date(2023, 2, 26)));
    }

    #[test]
    fn test_needs_refresh_policy() {
        let march = MonthlyInsightCache::new(vec![record("CPI")], date(2024, 3, 30));

        assert!(needs_refresh(None, date(2024, 4, 10)));
        // Same month never refreshes, even in the window
        assert!(!needs_refresh(Some(&march), date(2024, 3, 31)));
        // Older month outside the window keeps serving
        assert!(!needs_refresh(Some(&march), date(2024, 4, 10)));
        // Older month inside the window refreshes
        assert!(needs_refresh(Some(&march), date(2024, 4, 28)));
        // Same month number in another year counts as older
        assert!(needs_refresh(Some(&march), date(2025, 3, 29)));
    }

    #[tokio::test]
    async fn test_missing_cache_refreshes_and_persists() {
        let (cache, _temp_dir) = create_test_cache();

        let insights = cache
            .get_or_refresh_on(date(2024, 4, 10), || ok(vec![record("CPI")]))
            .await;

        assert_eq!(insights, vec![record("CPI")]);
        let stored = cache.load().await.expect("insights should be persisted");
        assert_eq!(stored.cached_month, 4);
        assert_eq!(stored.cached_year, 2024);
    }

    #[tokio::test]
    async fn test_outside_window_serves_old_month_without_refreshing() {
        let (cache, _temp_dir) = create_test_cache();
        cache
            .get_or_refresh_on(date(2024, 3, 30), || ok(vec![record("March")]))
            .await;

        let calls = AtomicUsize::new(0);
        let insights = cache
            .get_or_refresh_on(date(2024, 4, 10), || {
                calls.fetch_add(1, Ordering::SeqCst);
                ok(vec![record("April")])
            })
            .await;

        assert_eq!(insights, vec![record("March")]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_inside_window_refreshes_old_month() {
        let (cache, _temp_dir) = create_test_cache();
        cache
            .get_or_refresh_on(date(2024, 3, 30), || ok(vec![record("March")]))
            .await;

        let insights = cache
            .get_or_refresh_on(date(2024, 4, 29), || ok(vec![record("April")]))
            .await;

        assert_eq!(insights, vec![record("April")]);
        assert_eq!(cache.load().await.unwrap().cached_month, 4);
    }

    #[tokio::test]
    async fn test_failed_refresh_falls_back_to_old_insights() {
        let (cache, _temp_dir) = create_test_cache();
        cache
            .get_or_refresh_on(date(2024, 3, 30), || ok(vec![record("March")]))
            .await;

        let failed = cache
            .get_or_refresh_on(date(2024, 4, 29), || async {
                Err::<Vec<InsightRecord>, _>("timeout")
            })
            .await;
        assert_eq!(failed, vec![record("March")]);

        let empty = cache
            .get_or_refresh_on(date(2024, 4, 29), || ok(Vec::new()))
            .await;
        assert_eq!(empty, vec![record("March")]);
        assert_eq!(cache.load().await.unwrap().cached_month, 3, "old cache kept");
    }

    #[tokio::test]
    async fn test_failed_refresh_without_cache_is_empty() {
        let (cache, _temp_dir) = create_test_cache();

        let insights = cache
            .get_or_refresh_on(date(2024, 4, 29), || async {
                Err::<Vec<InsightRecord>, _>("timeout")
            })
            .await;

        assert!(insights.is_empty());
        assert!(cache.load().await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_cache_refreshes() {
        let (cache, temp_dir) = create_test_cache();
        std::fs::write(temp_dir.path().join(INSIGHT_CACHE_FILE), "[[[").unwrap();

        let insights = cache
            .get_or_refresh_on(date(2024, 4, 10), || ok(vec![record("CPI")]))
            .await;

        assert_eq!(insights, vec![record("CPI")]);
    }

    #[tokio::test]
    async fn test_cached_unknown_trend_loads_as_neutral() {
        let (cache, temp_dir) = create_test_cache();
        let document = r#"{
            "insights": [{
                "indicator": "CPI",
                "summary": "s",
                "trend": "bearish",
                "drivers": [],
                "forward_outlook": "o"
            }],
            "cachedMonth": 4,
            "cachedYear": 2024
        }"#;
        std::fs::write(temp_dir.path().join(INSIGHT_CACHE_FILE), document).unwrap();

        let stored = cache.load().await.expect("document should parse");

        assert_eq!(stored.insights[0].trend, Trend::Neutral);
    }
}
