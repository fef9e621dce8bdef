//! Cache module for storing API responses to disk
//!
//! Indicator payloads live in one JSON document with a 24-hour TTL and are
//! served stale whenever a refresh fails or the provider rejects it.
//! Narrative insights live in a second document refreshed on a monthly
//! schedule.

mod manager;
mod monthly;
mod store;

pub use manager::{
    default_cache_dir, CacheStore, FreshnessPolicy, INDICATOR_CACHE_FILE, INDICATOR_TTL_HOURS,
};
pub use monthly::{
    days_in_month, is_refresh_window, needs_refresh, InsightCache, MonthlyInsightCache,
    INSIGHT_CACHE_FILE,
};
pub use store::{CacheDocument, CacheError, FileStore, KeyValueStore};
