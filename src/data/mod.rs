//! Core data models for econpulse
//!
//! This module contains the types used to represent macroeconomic time series
//! along with the indicator catalog, the payload normalizer, and the Alpha
//! Vantage client that feeds them.

pub mod indicators;
pub mod normalize;
pub mod provider;

pub use indicators::{all_indicators, get_indicator_by_key, Category, Indicator};
pub use normalize::normalize;
pub use provider::{ProviderClient, ProviderError, ProviderPayload};

use serde::{Deserialize, Serialize};

/// A single observation of an indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Observation date as reported by the provider (`YYYY-MM-DD` or `YYYY-MM`)
    pub date: String,
    /// Observed value, always finite
    pub value: f64,
}

impl DataPoint {
    pub fn new(date: impl Into<String>, value: f64) -> Self {
        Self {
            date: date.into(),
            value,
        }
    }
}

/// A normalized indicator time series
///
/// Points keep the order the provider returned them in (newest first for
/// Alpha Vantage). Statistics sort their own copy when they need to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Catalog key of the indicator (e.g. "wti")
    pub key: String,
    /// Human-readable name
    pub label: String,
    /// Units the values are expressed in
    pub units: String,
    /// Observations in provider order
    pub points: Vec<DataPoint>,
}

impl Series {
    /// Builds an empty series for an indicator whose data is unavailable
    pub fn empty(indicator: &Indicator) -> Self {
        Self {
            key: indicator.key.to_string(),
            label: indicator.label.to_string(),
            units: indicator.units.to_string(),
            points: Vec::new(),
        }
    }

    /// Value of the first point, the most recent one for newest-first providers
    pub fn current_value(&self) -> Option<f64> {
        self.points.first().map(|p| p.value)
    }

    /// Value of the second point
    pub fn previous_value(&self) -> Option<f64> {
        self.points.get(1).map(|p| p.value)
    }
}
