//! Catalog of tracked macroeconomic indicators
//!
//! Each indicator maps to one Alpha Vantage economic endpoint. The catalog is
//! fixed at compile time; the cache keys used on disk are the indicator keys.

use serde::Serialize;

/// Broad grouping used when asking for narrative insights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Energy,
    Economic,
    Monetary,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Energy => "energy",
            Category::Economic => "economic",
            Category::Monetary => "monetary",
        }
    }
}

/// A tracked indicator and the provider query that produces it
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Indicator {
    /// Stable identifier, also used as the cache key
    pub key: &'static str,
    /// Alpha Vantage `function` parameter
    pub function: &'static str,
    /// Optional `interval` parameter (monthly, annual, ...)
    pub interval: Option<&'static str>,
    /// Optional `maturity` parameter for treasury yields
    pub maturity: Option<&'static str>,
    /// Human-readable name
    pub label: &'static str,
    /// Default units, replaced by the payload's `unit` when it has one
    pub units: &'static str,
    /// Grouping for narrative tone
    pub category: Category,
}

const INDICATORS: [Indicator; 8] = [
    Indicator {
        key: "wti",
        function: "WTI",
        interval: Some("monthly"),
        maturity: None,
        label: "Crude Oil (WTI)",
        units: "dollars per barrel",
        category: Category::Energy,
    },
    Indicator {
        key: "natural_gas",
        function: "NATURAL_GAS",
        interval: Some("monthly"),
        maturity: None,
        label: "Natural Gas (Henry Hub)",
        units: "dollars per million BTU",
        category: Category::Energy,
    },
    Indicator {
        key: "cpi",
        function: "CPI",
        interval: Some("monthly"),
        maturity: None,
        label: "Consumer Price Index",
        units: "index 1982-1984=100",
        category: Category::Economic,
    },
    Indicator {
        key: "inflation",
        function: "INFLATION",
        interval: None,
        maturity: None,
        label: "Yearly Inflation",
        units: "percent",
        category: Category::Economic,
    },
    Indicator {
        key: "unemployment",
        function: "UNEMPLOYMENT",
        interval: None,
        maturity: None,
        label: "Unemployment Rate",
        units: "percent",
        category: Category::Economic,
    },
    Indicator {
        key: "real_gdp",
        function: "REAL_GDP",
        interval: Some("annual"),
        maturity: None,
        label: "Real GDP",
        units: "billions of dollars",
        category: Category::Economic,
    },
    Indicator {
        key: "federal_funds_rate",
        function: "FEDERAL_FUNDS_RATE",
        interval: Some("monthly"),
        maturity: None,
        label: "Federal Funds Rate",
        units: "percent",
        category: Category::Monetary,
    },
    Indicator {
        key: "treasury_yield",
        function: "TREASURY_YIELD",
        interval: Some("monthly"),
        maturity: Some("10year"),
        label: "10-Year Treasury Yield",
        units: "percent",
        category: Category::Monetary,
    },
];

/// Returns every tracked indicator in display order
pub fn all_indicators() -> &'static [Indicator] {
    &INDICATORS
}

/// Looks up an indicator by its key
pub fn get_indicator_by_key(key: &str) -> Option<&'static Indicator> {
    INDICATORS.iter().find(|i| i.key == key)
}
