//! Summary statistics over normalized series
//!
//! Both functions are pure and sort internally, so results do not depend on
//! the order points arrive in.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::data::{DataPoint, Series};

/// Minimum number of observations (or shared dates) required for a statistic
pub const MIN_OBSERVATIONS: usize = 12;

/// Periods per year used to annualize monthly volatility
const PERIODS_PER_YEAR: f64 = 12.0;

/// Indicator pairs reported in the dashboard's correlation table
const CORRELATION_PAIRS: [(&str, &str); 5] = [
    ("wti", "natural_gas"),
    ("wti", "cpi"),
    ("cpi", "federal_funds_rate"),
    ("unemployment", "federal_funds_rate"),
    ("treasury_yield", "federal_funds_rate"),
];

/// Pearson correlation of two series over the dates they share
///
/// Returns `None` when fewer than 12 dates are common to both series, and
/// `Some(0.0)` when either side has no variance over those dates. When a
/// series repeats a date, the largest value for that date is used.
pub fn correlate(a: &[DataPoint], b: &[DataPoint]) -> Option<f64> {
    let a_by_date = by_date(a);
    let b_by_date = by_date(b);

    // BTreeMap iteration is already in lexicographic date order
    let pairs: Vec<(f64, f64)> = a_by_date
        .iter()
        .filter_map(|(date, x)| b_by_date.get(date).map(|y| (*x, *y)))
        .collect();

    if pairs.len() < MIN_OBSERVATIONS {
        return None;
    }

    let n = pairs.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2, mut sum_y2) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
        sum_y2 += y * y;
    }

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x * sum_x) * (n * sum_y2 - sum_y * sum_y)).sqrt();

    // Rounding can push a zero variance slightly negative, which sqrt turns into NaN
    if denominator == 0.0 || denominator.is_nan() {
        return Some(0.0);
    }

    Some(numerator / denominator)
}

/// One value per date, keeping the largest when a date repeats
fn by_date(points: &[DataPoint]) -> BTreeMap<&str, f64> {
    let mut map = BTreeMap::new();
    for point in points {
        map.entry(point.date.as_str())
            .and_modify(|v: &mut f64| {
                if point.value.total_cmp(v).is_gt() {
                    *v = point.value;
                }
            })
            .or_insert(point.value);
    }
    map
}

/// Annualized volatility of period-over-period changes, as a percentage
///
/// Points are sorted by date (then value), steps from a zero value are skipped, and the
/// population standard deviation of the remaining changes is scaled by
/// `sqrt(12) * 100`. Returns `None` for fewer than 12 points or when no
/// change could be computed.
pub fn volatility(series: &[DataPoint]) -> Option<f64> {
    if series.len() < MIN_OBSERVATIONS {
        return None;
    }

    let mut sorted: Vec<&DataPoint> = series.iter().collect();
    // Repeated dates are ordered by value
    sorted.sort_by(|a, b| a.date.cmp(&b.date).then(a.value.total_cmp(&b.value)));

    let changes: Vec<f64> = sorted
        .windows(2)
        .filter(|w| w[0].value != 0.0)
        .map(|w| (w[1].value - w[0].value) / w[0].value)
        .collect();

    if changes.is_empty() {
        return None;
    }

    let n = changes.len() as f64;
    let mean = changes.iter().sum::<f64>() / n;
    let variance = changes.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n;

    Some(variance.sqrt() * PERIODS_PER_YEAR.sqrt() * 100.0)
}

/// Correlation between two indicators, `None` when overlap is insufficient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correlation {
    pub a: String,
    pub b: String,
    pub value: Option<f64>,
}

/// Statistics block attached to the dashboard payload
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    /// Annualized volatility per indicator key
    pub volatility: BTreeMap<String, Option<f64>>,
    /// Correlations for the fixed indicator pairs that are present
    pub correlations: Vec<Correlation>,
}

/// Computes volatility for every series and the fixed correlation pairs
pub fn summarize(series: &[Series]) -> Statistics {
    let by_key: HashMap<&str, &Series> = series.iter().map(|s| (s.key.as_str(), s)).collect();

    let volatility = series
        .iter()
        .map(|s| (s.key.clone(), volatility(&s.points)))
        .collect();

    let correlations = CORRELATION_PAIRS
        .iter()
        .filter_map(|(a, b)| {
            let (sa, sb) = (by_key.get(a)?, by_key.get(b)?);
            Some(Correlation {
                a: a.to_string(),
                b: b.to_string(),
                value: correlate(&sa.points, &sb.points),
            })
        })
        .collect();

    Statistics {
        volatility,
        correlations,
    }
}
