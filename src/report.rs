//! Plain-text rendering of the dashboard

use std::fmt::Write;

use crate::dashboard::Dashboard;
use crate::insights::Trend;

/// Arrow shown next to an insight's indicator name
fn trend_symbol(trend: Trend) -> &'static str {
    match trend {
        Trend::Rise => "▲",
        Trend::Neutral => "■",
        Trend::Lower => "▼",
    }
}

fn format_optional(value: Option<f64>, precision: usize, suffix: &str) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.precision$}{suffix}"))
}

/// Renders the dashboard as a human-readable report
pub fn render_text(dashboard: &Dashboard) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Indicators");
    let _ = writeln!(out, "----------");
    for series in &dashboard.series {
        match series.points.first() {
            Some(latest) => {
                let volatility = dashboard
                    .statistics
                    .volatility
                    .get(&series.key)
                    .copied()
                    .flatten();
                let _ = writeln!(
                    out,
                    "{:<26} {:>12.2} {:<24} as of {:<10}  volatility {}",
                    series.label,
                    latest.value,
                    series.units,
                    latest.date,
                    format_optional(volatility, 1, "%")
                );
            }
            None => {
                let _ = writeln!(out, "{:<26} {:>12} (no data available)", series.label, "-");
            }
        }
    }

    if !dashboard.statistics.correlations.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Correlations");
        let _ = writeln!(out, "------------");
        for correlation in &dashboard.statistics.correlations {
            let _ = writeln!(
                out,
                "{:<20} vs {:<20} {}",
                correlation.a,
                correlation.b,
                format_optional(correlation.value, 2, "")
            );
        }
    }

    if !dashboard.insights.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Insights");
        let _ = writeln!(out, "--------");
        for insight in &dashboard.insights {
            let _ = writeln!(out, "{} {}", trend_symbol(insight.trend), insight.indicator);
            let _ = writeln!(out, "  {}", insight.summary);
            for driver in &insight.drivers {
                let _ = writeln!(out, "  - {driver}");
            }
            if !insight.forward_outlook.is_empty() {
                let _ = writeln!(out, "  Outlook: {}", insight.forward_outlook);
            }
        }
    }

    out
}
