//! Conversion of raw provider payloads into ordered data points

use serde_json::Value;
use tracing::debug;

use super::DataPoint;

/// Normalizes a raw `{"data": [{"date", "value"}, ...]}` payload
///
/// Returns an empty vector when the payload is absent or has no `data` array.
/// Items with an empty date or a value that is not a finite number are
/// dropped. Input order is preserved and duplicate dates are kept.
pub fn normalize(raw: Option<&Value>, key: &str) -> Vec<DataPoint> {
    let Some(items) = raw.and_then(|r| r.get("data")).and_then(Value::as_array) else {
        debug!(key, "payload has no data array");
        return Vec::new();
    };

    let mut points = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let date = item
            .get("date")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if date.is_empty() {
            debug!(key, index, "dropping item without a date");
            continue;
        }

        match item.get("value").and_then(parse_value) {
            Some(value) => points.push(DataPoint::new(date, value)),
            None => {
                let raw = item.get("value").cloned().unwrap_or_default();
                debug!(key, index, date, raw = %raw, "dropping non-numeric value");
            }
        }
    }

    points
}

/// Parses a provider value, which Alpha Vantage sends as a string ("." when missing)
fn parse_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_payload_yields_empty() {
        assert!(normalize(None, "wti").is_empty());
    }

    #[test]
    fn test_missing_or_non_array_data_yields_empty() {
        assert!(normalize(Some(&json!({})), "wti").is_empty());
        assert!(normalize(Some(&json!({"data": "nope"})), "wti").is_empty());
        assert!(normalize(Some(&json!({"data": {"date": "2024-01-01"}})), "wti").is_empty());
        assert!(normalize(Some(&json!({"Note": "rate limited"})), "wti").is_empty());
    }

    #[test]
    fn test_drops_non_numeric_value() {
        let raw = json!({
            "data": [
                {"date": "2024-01-01", "value": "70.5"},
                {"date": "2024-02-01", "value": "bad"}
            ]
        });

        let points = normalize(Some(&raw), "wti");

        assert_eq!(points, vec![DataPoint::new("2024-01-01", 70.5)]);
    }

    #[test]
    fn test_drops_exactly_the_invalid_items() {
        let raw = json!({
            "data": [
                {"date": "2024-01-01", "value": "1.0"},
                {"date": "", "value": "2.0"},
                {"date": "2024-03-01", "value": "."},
                {"value": "4.0"},
                {"date": "2024-05-01", "value": "NaN"},
                {"date": "2024-06-01", "value": "inf"},
                {"date": "2024-07-01", "value": null},
                {"date": "2024-08-01", "value": " 8.25 "}
            ]
        });

        let points = normalize(Some(&raw), "cpi");

        assert_eq!(points.len(), 2);
        assert_eq!(points[0], DataPoint::new("2024-01-01", 1.0));
        assert_eq!(points[1], DataPoint::new("2024-08-01", 8.25));
    }

    #[test]
    fn test_preserves_order_and_duplicates() {
        let raw = json!({
            "data": [
                {"date": "2024-03-01", "value": "3"},
                {"date": "2024-01-01", "value": "1"},
                {"date": "2024-03-01", "value": "3.5"}
            ]
        });

        let points = normalize(Some(&raw), "wti");
        let dates: Vec<_> = points.iter().map(|p| p.date.as_str()).collect();

        assert_eq!(dates, vec!["2024-03-01", "2024-01-01", "2024-03-01"]);
        assert_eq!(points[2].value, 3.5);
    }

    #[test]
    fn test_accepts_numeric_json_values() {
        let raw = json!({"data": [{"date": "2024", "value": 27360.9}]});

        let points = normalize(Some(&raw), "real_gdp");

        assert_eq!(points, vec![DataPoint::new("2024", 27360.9)]);
    }
}
