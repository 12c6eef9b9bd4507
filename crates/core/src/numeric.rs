//! Lenient numeric coercion for human-formatted values.

/// Parses a human-formatted numeric string.
///
/// Strips thousands separators and whitespace and applies trailing
/// `K`/`M`/`B` suffixes as ×1e3/1e6/1e9 multipliers. Returns `None` for
/// anything unparseable rather than erroring; a bad cell becomes a null,
/// not a failure.
#[must_use]
pub fn coerce_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let (body, multiplier) = match cleaned.chars().last() {
        Some('K' | 'k') => (&cleaned[..cleaned.len() - 1], 1e3),
        Some('M' | 'm') => (&cleaned[..cleaned.len() - 1], 1e6),
        Some('B' | 'b') => (&cleaned[..cleaned.len() - 1], 1e9),
        _ => (cleaned.as_str(), 1.0),
    };

    body.parse::<f64>().ok().map(|v| v * multiplier)
}

/// Extracts a numeric value out of a JSON cell that may be a number or a
/// human-formatted string.
#[must_use]
pub fn value_from_json(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => coerce_number(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_numbers() {
        assert_eq!(coerce_number("1234"), Some(1234.0));
        assert_eq!(coerce_number("1,234.5"), Some(1234.5));
        assert_eq!(coerce_number(" 12 345 "), Some(12345.0));
        assert_eq!(coerce_number("-42.5"), Some(-42.5));
    }

    #[test]
    fn test_unit_suffixes() {
        assert_eq!(coerce_number("1.5K"), Some(1500.0));
        assert_eq!(coerce_number("2M"), Some(2.0e6));
        assert_eq!(coerce_number("1.2B"), Some(1.2e9));
        assert_eq!(coerce_number("3,4b"), Some(34.0e9));
    }

    #[test]
    fn test_unparseable_becomes_none() {
        assert_eq!(coerce_number(""), None);
        assert_eq!(coerce_number("n/a"), None);
        assert_eq!(coerce_number("--"), None);
        assert_eq!(coerce_number("$"), None);
    }

    #[test]
    fn test_json_cells() {
        assert_eq!(value_from_json(&serde_json::json!(12.5)), Some(12.5));
        assert_eq!(value_from_json(&serde_json::json!("3.2B")), Some(3.2e9));
        assert_eq!(value_from_json(&serde_json::json!(null)), None);
        assert_eq!(value_from_json(&serde_json::json!([1, 2])), None);
    }
}
