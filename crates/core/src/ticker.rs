//! Ticker symbol validation and normalization.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::TickerError;

/// 1-5 letters, optional dash-letter class suffix, optional dot-letter.
static TICKER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{1,5}(-[A-Z])?(\.[A-Z])?$").unwrap());

/// Common dot-notation symbols that exchanges list with a dash.
const CORRECTIONS: &[(&str, &str)] = &[
    ("BRK.A", "BRK-A"),
    ("BRK.B", "BRK-B"),
    ("BF.A", "BF-A"),
    ("BF.B", "BF-B"),
];

/// Normalizes raw ticker input.
///
/// Uppercases and trims, applies known dot→dash corrections, and rejects
/// input that cannot be a symbol. Returns the normalized ticker together
/// with any warnings (e.g. a correction that was applied).
pub fn normalize_ticker(raw: &str) -> Result<(String, Vec<String>), TickerError> {
    let mut warnings = Vec::new();
    let mut ticker = raw.trim().to_ascii_uppercase();

    if ticker.is_empty() {
        return Err(TickerError::Empty);
    }
    if ticker.len() > 10 || ticker.contains(' ') {
        return Err(TickerError::Invalid(raw.to_string()));
    }

    if let Some((from, to)) = CORRECTIONS.iter().find(|(from, _)| *from == ticker) {
        warnings.push(format!("corrected {from} to {to}"));
        ticker = (*to).to_string();
    }

    if !TICKER_PATTERN.is_match(&ticker) {
        return Err(TickerError::Invalid(raw.to_string()));
    }

    Ok((ticker, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_normalization() {
        let (ticker, warnings) = normalize_ticker("  aapl ").unwrap();
        assert_eq!(ticker, "AAPL");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_dot_to_dash_correction() {
        let (ticker, warnings) = normalize_ticker("brk.b").unwrap();
        assert_eq!(ticker, "BRK-B");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_rejects_empty_and_junk() {
        assert_eq!(normalize_ticker("   "), Err(TickerError::Empty));
        assert!(matches!(
            normalize_ticker("not a ticker"),
            Err(TickerError::Invalid(_))
        ));
        assert!(matches!(
            normalize_ticker("TOOLONGSYMBOL"),
            Err(TickerError::Invalid(_))
        ));
        assert!(matches!(normalize_ticker("1234"), Err(TickerError::Invalid(_))));
    }

    #[test]
    fn test_dash_class_accepted() {
        let (ticker, warnings) = normalize_ticker("BF-A").unwrap();
        assert_eq!(ticker, "BF-A");
        assert!(warnings.is_empty());
    }
}
