//! Tier extractors, ordered by assumed reliability.
//!
//! Each tier turns one kind of source into [`TierData`]. Tiers are
//! independent; the cascade decides the order and stops at the first one
//! that yields records.

mod cache;
mod facts;
mod filing;
mod transcript;

pub use cache::CacheTierExtractor;
pub use facts::FactsExtractor;
pub use filing::FilingTierExtractor;
pub use transcript::TranscriptTierExtractor;

use finfacts_core::{PeriodRecord, Quarter, MAX_ANNUAL_PERIODS, MAX_QUARTERLY_PERIODS};

/// Multiplier for a spelled-out unit word captured by a text pattern.
pub(crate) fn unit_multiplier(unit: &str) -> f64 {
    match unit.to_ascii_lowercase().as_str() {
        "thousand" => 1e3,
        "million" => 1e6,
        "billion" => 1e9,
        _ => 1.0,
    }
}

/// Finds a 4-digit year inside `text`, or in a small context window around
/// `span` when the match itself carries no year.
pub(crate) fn find_year_near(text: &str, span: std::ops::Range<usize>) -> Option<i32> {
    static YEAR: std::sync::LazyLock<regex::Regex> =
        std::sync::LazyLock::new(|| regex::Regex::new(r"\b(19|20)\d{2}\b").unwrap());

    let matched = &text[span.clone()];
    if let Some(m) = YEAR.find(matched) {
        return m.as_str().parse().ok();
    }

    // Look up to 120 bytes around the match, clamped to char boundaries.
    let mut start = span.start.saturating_sub(120);
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = usize::min(span.end + 120, text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    YEAR.find(&text[start..end])
        .and_then(|m| m.as_str().parse().ok())
}

/// Resolves a fiscal quarter from period phrasing in `text` near `span`:
/// an explicit `Q1`..`Q4`, an ordinal ("third quarter"), or a period-end
/// month-and-day mapped to its calendar quarter. Returns `None` when no
/// quarter reference is found; a quarterly figure without one must be
/// dropped rather than emitted with a null quarter, which downstream
/// schemas read as an annual period.
pub(crate) fn quarter_near(text: &str, span: std::ops::Range<usize>) -> Option<Quarter> {
    static QUARTER: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
        regex::Regex::new(
            r"(?i)\bq([1-4])\b|\b(first|second|third|fourth)\s+quarter\b|\b(january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2}\b",
        )
        .unwrap()
    });

    fn resolve(caps: &regex::Captures<'_>) -> Option<Quarter> {
        if let Some(digit) = caps.get(1) {
            return Quarter::parse(&format!("Q{}", digit.as_str()));
        }
        if let Some(ordinal) = caps.get(2) {
            return match ordinal.as_str().to_ascii_lowercase().as_str() {
                "first" => Some(Quarter::Q1),
                "second" => Some(Quarter::Q2),
                "third" => Some(Quarter::Q3),
                "fourth" => Some(Quarter::Q4),
                _ => None,
            };
        }
        let month = caps.get(3)?.as_str().to_ascii_lowercase();
        let quarter = match month.as_str() {
            "january" | "february" | "march" => Quarter::Q1,
            "april" | "may" | "june" => Quarter::Q2,
            "july" | "august" | "september" => Quarter::Q3,
            _ => Quarter::Q4,
        };
        Some(quarter)
    }

    if let Some(quarter) = QUARTER.captures(&text[span.clone()]).and_then(|c| resolve(&c)) {
        return Some(quarter);
    }

    // Same context window as find_year_near.
    let mut start = span.start.saturating_sub(120);
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = usize::min(span.end + 120, text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    QUARTER.captures(&text[start..end]).and_then(|c| resolve(&c))
}

/// Deduplicates in-tier records by `(fiscal_year, fiscal_quarter, value)`,
/// sorts most recent first, and applies the per-tier output cap.
pub(crate) fn dedup_and_cap(mut records: Vec<PeriodRecord>, annual: bool) -> Vec<PeriodRecord> {
    let mut seen = std::collections::HashSet::new();
    records.retain(|r| {
        seen.insert((
            r.fiscal_year,
            r.fiscal_quarter,
            r.value.map(f64::to_bits),
        ))
    });
    records.sort_by(|a, b| {
        (b.fiscal_year, b.fiscal_quarter, b.period_end)
            .cmp(&(a.fiscal_year, a.fiscal_quarter, a.period_end))
    });
    records.truncate(if annual {
        MAX_ANNUAL_PERIODS
    } else {
        MAX_QUARTERLY_PERIODS
    });
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use finfacts_core::{Metric, Quarter, Source};

    fn record(fy: i32, fq: Option<Quarter>, value: f64) -> PeriodRecord {
        PeriodRecord {
            ticker: "TEST".to_string(),
            fiscal_year: fy,
            fiscal_quarter: fq,
            period_end: None,
            metric: Metric::Revenue,
            value: Some(value),
            source: Source::Tier1,
            extraction_method: "tier1_filing_parse".to_string(),
        }
    }

    #[test]
    fn test_unit_multipliers() {
        assert_eq!(unit_multiplier("million"), 1e6);
        assert_eq!(unit_multiplier("Billion"), 1e9);
        assert_eq!(unit_multiplier("thousand"), 1e3);
        assert_eq!(unit_multiplier(""), 1.0);
    }

    #[test]
    fn test_year_found_in_context_window() {
        let text = "For the fiscal year ended December 31, 2023, total revenues: $3.3 billion.";
        let span = text.find("total revenues").unwrap();
        let year = find_year_near(text, span..span + 14);
        assert_eq!(year, Some(2023));
    }

    #[test]
    fn test_quarter_from_explicit_reference() {
        let text = "Q2 2023 revenue was strong.";
        assert_eq!(quarter_near(text, 0..text.len()), Some(Quarter::Q2));
    }

    #[test]
    fn test_quarter_from_period_end_month() {
        let text = "Revenue of $722.4 million for the quarter ended September 30, 2023.";
        let span = text.find("for the quarter").unwrap();
        assert_eq!(quarter_near(text, span..span + 15), Some(Quarter::Q3));
    }

    #[test]
    fn test_quarter_from_ordinal_phrase() {
        let text = "Results for the fourth quarter exceeded guidance.";
        assert_eq!(quarter_near(text, 0..text.len()), Some(Quarter::Q4));
    }

    #[test]
    fn test_bare_month_word_is_not_a_quarter() {
        // A modal "may" without a day number must not resolve to Q2.
        let text = "Revenue for the quarter may improve next year.";
        assert_eq!(quarter_near(text, 0..text.len()), None);
    }

    #[test]
    fn test_dedup_drops_repeated_observations() {
        let records = vec![
            record(2023, None, 1.0e9),
            record(2023, None, 1.0e9),
            record(2022, None, 8.0e8),
        ];
        let out = dedup_and_cap(records, true);
        assert_eq!(out.len(), 2);
        // Most recent first.
        assert_eq!(out[0].fiscal_year, 2023);
    }

    #[test]
    fn test_annual_cap_is_five_years() {
        let records = (2015..=2024).map(|fy| record(fy, None, fy as f64)).collect();
        let out = dedup_and_cap(records, true);
        assert_eq!(out.len(), 5);
        assert_eq!(out[0].fiscal_year, 2024);
        assert_eq!(out[4].fiscal_year, 2020);
    }

    #[test]
    fn test_quarterly_cap_is_twenty_periods() {
        let mut records = Vec::new();
        for fy in 2017..=2024 {
            for q in [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4] {
                records.push(record(fy, Some(q), fy as f64 + q as u8 as f64));
            }
        }
        let out = dedup_and_cap(records, false);
        assert_eq!(out.len(), 20);
        assert_eq!(out[0].fiscal_year, 2024);
    }
}
