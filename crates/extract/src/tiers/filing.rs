//! Tier 1: regex parse of cached filing text.
//!
//! Works on plain text extracted from a locally cached 10-K/10-Q. The
//! patterns are tuned for the phrasing financial statements actually use;
//! looser transcript phrasing lives in tier 3.

use std::sync::LazyLock;

use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;

use finfacts_core::{
    DocumentStore, Metric, PeriodRecord, Source, TierData, TierError, TierExtractor,
};

use super::{dedup_and_cap, find_year_near, quarter_near, unit_multiplier};

pub const SOURCE_KEY: &str = "tier1_filing";
pub const METHOD: &str = "tier1_filing_parse";

/// Ordered filing patterns. Named groups: `value` (required), `unit`,
/// `period`, `year`.
static FILING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // "Revenue of $3,332.6 million for the fiscal year 2023"
        r"(?i)revenues?\s+of\s+\$\s*(?P<value>[\d,]+(?:\.\d+)?)\s*(?P<unit>thousand|million|billion)?\s+for\s+(?:the\s+)?(?P<period>fiscal\s+year|year|quarter)\s*(?:ended[^.\n]*?)?(?P<year>\d{4})?",
        // "For the year ended December 31, 2023 ... revenue of $3.3 billion"
        r"(?i)for\s+the\s+(?P<period>year|quarter)\s+ended[^.\n]*?revenues?\s+of\s+\$\s*(?P<value>[\d,]+(?:\.\d+)?)\s*(?P<unit>thousand|million|billion)?",
        // "Total revenues: $3,332.6" (statement line items)
        r"(?i)total\s+revenues?:?\s*\$\s*(?P<value>[\d,]+(?:\.\d+)?)\s*(?P<unit>thousand|million|billion)?",
        // "Net revenues were $3,332.6 million"
        r"(?i)(?:net\s+)?revenues?\s+(?:was|were|totaled)\s+\$\s*(?P<value>[\d,]+(?:\.\d+)?)\s*(?P<unit>thousand|million|billion)?",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("filing pattern must compile"))
    .collect()
});

/// Parses revenue mentions out of cached filing text.
pub struct FilingTierExtractor<D> {
    docs: D,
}

impl<D: DocumentStore> FilingTierExtractor<D> {
    pub fn new(docs: D) -> Self {
        Self { docs }
    }
}

#[async_trait]
impl<D: DocumentStore> TierExtractor for FilingTierExtractor<D> {
    fn source_key(&self) -> &'static str {
        SOURCE_KEY
    }

    fn extraction_method(&self) -> &'static str {
        METHOD
    }

    async fn extract(&self, ticker: &str) -> Result<TierData, TierError> {
        let text = self
            .docs
            .filing_text(ticker)
            .await
            .context("filing store lookup")
            .map_err(|e| TierError::Transient(format!("{e:#}")))?
            .ok_or_else(|| TierError::NoData(format!("no cached filing for {ticker}")))?;

        let data = parse_filing_text(ticker, &text);
        if data.is_empty() {
            return Err(TierError::Parse(
                "no revenue figures matched in filing text".to_string(),
            ));
        }
        Ok(data)
    }
}

pub(crate) fn parse_filing_text(ticker: &str, text: &str) -> TierData {
    let mut annual = Vec::new();
    let mut quarterly = Vec::new();

    for pattern in FILING_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let Some(value_match) = caps.name("value") else {
                continue;
            };
            let raw = value_match.as_str().replace(',', "");
            let Ok(mut value) = raw.parse::<f64>() else {
                continue;
            };
            if let Some(unit) = caps.name("unit") {
                value *= unit_multiplier(unit.as_str());
            }

            let whole = caps.get(0).expect("group 0 always present");
            let fiscal_year = caps
                .name("year")
                .and_then(|y| y.as_str().parse().ok())
                .or_else(|| find_year_near(text, whole.range()));
            let Some(fiscal_year) = fiscal_year else {
                // A figure without any nearby period is noise.
                continue;
            };

            let period_hint = caps.name("period").map(|p| p.as_str().to_ascii_lowercase());
            let is_annual = period_hint
                .as_deref()
                .map_or(true, |p| p.contains("year") || p.contains("fiscal"));

            let fiscal_quarter = if is_annual {
                None
            } else {
                // A quarterly figure with no resolvable quarter would
                // masquerade as an annual period downstream.
                match quarter_near(text, whole.range()) {
                    Some(quarter) => Some(quarter),
                    None => continue,
                }
            };

            let record = PeriodRecord {
                ticker: ticker.to_string(),
                fiscal_year,
                fiscal_quarter,
                period_end: None,
                metric: Metric::Revenue,
                value: Some(value),
                source: Source::Tier1,
                extraction_method: METHOD.to_string(),
            };
            if is_annual {
                annual.push(record);
            } else {
                quarterly.push(record);
            }
        }
    }

    TierData {
        annual: dedup_and_cap(annual, true),
        quarterly: dedup_and_cap(quarterly, false),
        extraction_method: METHOD.to_string(),
        sources: vec!["cached_filing".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fiscal_year_phrase() {
        let text = "Revenue of $1,000 million for fiscal year 2023 reflected continued growth.";
        let data = parse_filing_text("FOUR", text);

        assert_eq!(data.annual.len(), 1);
        assert_eq!(data.annual[0].fiscal_year, 2023);
        assert_eq!(data.annual[0].value, Some(1.0e9));
        assert_eq!(data.annual[0].extraction_method, "tier1_filing_parse");
    }

    #[test]
    fn test_year_ended_phrase() {
        let text = "For the year ended December 31, 2022, the Company reported revenue of $2.56 billion.";
        let data = parse_filing_text("FOUR", text);

        assert_eq!(data.annual.len(), 1);
        assert_eq!(data.annual[0].fiscal_year, 2022);
        assert_eq!(data.annual[0].value, Some(2.56e9));
    }

    #[test]
    fn test_table_line_item_uses_nearby_year() {
        let text = "Consolidated results for 2023.\nTotal revenues: $3,332.6 million";
        let data = parse_filing_text("FOUR", text);

        assert_eq!(data.annual.len(), 1);
        assert_eq!(data.annual[0].fiscal_year, 2023);
        assert_eq!(data.annual[0].value, Some(3.3326e9));
    }

    #[test]
    fn test_quarter_phrase_goes_quarterly() {
        use finfacts_core::Quarter;

        let text = "Revenue of $722.4 million for the quarter ended September 30, 2023.";
        let data = parse_filing_text("FOUR", text);

        assert!(data.annual.is_empty());
        assert_eq!(data.quarterly.len(), 1);
        assert_eq!(data.quarterly[0].value, Some(722.4e6));
        // The period-end month resolves the quarter; a null quarter would
        // read as an annual row downstream.
        assert_eq!(data.quarterly[0].fiscal_quarter, Some(Quarter::Q3));
    }

    #[test]
    fn test_quarter_phrase_without_quarter_context_dropped() {
        let text = "Revenue of $722.4 million for the quarter, consistent with 2023 guidance.";
        let data = parse_filing_text("FOUR", text);
        assert!(data.is_empty());
    }

    #[test]
    fn test_no_period_context_is_dropped() {
        let text = "Total revenues: $500 million across unspecified segments.";
        let data = parse_filing_text("FOUR", text);
        assert!(data.is_empty());
    }

    #[test]
    fn test_multiple_years_extracted() {
        let text = "Revenue of $800 million for fiscal year 2022. \
                    Revenue of $1,000 million for fiscal year 2023.";
        let data = parse_filing_text("FOUR", text);

        assert_eq!(data.annual.len(), 2);
        assert_eq!(data.annual[0].fiscal_year, 2023);
        assert_eq!(data.annual[1].fiscal_year, 2022);
    }
}
