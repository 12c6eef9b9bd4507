//! Tier 3: free-text transcript heuristics.
//!
//! Last resort before total failure. The patterns tolerate much more
//! phrasing variance than tier 1, trading confidence for recall; anything
//! extracted here is tagged accordingly so downstream consumers know the
//! provenance.

use std::sync::LazyLock;

use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;

use finfacts_core::{
    DocumentStore, Metric, PeriodRecord, Source, TierData, TierError, TierExtractor,
};

use super::{dedup_and_cap, find_year_near, quarter_near, unit_multiplier};

pub const SOURCE_KEY: &str = "tier3_transcript";
pub const METHOD: &str = "tier3_transcript_parse";

/// Looser earnings-call phrasing. Named groups: `value` (required),
/// `unit`, `period`.
static TRANSCRIPT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // "Q3 2023 revenue was $722.4 million"
        r"(?i)(?P<period>Q[1-4]\s*\d{4}|fiscal\s*(?:year\s*)?\d{4})\s*revenues?\s*(?:was|were|of|totaled|came\s+in\s+at)?\s*\$\s*(?P<value>[\d,]+(?:\.\d+)?)\s*(?P<unit>thousand|million|billion)",
        // "Revenue for the quarter came to $722.4 million"
        r"(?i)revenues?\s+for\s+the\s+(?P<period>quarter|year)[^$\n]*?\$\s*(?P<value>[\d,]+(?:\.\d+)?)\s*(?P<unit>thousand|million|billion)",
        // "Total revenues of $3.3 billion"
        r"(?i)total\s+revenues?\s+of\s+\$\s*(?P<value>[\d,]+(?:\.\d+)?)\s*(?P<unit>thousand|million|billion)",
        // "generated $84 million in revenue"
        r"(?i)generated\s+\$\s*(?P<value>[\d,]+(?:\.\d+)?)\s*(?P<unit>thousand|million|billion)?\s+in\s+revenues?",
        // "our revenue was $722.4 million for Q3"
        r"(?i)(?:our\s+)?revenues?\s+was\s+\$\s*(?P<value>[\d,]+(?:\.\d+)?)\s*(?P<unit>thousand|million|billion)?\s+for\s+(?P<period>Q[1-4]|the\s+\w+\s+quarter)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("transcript pattern must compile"))
    .collect()
});

static QUARTER_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Q([1-4])").unwrap());

/// Extracts revenue mentions from transcripts and press releases.
pub struct TranscriptTierExtractor<D> {
    docs: D,
}

impl<D: DocumentStore> TranscriptTierExtractor<D> {
    pub fn new(docs: D) -> Self {
        Self { docs }
    }
}

#[async_trait]
impl<D: DocumentStore> TierExtractor for TranscriptTierExtractor<D> {
    fn source_key(&self) -> &'static str {
        SOURCE_KEY
    }

    fn extraction_method(&self) -> &'static str {
        METHOD
    }

    async fn extract(&self, ticker: &str) -> Result<TierData, TierError> {
        let text = self
            .docs
            .transcript_text(ticker)
            .await
            .context("transcript store lookup")
            .map_err(|e| TierError::Transient(format!("{e:#}")))?
            .ok_or_else(|| TierError::NoData(format!("no transcripts for {ticker}")))?;

        let data = parse_transcript_text(ticker, &text);
        if data.is_empty() {
            return Err(TierError::Parse(
                "no revenue figures matched in transcript text".to_string(),
            ));
        }
        Ok(data)
    }
}

pub(crate) fn parse_transcript_text(ticker: &str, text: &str) -> TierData {
    let mut annual = Vec::new();
    let mut quarterly = Vec::new();

    for pattern in TRANSCRIPT_PATTERNS.iter() {
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
            let Some(fiscal_year) = find_year_near(text, whole.range()) else {
                continue;
            };

            let period_hint = caps.name("period").map(|p| p.as_str().to_ascii_lowercase());
            let wants_quarter = period_hint
                .as_deref()
                .is_some_and(|p| p.contains("quarter") || QUARTER_REF.is_match(p));

            let fiscal_quarter = if wants_quarter {
                // An unresolvable quarter must not fall through as annual.
                match quarter_near(text, whole.range()) {
                    Some(quarter) => Some(quarter),
                    None => continue,
                }
            } else {
                None
            };

            let record = PeriodRecord {
                ticker: ticker.to_string(),
                fiscal_year,
                fiscal_quarter,
                period_end: None,
                metric: Metric::Revenue,
                value: Some(value),
                source: Source::Tier3,
                extraction_method: METHOD.to_string(),
            };
            if wants_quarter {
                quarterly.push(record);
            } else {
                annual.push(record);
            }
        }
    }

    TierData {
        annual: dedup_and_cap(annual, true),
        quarterly: dedup_and_cap(quarterly, false),
        extraction_method: METHOD.to_string(),
        sources: vec!["transcripts".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finfacts_core::Quarter;

    #[test]
    fn test_quarter_year_revenue_phrase() {
        let text = "Turning to results, Q3 2023 revenue was $722.4 million, up 24%.";
        let data = parse_transcript_text("FOUR", text);

        assert_eq!(data.quarterly.len(), 1);
        let record = &data.quarterly[0];
        assert_eq!(record.fiscal_year, 2023);
        assert_eq!(record.fiscal_quarter, Some(Quarter::Q3));
        assert_eq!(record.value, Some(722.4e6));
        assert_eq!(record.extraction_method, "tier3_transcript_parse");
    }

    #[test]
    fn test_fiscal_year_phrase_is_annual() {
        let text = "For fiscal 2023 revenue totaled $2.56 billion across all segments.";
        let data = parse_transcript_text("FOUR", text);

        assert_eq!(data.annual.len(), 1);
        assert_eq!(data.annual[0].fiscal_year, 2023);
        assert_eq!(data.annual[0].value, Some(2.56e9));
        assert_eq!(data.annual[0].fiscal_quarter, None);
    }

    #[test]
    fn test_generated_in_revenue_phrase() {
        let text = "In 2022 the platform generated $84 million in revenue for the first time.";
        let data = parse_transcript_text("FOUR", text);

        assert_eq!(data.annual.len(), 1);
        assert_eq!(data.annual[0].value, Some(84.0e6));
        assert_eq!(data.annual[0].fiscal_year, 2022);
    }

    #[test]
    fn test_revenue_for_the_quarter_phrase() {
        let text = "Revenue for the quarter ended September 30, 2023 came to $637.0 million.";
        let data = parse_transcript_text("FOUR", text);

        assert_eq!(data.quarterly.len(), 1);
        assert_eq!(data.quarterly[0].value, Some(637.0e6));
        assert_eq!(data.quarterly[0].fiscal_quarter, Some(Quarter::Q3));
    }

    #[test]
    fn test_quarter_without_resolvable_quarter_dropped() {
        let text = "Revenue for the quarter came to $637.0 million, a record for 2023.";
        let data = parse_transcript_text("FOUR", text);
        assert!(data.is_empty());
    }

    #[test]
    fn test_no_year_context_dropped() {
        let text = "Total revenues of $1.1 billion exceeded guidance.";
        let data = parse_transcript_text("FOUR", text);
        assert!(data.is_empty());
    }
}
