//! Period-level record types shared by every extraction tier.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::metric::Metric;

/// Per-tier output caps: the most recent 5 fiscal years and 5 years of
/// quarters. Bounds downstream volume no matter how noisy a source is.
pub const MAX_ANNUAL_PERIODS: usize = 5;
pub const MAX_QUARTERLY_PERIODS: usize = 20;

/// Fiscal quarter within a fiscal year. Absent for annual periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    /// Parses `Q1`..`Q4` (case-insensitive).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Quarter> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "Q1" => Some(Quarter::Q1),
            "Q2" => Some(Quarter::Q2),
            "Q3" => Some(Quarter::Q3),
            "Q4" => Some(Quarter::Q4),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
            Quarter::Q3 => "Q3",
            Quarter::Q4 => "Q4",
        }
    }
}

/// Which kind of source produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Structured company-facts document (most authoritative).
    Primary,
    /// Text parse of a cached filing.
    Tier1,
    /// Local key-value cache snapshot.
    Tier2,
    /// Free-text transcript heuristics.
    Tier3,
    /// Externally scraped records fed into reconciliation.
    Scraped,
}

/// One observation of a metric at a fiscal period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRecord {
    pub ticker: String,
    pub fiscal_year: i32,
    pub fiscal_quarter: Option<Quarter>,
    pub period_end: Option<NaiveDate>,
    pub metric: Metric,
    pub value: Option<f64>,
    pub source: Source,
    /// Provenance tag, e.g. `primary_edgar_facts` or `tier1_filing_parse`.
    pub extraction_method: String,
}

/// Successful output of a single tier, before the cascade wraps it into the
/// uniform [`ExtractionResult`] contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierData {
    pub annual: Vec<PeriodRecord>,
    pub quarterly: Vec<PeriodRecord>,
    pub extraction_method: String,
    pub sources: Vec<String>,
}

impl TierData {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.annual.is_empty() && self.quarterly.is_empty()
    }
}

/// The uniform result contract returned by the cascade.
///
/// Empty `annual` and `quarterly` together with a present `error` signals
/// failure; `tier_results` carries each tier's individual reason so the
/// caller can diagnose which source type is missing without re-running.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub annual: Vec<PeriodRecord>,
    pub quarterly: Vec<PeriodRecord>,
    pub extraction_method: String,
    pub sources: Vec<String>,
    pub error: Option<String>,
    pub tier_results: BTreeMap<String, String>,
}

impl ExtractionResult {
    /// True when at least one period record is present.
    #[must_use]
    pub fn has_data(&self) -> bool {
        !self.annual.is_empty() || !self.quarterly.is_empty()
    }

    #[must_use]
    pub fn from_tier(data: TierData) -> Self {
        Self {
            annual: data.annual,
            quarterly: data.quarterly,
            extraction_method: data.extraction_method,
            sources: data.sources,
            error: None,
            tier_results: BTreeMap::new(),
        }
    }

    /// Builds the structured total-failure result.
    #[must_use]
    pub fn failure(error: impl Into<String>, tier_results: BTreeMap<String, String>) -> Self {
        Self {
            annual: Vec::new(),
            quarterly: Vec::new(),
            extraction_method: "cascade_failure".to_string(),
            sources: Vec::new(),
            error: Some(error.into()),
            tier_results,
        }
    }

    /// A failed primary result carrying only an error reason.
    #[must_use]
    pub fn primary_error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// All records from both period kinds, annual first.
    #[must_use]
    pub fn all_records(&self) -> Vec<PeriodRecord> {
        let mut records = self.annual.clone();
        records.extend(self.quarterly.iter().cloned());
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_parse() {
        assert_eq!(Quarter::parse("q3"), Some(Quarter::Q3));
        assert_eq!(Quarter::parse(" Q1 "), Some(Quarter::Q1));
        assert_eq!(Quarter::parse("FY"), None);
        assert_eq!(Quarter::parse("Q5"), None);
    }

    #[test]
    fn test_extraction_result_has_data() {
        let mut result = ExtractionResult::default();
        assert!(!result.has_data());

        result.quarterly.push(PeriodRecord {
            ticker: "FOUR".to_string(),
            fiscal_year: 2023,
            fiscal_quarter: Some(Quarter::Q2),
            period_end: None,
            metric: Metric::Revenue,
            value: Some(637.0e6),
            source: Source::Primary,
            extraction_method: "primary_edgar_facts".to_string(),
        });
        assert!(result.has_data());
    }

    #[test]
    fn test_failure_result_shape() {
        let mut tiers = BTreeMap::new();
        tiers.insert("tier1_filing".to_string(), "no cached filing".to_string());
        let result = ExtractionResult::failure("all fallback tiers failed", tiers);

        assert!(!result.has_data());
        assert_eq!(result.extraction_method, "cascade_failure");
        assert!(result.error.is_some());
        assert_eq!(
            result.tier_results.get("tier1_filing").map(String::as_str),
            Some("no cached filing")
        );
    }
}
