//! Tier 0: structured company-facts parsing.
//!
//! Walks a pre-fetched machine-readable facts document
//! (`facts.us-gaap.<Tag>.units.<unit>[]`) and maps standardized tag names
//! onto canonical metrics. The same economic concept is filed under
//! different tags across companies, so each metric carries an ordered
//! alias list and the first tag present wins.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde_json::Value;

use finfacts_core::{Metric, PeriodRecord, Quarter, Source, TierData, TierError};

use super::dedup_and_cap;

pub const METHOD: &str = "primary_edgar_facts";

/// Ordered tag aliases per canonical metric. Data, not code: a new filer
/// variant is one more entry here.
const METRIC_TAGS: &[(Metric, &[&str])] = &[
    (
        Metric::Revenue,
        &[
            "Revenues",
            "RevenueFromContractWithCustomerExcludingAssessedTax",
            "SalesRevenueNet",
            "RevenueFromContractWithCustomerIncludingAssessedTax",
            "RevenuesNet",
            "TotalRevenuesAndOtherIncome",
        ],
    ),
    (Metric::GrossProfit, &["GrossProfit", "GrossProfitLoss"]),
    (
        Metric::OperatingIncome,
        &[
            "OperatingIncomeLoss",
            "IncomeLossFromOperations",
            "OperatingIncomeLossBeforeIncomeTaxExpenseBenefit",
        ],
    ),
    (
        Metric::NetIncome,
        &[
            "NetIncomeLoss",
            "ProfitLoss",
            "NetIncomeLossAvailableToCommonStockholdersBasic",
            "NetIncomeLossAttributableToParent",
        ],
    ),
    (
        Metric::EpsBasic,
        &["EarningsPerShareBasic", "EarningsPerShareBasicAndDiluted"],
    ),
    (Metric::EpsDiluted, &["EarningsPerShareDiluted"]),
    (
        Metric::OperatingCashFlow,
        &[
            "NetCashProvidedByUsedInOperatingActivities",
            "NetCashProvidedByUsedInOperatingActivitiesContinuingOperations",
        ],
    ),
    (
        Metric::Capex,
        &[
            "PaymentsToAcquirePropertyPlantAndEquipment",
            "PaymentsToAcquireProductiveAssets",
        ],
    ),
    (Metric::TotalAssets, &["Assets"]),
    (Metric::TotalLiabilities, &["Liabilities"]),
    (
        Metric::SharesOutstanding,
        &[
            "CommonStockSharesOutstanding",
            "WeightedAverageNumberOfSharesOutstandingBasic",
        ],
    ),
];

/// Unit arrays tried in order within a tag's `units` map.
const UNIT_KEYS: &[&str] = &["USD", "USD/shares", "shares"];

/// Parses structured company-facts documents into period records.
#[derive(Debug, Default, Clone, Copy)]
pub struct FactsExtractor;

impl FactsExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Extracts every tracked metric from a loaded facts document.
    ///
    /// Facts carrying a `frame` attribute are skipped (cumulative or
    /// contextual entries that would double-count). Colliding periods keep
    /// the entry with the most recent `filed` date.
    pub fn extract(&self, ticker: &str, facts: &Value) -> Result<TierData, TierError> {
        let us_gaap = facts
            .get("facts")
            .and_then(|f| f.get("us-gaap"))
            .and_then(Value::as_object)
            .ok_or_else(|| TierError::Parse("no us-gaap facts in document".to_string()))?;

        let mut annual = Vec::new();
        let mut quarterly = Vec::new();

        for (metric, tags) in METRIC_TAGS {
            let Some(entries) = tags.iter().find_map(|tag| {
                us_gaap
                    .get(*tag)
                    .and_then(|fact| fact.get("units"))
                    .and_then(|units| {
                        UNIT_KEYS
                            .iter()
                            .find_map(|unit| units.get(*unit))
                            .and_then(Value::as_array)
                    })
            }) else {
                continue;
            };

            let (metric_annual, metric_quarterly) = collect_metric(ticker, *metric, entries);
            annual.extend(dedup_and_cap(metric_annual, true));
            quarterly.extend(dedup_and_cap(metric_quarterly, false));
        }

        if annual.is_empty() && quarterly.is_empty() {
            return Err(TierError::NoData(
                "no usable facts for any tracked metric".to_string(),
            ));
        }

        tracing::debug!(
            %ticker,
            annual = annual.len(),
            quarterly = quarterly.len(),
            "company facts parsed"
        );

        Ok(TierData {
            annual,
            quarterly,
            extraction_method: METHOD.to_string(),
            sources: vec!["company_facts".to_string()],
        })
    }
}

/// Walks one metric's fact entries and resolves period collisions by most
/// recent `filed` date.
fn collect_metric(
    ticker: &str,
    metric: Metric,
    entries: &[Value],
) -> (Vec<PeriodRecord>, Vec<PeriodRecord>) {
    // (fiscal_year, quarter, end) -> (filed, record)
    let mut best: HashMap<(i32, Option<Quarter>, Option<NaiveDate>), (String, PeriodRecord)> =
        HashMap::new();

    for entry in entries {
        // Entries with a frame are cumulative/contextual views.
        if entry.get("frame").is_some_and(|f| !f.is_null()) {
            continue;
        }
        let Some(form) = entry.get("form").and_then(Value::as_str) else {
            continue;
        };
        let quarter = match form {
            "10-K" => None,
            "10-Q" => entry
                .get("fp")
                .and_then(Value::as_str)
                .and_then(Quarter::parse),
            _ => continue,
        };
        if form == "10-Q" && quarter.is_none() {
            continue;
        }
        let Some(fiscal_year) = entry.get("fy").and_then(Value::as_i64) else {
            continue;
        };
        let Some(value) = entry.get("val").and_then(Value::as_f64) else {
            continue;
        };
        let period_end = entry
            .get("end")
            .and_then(Value::as_str)
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
        let filed = entry
            .get("filed")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        let record = PeriodRecord {
            ticker: ticker.to_string(),
            fiscal_year: fiscal_year as i32,
            fiscal_quarter: quarter,
            period_end,
            metric,
            value: Some(value),
            source: Source::Primary,
            extraction_method: METHOD.to_string(),
        };

        let key = (record.fiscal_year, quarter, period_end);
        match best.get(&key) {
            Some((existing_filed, _)) if *existing_filed >= filed => {}
            _ => {
                best.insert(key, (filed, record));
            }
        }
    }

    let mut annual = Vec::new();
    let mut quarterly = Vec::new();
    for (_, record) in best.into_values() {
        if record.fiscal_quarter.is_some() {
            quarterly.push(record);
        } else {
            annual.push(record);
        }
    }
    (annual, quarterly)
}
