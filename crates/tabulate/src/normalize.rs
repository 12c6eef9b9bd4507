//! Normalization onto the canonical schema.
//!
//! Two kinds of raw input arrive here: period records produced by the
//! extraction tiers, and loose JSON dicts from external scrapers. Both
//! come out as [`CanonicalRow`]s with the full fixed column set and a
//! stable sort order.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::Value;

use finfacts_core::numeric::value_from_json;
use finfacts_core::{CanonicalRow, Metric, PeriodRecord, Quarter};

/// Input-key aliases resolved before canonical matching. Unknown keys are
/// dropped.
const FIELD_ALIASES: &[(&str, &str)] = &[
    ("fy", "fiscal_year"),
    ("year", "fiscal_year"),
    ("q", "fiscal_quarter"),
    ("quarter", "fiscal_quarter"),
    ("date", "period_end"),
    ("period", "period_end"),
    ("rev", "revenue"),
    ("sales", "revenue"),
    ("total_revenue", "revenue"),
    ("gp", "gross_profit"),
    ("op_income", "operating_income"),
    ("ebit", "operating_income"),
    ("net", "net_income"),
    ("net_profit", "net_income"),
    ("ocf", "operating_cash_flow"),
    ("fcf", "free_cash_flow"),
    ("shares", "shares_outstanding"),
];

/// Resolves an input key to its canonical name.
fn canonical_key(key: &str) -> &str {
    FIELD_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map_or(key, |(_, canonical)| canonical)
}

/// Pivots metric-level period records into denormalized rows.
///
/// Records sharing `(ticker, fiscal_year, fiscal_quarter)` fold into one
/// row; the first non-null observation of each metric wins (records arrive
/// most recent filing first, so later duplicates are staler).
#[must_use]
pub fn tabulate_records(records: &[PeriodRecord], default_currency: &str) -> Vec<CanonicalRow> {
    let mut rows: BTreeMap<(String, i32, Option<Quarter>), CanonicalRow> = BTreeMap::new();

    for record in records {
        let key = (
            record.ticker.clone(),
            record.fiscal_year,
            record.fiscal_quarter,
        );
        let row = rows.entry(key).or_insert_with(|| {
            let mut row = CanonicalRow::new(
                record.ticker.clone(),
                record.fiscal_year,
                record.fiscal_quarter,
            );
            row.currency = Some(default_currency.to_string());
            row
        });

        if row.get(record.metric).is_none() {
            row.set(record.metric, record.value);
        }
        if row.period_end.is_none() {
            row.period_end = record.period_end;
        }
    }

    let mut rows: Vec<CanonicalRow> = rows.into_values().collect();
    sort_rows(&mut rows);
    rows
}

/// Normalizes loose scraped dicts into canonical rows.
///
/// Applies the alias map, coerces human-formatted numerics (K/M/B), and
/// drops records without a fiscal year. Every canonical column is present
/// in the output, null when the input had nothing for it.
#[must_use]
pub fn tabulate_raw(records: &[Value], default_currency: &str) -> Vec<CanonicalRow> {
    let mut rows = Vec::new();

    for record in records {
        let Some(map) = record.as_object() else {
            continue;
        };

        let mut fiscal_year = None;
        let mut row = CanonicalRow::default();
        row.currency = Some(default_currency.to_string());

        for (key, cell) in map {
            match canonical_key(key.to_ascii_lowercase().as_str()) {
                "ticker" => row.ticker = cell.as_str().unwrap_or_default().to_string(),
                "company" => row.company = cell.as_str().map(str::to_string),
                "fiscal_year" => {
                    fiscal_year = cell
                        .as_i64()
                        .map(|y| y as i32)
                        .or_else(|| cell.as_str().and_then(|s| s.trim().parse().ok()));
                }
                "fiscal_quarter" => {
                    row.fiscal_quarter = cell.as_str().and_then(Quarter::parse);
                }
                "period_end" => {
                    row.period_end = cell
                        .as_str()
                        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
                }
                "currency" => {
                    if let Some(c) = cell.as_str() {
                        row.currency = Some(c.to_string());
                    }
                }
                name => {
                    // Metric column or an unknown key to drop.
                    if let Some(metric) = Metric::from_name(name) {
                        row.set(metric, value_from_json(cell));
                    }
                }
            }
        }

        let Some(fiscal_year) = fiscal_year else {
            continue;
        };
        row.fiscal_year = fiscal_year;
        rows.push(row);
    }

    sort_rows(&mut rows);
    rows
}

/// Stable sort by `(ticker, fiscal_year, fiscal_quarter, period_end)`,
/// nulls last.
pub fn sort_rows(rows: &mut [CanonicalRow]) {
    rows.sort_by(compare_rows);
}

pub(crate) fn compare_rows(a: &CanonicalRow, b: &CanonicalRow) -> Ordering {
    a.ticker
        .cmp(&b.ticker)
        .then(a.fiscal_year.cmp(&b.fiscal_year))
        .then(nulls_last(a.fiscal_quarter, b.fiscal_quarter))
        .then(nulls_last(a.period_end, b.period_end))
}

fn nulls_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finfacts_core::Source;
    use serde_json::json;

    fn record(fy: i32, fq: Option<Quarter>, metric: Metric, value: f64) -> PeriodRecord {
        PeriodRecord {
            ticker: "FOUR".to_string(),
            fiscal_year: fy,
            fiscal_quarter: fq,
            period_end: None,
            metric,
            value: Some(value),
            source: Source::Primary,
            extraction_method: "primary_edgar_facts".to_string(),
        }
    }

    #[test]
    fn test_pivot_groups_metrics_into_one_row() {
        let records = vec![
            record(2023, None, Metric::Revenue, 3.33e9),
            record(2023, None, Metric::NetIncome, 1.68e8),
            record(2022, None, Metric::Revenue, 2.56e9),
        ];
        let rows = tabulate_records(&records, "USD");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fiscal_year, 2022);
        assert_eq!(rows[1].revenue, Some(3.33e9));
        assert_eq!(rows[1].net_income, Some(1.68e8));
        assert_eq!(rows[1].currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_first_observation_wins_within_pivot() {
        let records = vec![
            record(2023, None, Metric::Revenue, 3.33e9),
            record(2023, None, Metric::Revenue, 1.0),
        ];
        let rows = tabulate_records(&records, "USD");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].revenue, Some(3.33e9));
    }

    #[test]
    fn test_raw_aliases_and_units() {
        let records = vec![json!({
            "ticker": "FOUR",
            "fy": 2023,
            "rev": "3,332.6M",
            "net": 168.0e6,
            "ebit": "251M",
            "unknown_column": "dropped"
        })];
        let rows = tabulate_raw(&records, "USD");

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.fiscal_year, 2023);
        assert_eq!(row.revenue, Some(3.3326e9));
        assert_eq!(row.net_income, Some(168.0e6));
        assert_eq!(row.operating_income, Some(251.0e6));
        // Canonical columns the input never mentioned are present as null.
        assert_eq!(row.total_assets, None);
    }

    #[test]
    fn test_raw_unparseable_numeric_is_null() {
        let records = vec![json!({ "ticker": "FOUR", "year": 2023, "revenue": "n/a" })];
        let rows = tabulate_raw(&records, "USD");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].revenue, None);
    }

    #[test]
    fn test_raw_drops_records_without_year() {
        let records = vec![json!({ "ticker": "FOUR", "revenue": 100 })];
        assert!(tabulate_raw(&records, "USD").is_empty());
    }

    #[test]
    fn test_sort_order_nulls_last() {
        let mut rows = vec![
            CanonicalRow::new("FOUR", 2023, None),
            CanonicalRow::new("FOUR", 2023, Some(Quarter::Q2)),
            CanonicalRow::new("FOUR", 2022, Some(Quarter::Q4)),
            CanonicalRow::new("AAPL", 2024, None),
        ];
        sort_rows(&mut rows);

        assert_eq!(rows[0].ticker, "AAPL");
        assert_eq!(rows[1].fiscal_year, 2022);
        assert_eq!(rows[2].fiscal_quarter, Some(Quarter::Q2));
        // Annual (null quarter) sorts after the quarters of the same year.
        assert_eq!(rows[3].fiscal_quarter, None);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let records = vec![
            json!({ "ticker": "FOUR", "fy": 2022, "rev": "2.56B" }),
            json!({ "ticker": "FOUR", "fy": 2023, "rev": "3.33B", "quarter": "Q1" }),
        ];
        let once = tabulate_raw(&records, "USD");

        // Round-trip the normalized rows through JSON and normalize again.
        let as_json: Vec<Value> = once
            .iter()
            .map(|r| serde_json::to_value(r).unwrap())
            .collect();
        let twice = tabulate_raw(&as_json, "USD");

        assert_eq!(once, twice);
    }
}
