//! Tier 2: local key-value cache lookup.
//!
//! Reads previously cached snapshots (from an earlier successful scrape or
//! a bulk download) out of an injected [`KeyValueStore`]. Accepts both
//! list-of-records and columnar-map JSON shapes, since different cache
//! writers produced different layouts over time.

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;

use finfacts_core::{
    numeric::value_from_json, KeyValueStore, Metric, PeriodRecord, Quarter, Source, TierData,
    TierError, TierExtractor,
};

use super::dedup_and_cap;

pub const SOURCE_KEY: &str = "tier2_cache";
pub const METHOD: &str = "tier2_cache_db";

/// Cache key suffixes tried in order for a ticker.
const CACHE_KEY_SUFFIXES: &[&str] = &["revenue_cache", "financial_cache", "yahoo_data"];

/// Looks up cached financial snapshots for a ticker.
pub struct CacheTierExtractor<S> {
    store: S,
}

impl<S: KeyValueStore> CacheTierExtractor<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: KeyValueStore> TierExtractor for CacheTierExtractor<S> {
    fn source_key(&self) -> &'static str {
        SOURCE_KEY
    }

    fn extraction_method(&self) -> &'static str {
        METHOD
    }

    async fn extract(&self, ticker: &str) -> Result<TierData, TierError> {
        for suffix in CACHE_KEY_SUFFIXES {
            let cache_key = format!("{ticker}_{suffix}");
            let cached = self
                .store
                .get(&cache_key)
                .await
                .context("cache store lookup")
                .map_err(|e| TierError::Transient(format!("{e:#}")))?;
            let Some(blob) = cached else {
                continue;
            };

            // A malformed blob under one key must not stop us trying the
            // next one.
            match parse_cache_blob(ticker, &cache_key, &blob) {
                Some(data) if !data.is_empty() => return Ok(data),
                _ => {
                    tracing::debug!(%ticker, %cache_key, "cache entry had no usable records");
                }
            }
        }

        Err(TierError::NoData(format!(
            "no usable cache entry for {ticker}"
        )))
    }
}

fn parse_cache_blob(ticker: &str, cache_key: &str, blob: &Value) -> Option<TierData> {
    // Cache writers sometimes stored JSON as a string payload.
    let parsed;
    let blob = match blob {
        Value::String(s) => {
            parsed = serde_json::from_str::<Value>(s).ok()?;
            &parsed
        }
        other => other,
    };

    let mut annual = Vec::new();
    let mut quarterly = Vec::new();

    match blob {
        Value::Array(records) => {
            for record in records {
                let value = record
                    .get("revenue")
                    .or_else(|| record.get("total_revenue"))
                    .and_then(value_from_json);
                let Some(value) = value else { continue };
                let fiscal_year = record
                    .get("year")
                    .or_else(|| record.get("fiscal_year"))
                    .and_then(Value::as_i64);
                let Some(fiscal_year) = fiscal_year else {
                    continue;
                };

                let quarter = record
                    .get("fiscal_quarter")
                    .and_then(Value::as_str)
                    .and_then(Quarter::parse);
                let is_quarterly = record
                    .get("period_type")
                    .and_then(Value::as_str)
                    .is_some_and(|p| p.eq_ignore_ascii_case("quarterly"))
                    || quarter.is_some();

                let record = cache_record(ticker, fiscal_year as i32, quarter, value);
                if is_quarterly {
                    quarterly.push(record);
                } else {
                    annual.push(record);
                }
            }
        }
        Value::Object(map) => {
            // Columnar shape: {"revenue": {"0": v, ...}, "year": {"0": y, ...}}
            let revenue = map.get("revenue").and_then(Value::as_object)?;
            let years = map.get("year").and_then(Value::as_object);
            for (idx, cell) in revenue {
                let Some(value) = value_from_json(cell) else {
                    continue;
                };
                let Some(fiscal_year) = years
                    .and_then(|y| y.get(idx))
                    .and_then(Value::as_i64)
                else {
                    continue;
                };
                annual.push(cache_record(ticker, fiscal_year as i32, None, value));
            }
        }
        _ => return None,
    }

    Some(TierData {
        annual: dedup_and_cap(annual, true),
        quarterly: dedup_and_cap(quarterly, false),
        extraction_method: METHOD.to_string(),
        sources: vec![cache_key.to_string()],
    })
}

fn cache_record(
    ticker: &str,
    fiscal_year: i32,
    quarter: Option<Quarter>,
    value: f64,
) -> PeriodRecord {
    PeriodRecord {
        ticker: ticker.to_string(),
        fiscal_year,
        fiscal_quarter: quarter,
        period_end: None,
        metric: Metric::Revenue,
        value: Some(value),
        source: Source::Tier2,
        extraction_method: METHOD.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryKvStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_shape() {
        let store = MemoryKvStore::new();
        store
            .set(
                "FOUR_revenue_cache",
                json!([
                    { "revenue": 2.56e9, "year": 2022, "period_type": "annual" },
                    { "revenue": 8.4e8, "fiscal_year": 2023, "period_type": "quarterly",
                      "fiscal_quarter": "Q3" }
                ]),
            )
            .await
            .unwrap();

        let tier = CacheTierExtractor::new(store);
        let data = tier.extract("FOUR").await.unwrap();

        assert_eq!(data.annual.len(), 1);
        assert_eq!(data.annual[0].value, Some(2.56e9));
        assert_eq!(data.quarterly.len(), 1);
        assert_eq!(data.quarterly[0].fiscal_quarter, Some(Quarter::Q3));
    }

    #[tokio::test]
    async fn test_columnar_shape_and_string_values() {
        let store = MemoryKvStore::new();
        store
            .set(
                "FOUR_financial_cache",
                json!({
                    "revenue": { "0": "1.5B", "1": 2.0e9 },
                    "year": { "0": 2022, "1": 2023 }
                }),
            )
            .await
            .unwrap();

        let tier = CacheTierExtractor::new(store);
        let data = tier.extract("FOUR").await.unwrap();

        assert_eq!(data.annual.len(), 2);
        assert_eq!(data.annual[0].fiscal_year, 2023);
        assert_eq!(data.annual[1].value, Some(1.5e9));
    }

    #[tokio::test]
    async fn test_string_payload_parsed() {
        let store = MemoryKvStore::new();
        store
            .set(
                "FOUR_yahoo_data",
                json!("[{\"revenue\": 1000000, \"year\": 2023}]"),
            )
            .await
            .unwrap();

        let tier = CacheTierExtractor::new(store);
        let data = tier.extract("FOUR").await.unwrap();
        assert_eq!(data.annual.len(), 1);
    }

    #[tokio::test]
    async fn test_bad_key_falls_through_to_next() {
        let store = MemoryKvStore::new();
        store
            .set("FOUR_revenue_cache", json!("not json at all {"))
            .await
            .unwrap();
        store
            .set("FOUR_financial_cache", json!([{ "revenue": 5e8, "year": 2023 }]))
            .await
            .unwrap();

        let tier = CacheTierExtractor::new(store);
        let data = tier.extract("FOUR").await.unwrap();
        assert_eq!(data.sources, vec!["FOUR_financial_cache".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_store_is_no_data() {
        let tier = CacheTierExtractor::new(MemoryKvStore::new());
        let err = tier.extract("FOUR").await.unwrap_err();
        assert!(matches!(err, TierError::NoData(_)));
    }
}
