//! Canonical denormalized rows.
//!
//! A [`CanonicalRow`] is one fully-merged fiscal period with every tracked
//! metric as a column. Rows are created by the normalizer, filled in by the
//! reconciler, and extended with derived columns by the metrics engine.
//! After that they are output-only.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::metric::Metric;
use crate::types::Quarter;

/// Join key identifying one fiscal period of one company.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowKey {
    pub ticker: String,
    pub fiscal_year: i32,
    pub fiscal_quarter: Option<Quarter>,
    pub period_end: Option<NaiveDate>,
    pub currency: Option<String>,
}

/// Why a derived metric has no numeric value, or context for one that does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricNote {
    /// Previous/start value was zero; the rate is undefined, or pinned to
    /// zero when the series stayed at or below zero.
    ZeroBase,
    /// Loss became a profit; no meaningful growth magnitude exists.
    Turnaround,
    /// Profit became a loss.
    Reversal,
    /// Both endpoints negative and the loss magnitude is shrinking.
    LossShrinking,
    /// Both endpoints negative and the loss magnitude is growing.
    LossGrowing,
}

/// One derived-column cell: a percentage when defined, a note when not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedCell {
    pub value: Option<f64>,
    pub note: Option<MetricNote>,
}

impl DerivedCell {
    #[must_use]
    pub fn pct(value: f64) -> Self {
        Self {
            value: Some(value),
            note: None,
        }
    }

    #[must_use]
    pub fn undefined(note: MetricNote) -> Self {
        Self {
            value: None,
            note: Some(note),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// One denormalized fiscal period with the full canonical column set.
///
/// Every financial column is always present; missing data is `None`, never
/// an absent key, so consumers can rely on a fixed schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRow {
    pub ticker: String,
    pub company: Option<String>,
    pub fiscal_year: i32,
    pub fiscal_quarter: Option<Quarter>,
    pub period_end: Option<NaiveDate>,
    pub currency: Option<String>,

    pub revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub operating_income: Option<f64>,
    pub net_income: Option<f64>,
    pub eps_basic: Option<f64>,
    pub eps_diluted: Option<f64>,
    pub operating_cash_flow: Option<f64>,
    pub capex: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub total_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub shares_outstanding: Option<f64>,

    /// Derived columns keyed by output name, e.g. `revenue_growth_pct`,
    /// `revenue_CAGR_pct_total`, `revenue_CAGR_pct_3y`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub derived: BTreeMap<String, DerivedCell>,
}

impl CanonicalRow {
    #[must_use]
    pub fn new(ticker: impl Into<String>, fiscal_year: i32, fiscal_quarter: Option<Quarter>) -> Self {
        Self {
            ticker: ticker.into(),
            fiscal_year,
            fiscal_quarter,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn key(&self) -> RowKey {
        RowKey {
            ticker: self.ticker.clone(),
            fiscal_year: self.fiscal_year,
            fiscal_quarter: self.fiscal_quarter,
            period_end: self.period_end,
            currency: self.currency.clone(),
        }
    }

    /// Reads a metric column by name.
    #[must_use]
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Revenue => self.revenue,
            Metric::GrossProfit => self.gross_profit,
            Metric::OperatingIncome => self.operating_income,
            Metric::NetIncome => self.net_income,
            Metric::EpsBasic => self.eps_basic,
            Metric::EpsDiluted => self.eps_diluted,
            Metric::OperatingCashFlow => self.operating_cash_flow,
            Metric::Capex => self.capex,
            Metric::FreeCashFlow => self.free_cash_flow,
            Metric::TotalAssets => self.total_assets,
            Metric::TotalLiabilities => self.total_liabilities,
            Metric::SharesOutstanding => self.shares_outstanding,
        }
    }

    /// Writes a metric column by name.
    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        let slot = match metric {
            Metric::Revenue => &mut self.revenue,
            Metric::GrossProfit => &mut self.gross_profit,
            Metric::OperatingIncome => &mut self.operating_income,
            Metric::NetIncome => &mut self.net_income,
            Metric::EpsBasic => &mut self.eps_basic,
            Metric::EpsDiluted => &mut self.eps_diluted,
            Metric::OperatingCashFlow => &mut self.operating_cash_flow,
            Metric::Capex => &mut self.capex,
            Metric::FreeCashFlow => &mut self.free_cash_flow,
            Metric::TotalAssets => &mut self.total_assets,
            Metric::TotalLiabilities => &mut self.total_liabilities,
            Metric::SharesOutstanding => &mut self.shares_outstanding,
        };
        *slot = value;
    }

    /// Count of non-null value columns. Used by the reconciler's
    /// most-complete-record-wins deduplication.
    #[must_use]
    pub fn non_null_values(&self) -> usize {
        Metric::ALL.iter().filter(|m| self.get(**m).is_some()).count()
    }

    /// True when every tracked value column is null. Such rows carry no
    /// signal and are dropped after reconciliation.
    #[must_use]
    pub fn is_all_null(&self) -> bool {
        self.non_null_values() == 0
    }
}
