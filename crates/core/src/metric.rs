//! Canonical metric catalog.
//!
//! Every source is normalized onto this fixed set of financial columns, so
//! downstream code can always rely on the same schema regardless of which
//! extraction tier produced the data.

use serde::{Deserialize, Serialize};

/// A canonical financial metric tracked by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Revenue,
    GrossProfit,
    OperatingIncome,
    NetIncome,
    EpsBasic,
    EpsDiluted,
    OperatingCashFlow,
    Capex,
    FreeCashFlow,
    TotalAssets,
    TotalLiabilities,
    SharesOutstanding,
}

impl Metric {
    /// All canonical value columns, in output column order.
    pub const ALL: [Metric; 12] = [
        Metric::Revenue,
        Metric::GrossProfit,
        Metric::OperatingIncome,
        Metric::NetIncome,
        Metric::EpsBasic,
        Metric::EpsDiluted,
        Metric::OperatingCashFlow,
        Metric::Capex,
        Metric::FreeCashFlow,
        Metric::TotalAssets,
        Metric::TotalLiabilities,
        Metric::SharesOutstanding,
    ];

    /// Default columns for period-over-period growth enrichment.
    pub const GROWTH_DEFAULTS: [Metric; 5] = [
        Metric::Revenue,
        Metric::GrossProfit,
        Metric::OperatingIncome,
        Metric::NetIncome,
        Metric::FreeCashFlow,
    ];

    /// Default columns for CAGR enrichment.
    pub const CAGR_DEFAULTS: [Metric; 3] =
        [Metric::Revenue, Metric::NetIncome, Metric::FreeCashFlow];

    /// Canonical column name as it appears in output tables.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Revenue => "revenue",
            Metric::GrossProfit => "gross_profit",
            Metric::OperatingIncome => "operating_income",
            Metric::NetIncome => "net_income",
            Metric::EpsBasic => "eps_basic",
            Metric::EpsDiluted => "eps_diluted",
            Metric::OperatingCashFlow => "operating_cash_flow",
            Metric::Capex => "capex",
            Metric::FreeCashFlow => "free_cash_flow",
            Metric::TotalAssets => "total_assets",
            Metric::TotalLiabilities => "total_liabilities",
            Metric::SharesOutstanding => "shares_outstanding",
        }
    }

    /// Parses a canonical column name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Metric> {
        Metric::ALL.iter().copied().find(|m| m.as_str() == name)
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
