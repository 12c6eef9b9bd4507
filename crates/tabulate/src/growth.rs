//! Derived growth and CAGR columns.
//!
//! Enrichment never fabricates numbers for sign-change cases. A loss that
//! becomes a profit has no meaningful growth percentage, so the cell stays
//! null and carries a [`MetricNote`] naming the situation instead.

use std::collections::BTreeMap;

use finfacts_core::{CanonicalRow, DerivedCell, Metric, MetricNote};

/// Period-over-period growth between two observations.
///
/// `(cur - prev) / |prev| * 100`, which keeps the sign intuitive when both
/// endpoints are negative (a shrinking loss reads as positive growth).
#[must_use]
pub fn growth_pct(prev: f64, cur: f64) -> DerivedCell {
    if prev == 0.0 {
        if cur > 0.0 {
            return DerivedCell::undefined(MetricNote::ZeroBase);
        }
        // Zero to zero-or-loss is no change, not an undefined rate.
        return DerivedCell {
            value: Some(0.0),
            note: Some(MetricNote::ZeroBase),
        };
    }
    if prev < 0.0 && cur >= 0.0 {
        return DerivedCell::undefined(MetricNote::Turnaround);
    }
    if prev > 0.0 && cur < 0.0 {
        return DerivedCell::undefined(MetricNote::Reversal);
    }
    DerivedCell::pct((cur - prev) / prev.abs() * 100.0)
}

/// Compound annual growth rate over `periods` years.
///
/// Sign changes between the endpoints make the exponent meaningless, so
/// those cases come back as notes. Two negative endpoints are compared by
/// loss magnitude: a positive rate means the loss is shrinking.
#[must_use]
pub fn cagr(start: f64, end: f64, periods: f64) -> DerivedCell {
    if periods <= 0.0 {
        return DerivedCell::empty();
    }
    if start == 0.0 {
        if end > 0.0 {
            return DerivedCell::undefined(MetricNote::ZeroBase);
        }
        return DerivedCell {
            value: Some(0.0),
            note: Some(MetricNote::ZeroBase),
        };
    }
    if start < 0.0 && end >= 0.0 {
        return DerivedCell::undefined(MetricNote::Turnaround);
    }
    if start > 0.0 && end < 0.0 {
        return DerivedCell::undefined(MetricNote::Reversal);
    }
    if start < 0.0 && end < 0.0 {
        // Loss reduction rate, oriented like growth_pct: a shrinking loss
        // reads positive.
        let rate = ((start.abs() / end.abs()).powf(1.0 / periods) - 1.0) * 100.0;
        let note = if end.abs() <= start.abs() {
            MetricNote::LossShrinking
        } else {
            MetricNote::LossGrowing
        };
        return DerivedCell {
            value: Some(rate),
            note: Some(note),
        };
    }
    DerivedCell::pct(((end / start).powf(1.0 / periods) - 1.0) * 100.0)
}

/// Adds `{metric}_growth_pct` columns to already-sorted rows.
///
/// Growth compares each row to the previous row of the same ticker and
/// periodicity (annual rows against annual, quarterly against quarterly).
/// The first row of each series and rows missing either endpoint get an
/// empty cell, so the derived schema stays fixed.
pub fn add_growth(rows: &mut [CanonicalRow], metrics: &[Metric]) {
    let mut prev: BTreeMap<(String, bool), usize> = BTreeMap::new();

    for i in 0..rows.len() {
        let series = (rows[i].ticker.clone(), rows[i].fiscal_quarter.is_some());
        let prev_idx = prev.insert(series, i);

        for metric in metrics {
            let cell = match prev_idx {
                Some(p) => match (rows[p].get(*metric), rows[i].get(*metric)) {
                    (Some(prev_val), Some(cur_val)) => growth_pct(prev_val, cur_val),
                    _ => DerivedCell::empty(),
                },
                None => DerivedCell::empty(),
            };
            rows[i]
                .derived
                .insert(format!("{metric}_growth_pct"), cell);
        }
    }
}

/// Adds CAGR columns to already-sorted annual rows.
///
/// `{metric}_CAGR_pct_{window}y` is a rolling rate against the row exactly
/// `window` fiscal years earlier. `{metric}_CAGR_pct_total` spans the first
/// and last non-null observation of each ticker's annual series, with the
/// period count defaulting to the observation count minus one; `total_years`
/// overrides that when the caller knows the true elapsed time. The total is
/// stamped on every annual row of the ticker. Quarterly rows are left
/// untouched.
pub fn add_cagr(
    rows: &mut [CanonicalRow],
    metrics: &[Metric],
    window: u32,
    total_years: Option<f64>,
) {
    let annual: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, r)| r.fiscal_quarter.is_none())
        .map(|(i, _)| i)
        .collect();

    let mut by_ticker: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for idx in annual {
        by_ticker
            .entry(rows[idx].ticker.clone())
            .or_default()
            .push(idx);
    }

    for indices in by_ticker.values() {
        for metric in metrics {
            // Rolling window against the row `window` fiscal years back.
            for &i in indices {
                let target_fy = rows[i].fiscal_year - window as i32;
                let base = indices
                    .iter()
                    .find(|&&j| rows[j].fiscal_year == target_fy)
                    .copied();
                let cell = match base {
                    Some(j) => match (rows[j].get(*metric), rows[i].get(*metric)) {
                        (Some(start), Some(end)) => cagr(start, end, f64::from(window)),
                        _ => DerivedCell::empty(),
                    },
                    None => DerivedCell::empty(),
                };
                rows[i]
                    .derived
                    .insert(format!("{metric}_CAGR_pct_{window}y"), cell);
            }

            // Total span, stamped identically on every annual row.
            let series: Vec<f64> = indices
                .iter()
                .filter_map(|&i| rows[i].get(*metric))
                .collect();
            let total = if series.len() < 2 {
                DerivedCell::empty()
            } else {
                let span = total_years.unwrap_or((series.len() - 1) as f64);
                cagr(series[0], series[series.len() - 1], span)
            };
            for &i in indices {
                rows[i]
                    .derived
                    .insert(format!("{metric}_CAGR_pct_total"), total);
            }
        }
    }
}
