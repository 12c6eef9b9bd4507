//! Reconciliation of same-period rows from different sources.
//!
//! Values from different sources are never blended numerically; conflicts
//! resolve by coalesce under a stated precedence, and duplicate periods
//! resolve by the most complete record.

use std::collections::BTreeMap;

use finfacts_core::{CanonicalRow, Metric, RowKey};

use crate::normalize::sort_rows;

/// Which input table wins per-column conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefer {
    A,
    B,
}

/// Merges two normalized tables on the canonical period key.
///
/// Outer join: a period present in only one source is kept. For each value
/// column the preferred source's non-null value wins, falling back to the
/// other source. Rows left with every value column null are dropped.
#[must_use]
pub fn combine(a: &[CanonicalRow], b: &[CanonicalRow], prefer: Prefer) -> Vec<CanonicalRow> {
    let a = dedupe(a);
    let b = dedupe(b);

    let mut joined: BTreeMap<RowKey, (Option<&CanonicalRow>, Option<&CanonicalRow>)> =
        BTreeMap::new();
    for row in &a {
        joined.entry(row.key()).or_default().0 = Some(row);
    }
    for row in &b {
        joined.entry(row.key()).or_default().1 = Some(row);
    }

    let mut merged = Vec::with_capacity(joined.len());
    for (key, (row_a, row_b)) in joined {
        let (winner, loser) = match prefer {
            Prefer::A => (row_a, row_b),
            Prefer::B => (row_b, row_a),
        };

        let mut row = CanonicalRow::new(key.ticker, key.fiscal_year, key.fiscal_quarter);
        row.period_end = key.period_end;
        row.currency = key.currency;
        row.company = winner
            .and_then(|r| r.company.clone())
            .or_else(|| loser.and_then(|r| r.company.clone()));

        for metric in Metric::ALL {
            let value = winner
                .and_then(|r| r.get(metric))
                .or_else(|| loser.and_then(|r| r.get(metric)));
            row.set(metric, value);
        }

        if !row.is_all_null() {
            merged.push(row);
        }
    }

    sort_rows(&mut merged);
    tracing::debug!(
        input_a = a.len(),
        input_b = b.len(),
        merged = merged.len(),
        "tables reconciled"
    );
    merged
}

/// Resolves duplicate periods within one table.
///
/// Keeps the row with the highest count of non-null value columns; ties go
/// to the row appearing later in the stable key sort, which favors
/// last-seen (assumed restated, more complete) filings. All-null rows are
/// dropped outright.
#[must_use]
pub fn dedupe(rows: &[CanonicalRow]) -> Vec<CanonicalRow> {
    let mut sorted: Vec<CanonicalRow> = rows.iter().filter(|r| !r.is_all_null()).cloned().collect();
    sort_rows(&mut sorted);

    let mut best: BTreeMap<RowKey, CanonicalRow> = BTreeMap::new();
    for row in sorted {
        match best.get(&row.key()) {
            Some(existing) if existing.non_null_values() > row.non_null_values() => {}
            _ => {
                best.insert(row.key(), row);
            }
        }
    }

    let mut out: Vec<CanonicalRow> = best.into_values().collect();
    sort_rows(&mut out);
    out
}
