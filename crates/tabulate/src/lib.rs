//! Normalization, reconciliation, and derived metrics.
//!
//! This crate turns tier output and loose scraped dicts into one canonical
//! table per ticker:
//! - [`normalize`] pivots period records and scraped dicts onto the fixed
//!   column schema
//! - [`reconcile`] merges tables from different sources without blending
//!   values
//! - [`growth`] appends period-over-period growth and CAGR columns

pub mod growth;
pub mod normalize;
pub mod reconcile;

pub use growth::{add_cagr, add_growth, cagr, growth_pct};
pub use normalize::{sort_rows, tabulate_raw, tabulate_records};
pub use reconcile::{combine, dedupe, Prefer};
