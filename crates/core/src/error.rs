//! Error taxonomy for extraction tiers.
//!
//! Expected failure modes travel as values so the cascade can always move
//! on to the next tier; panics are reserved for programming errors.

use std::time::Duration;

use thiserror::Error;

/// Why a single tier failed to produce data.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TierError {
    /// Transient source failure (timeout upstream, connection reset, 5xx).
    /// Retried once inside the cascade, then counted against the breaker.
    #[error("transient source failure: {0}")]
    Transient(String),

    /// Definitive absence of data (404-style). Not retried and not counted
    /// as a breaker failure: the source is healthy, it just has nothing.
    #[error("no data available: {0}")]
    NoData(String),

    /// The source responded but its content could not be interpreted.
    #[error("parse failure: {0}")]
    Parse(String),

    /// The tier exceeded its wall-clock budget.
    #[error("tier timed out after {0:?}")]
    Timeout(Duration),

    /// The per-source circuit breaker rejected the attempt.
    #[error("circuit open for source {0:?}")]
    CircuitOpen(String),
}

impl TierError {
    /// Whether this failure should be recorded against the source's
    /// circuit breaker. Only instability counts; absence and local parse
    /// problems do not indicate a failing source.
    #[must_use]
    pub fn counts_against_breaker(&self) -> bool {
        matches!(self, TierError::Transient(_) | TierError::Timeout(_))
    }

    /// Whether a single in-tier retry is worthwhile.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, TierError::Transient(_))
    }
}

/// Ticker input that cannot be normalized into a symbol.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TickerError {
    #[error("ticker symbol required")]
    Empty,

    #[error("{0:?} doesn't look like a ticker symbol")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaker_accounting_split() {
        assert!(TierError::Transient("reset".into()).counts_against_breaker());
        assert!(TierError::Timeout(Duration::from_secs(10)).counts_against_breaker());
        assert!(!TierError::NoData("404".into()).counts_against_breaker());
        assert!(!TierError::Parse("bad shape".into()).counts_against_breaker());
        assert!(!TierError::CircuitOpen("tier1_filing".into()).counts_against_breaker());
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(TierError::Transient("reset".into()).is_retryable());
        assert!(!TierError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!TierError::NoData("missing".into()).is_retryable());
    }
}
