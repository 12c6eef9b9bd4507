//! Pipeline configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-source circuit breaker thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Failures within the sliding window before the circuit opens.
    pub fail_threshold: u32,

    /// Width of the sliding failure window.
    #[serde(with = "duration_secs")]
    pub window: Duration,

    /// How long an opened circuit rejects requests before probing.
    #[serde(with = "duration_secs")]
    pub open_for: Duration,

    /// Concurrent probe requests allowed while half-open.
    pub halfopen_max: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            fail_threshold: 5,
            window: Duration::from_secs(60),
            open_for: Duration::from_secs(60),
            halfopen_max: 1,
        }
    }
}

impl BreakerConfig {
    #[must_use]
    pub fn with_fail_threshold(mut self, threshold: u32) -> Self {
        self.fail_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    #[must_use]
    pub fn with_open_for(mut self, open_for: Duration) -> Self {
        self.open_for = open_for;
        self
    }

    #[must_use]
    pub fn with_halfopen_max(mut self, max: u32) -> Self {
        self.halfopen_max = max;
        self
    }
}

/// Fallback cascade behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Wall-clock budget per tier attempt. Exceeding it fails the tier,
    /// not the pipeline.
    #[serde(with = "duration_secs")]
    pub tier_budget: Duration,

    /// Retry a transient tier failure once before surfacing it.
    pub retry_transient: bool,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            tier_budget: Duration::from_secs(10),
            retry_transient: true,
        }
    }
}

impl CascadeConfig {
    #[must_use]
    pub fn with_tier_budget(mut self, budget: Duration) -> Self {
        self.tier_budget = budget;
        self
    }

    #[must_use]
    pub fn with_retry_transient(mut self, retry: bool) -> Self {
        self.retry_transient = retry;
        self
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub breaker: BreakerConfig,
    pub cascade: CascadeConfig,

    /// Rolling CAGR window in years.
    pub cagr_window: usize,

    /// Currency stamped onto normalized rows when a source omits one.
    pub default_currency: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            breaker: BreakerConfig::default(),
            cascade: CascadeConfig::default(),
            cagr_window: 3,
            default_currency: "USD".to_string(),
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn with_cagr_window(mut self, window: usize) -> Self {
        self.cagr_window = window;
        self
    }

    #[must_use]
    pub fn with_breaker(mut self, breaker: BreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    #[must_use]
    pub fn with_cascade(mut self, cascade: CascadeConfig) -> Self {
        self.cascade = cascade;
        self
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaker_defaults() {
        let config = BreakerConfig::default();
        assert_eq!(config.fail_threshold, 5);
        assert_eq!(config.window, Duration::from_secs(60));
        assert_eq!(config.open_for, Duration::from_secs(60));
        assert_eq!(config.halfopen_max, 1);
    }

    #[test]
    fn test_builder_methods() {
        let config = BreakerConfig::default()
            .with_fail_threshold(3)
            .with_window(Duration::from_secs(30))
            .with_open_for(Duration::from_secs(15))
            .with_halfopen_max(2);
        assert_eq!(config.fail_threshold, 3);
        assert_eq!(config.window, Duration::from_secs(30));
        assert_eq!(config.open_for, Duration::from_secs(15));
        assert_eq!(config.halfopen_max, 2);
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.breaker.fail_threshold, config.breaker.fail_threshold);
        assert_eq!(back.cascade.tier_budget, config.cascade.tier_budget);
        assert_eq!(back.cagr_window, 3);
        assert_eq!(back.default_currency, "USD");
    }
}
