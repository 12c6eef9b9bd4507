//! The fallback cascade.
//!
//! Orchestrates tier extractors in strict priority order and stops at the
//! first one that yields records. A usable primary result short-circuits
//! everything; total failure returns a structured result carrying every
//! tier's individual reason.

use std::collections::BTreeMap;
use std::sync::Arc;

use finfacts_core::{
    CascadeConfig, ExtractionResult, PipelineEvent, PipelineObserver, TierData, TierError,
    TierExtractor,
};

use crate::breaker::SourceBreaker;

/// Sequential tier orchestration with per-tier budgets and breaker gating.
pub struct FallbackCascade {
    tiers: Vec<Arc<dyn TierExtractor>>,
    breaker: Arc<SourceBreaker>,
    config: CascadeConfig,
    observer: Arc<dyn PipelineObserver>,
}

impl FallbackCascade {
    #[must_use]
    pub fn new(
        tiers: Vec<Arc<dyn TierExtractor>>,
        breaker: Arc<SourceBreaker>,
        config: CascadeConfig,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        Self {
            tiers,
            breaker,
            config,
            observer,
        }
    }

    /// Runs the cascade for one ticker.
    ///
    /// Pure over its tiers' outputs: given the same tier results, the same
    /// tier always wins regardless of timing.
    pub async fn extract(&self, ticker: &str, primary: ExtractionResult) -> ExtractionResult {
        self.observer.on_event(&PipelineEvent::CascadeStarted {
            ticker: ticker.to_string(),
            primary_usable: primary.has_data(),
        });

        if primary.has_data() {
            return primary;
        }

        let mut tier_results = BTreeMap::new();
        tier_results.insert(
            "primary".to_string(),
            primary
                .error
                .unwrap_or_else(|| "no data extracted".to_string()),
        );

        for tier in &self.tiers {
            let tier_key = tier.source_key();
            match self.attempt_tier(ticker, tier.as_ref()).await {
                Ok(data) => {
                    self.observer.on_event(&PipelineEvent::TierSucceeded {
                        ticker: ticker.to_string(),
                        tier: tier_key.to_string(),
                        annual: data.annual.len(),
                        quarterly: data.quarterly.len(),
                    });
                    return ExtractionResult::from_tier(data);
                }
                Err(err) => {
                    let event = if matches!(err, TierError::CircuitOpen(_)) {
                        PipelineEvent::TierSkipped {
                            ticker: ticker.to_string(),
                            tier: tier_key.to_string(),
                            reason: err.to_string(),
                        }
                    } else {
                        PipelineEvent::TierFailed {
                            ticker: ticker.to_string(),
                            tier: tier_key.to_string(),
                            reason: err.to_string(),
                        }
                    };
                    self.observer.on_event(&event);
                    tier_results.insert(tier_key.to_string(), err.to_string());
                }
            }
        }

        self.observer.on_event(&PipelineEvent::CascadeExhausted {
            ticker: ticker.to_string(),
        });
        ExtractionResult::failure("all fallback tiers failed", tier_results)
    }

    /// One tier attempt under the breaker contract, with a single retry
    /// for transient failures.
    async fn attempt_tier(
        &self,
        ticker: &str,
        tier: &dyn TierExtractor,
    ) -> Result<TierData, TierError> {
        let key = tier.source_key();
        if !self.breaker.allow(key) {
            return Err(TierError::CircuitOpen(key.to_string()));
        }

        self.observer.on_event(&PipelineEvent::TierAttempted {
            ticker: ticker.to_string(),
            tier: key.to_string(),
        });

        self.breaker.on_attempt_start(key);
        let mut result = self.run_once(ticker, tier).await;
        if self.config.retry_transient && result.as_ref().is_err_and(TierError::is_retryable) {
            tracing::debug!(%ticker, tier = key, "retrying transient tier failure");
            result = self.run_once(ticker, tier).await;
        }

        match &result {
            Ok(_) => self.breaker.record_success(key),
            Err(err) if err.counts_against_breaker() => self.breaker.record_failure(key),
            Err(_) => {}
        }
        self.breaker.on_attempt_done(key);
        result
    }

    async fn run_once(&self, ticker: &str, tier: &dyn TierExtractor) -> Result<TierData, TierError> {
        let budget = self.config.tier_budget;
        match tokio::time::timeout(budget, tier.extract(ticker)).await {
            Ok(result) => result.and_then(|data| {
                // Zero records is a failed tier even without an error.
                if data.is_empty() {
                    Err(TierError::NoData("tier produced no records".to_string()))
                } else {
                    Ok(data)
                }
            }),
            Err(_) => Err(TierError::Timeout(budget)),
        }
    }
}
