//! Pipeline events and the injected observer seam.
//!
//! The pipeline owns no process-wide telemetry state; callers pass an
//! observer at construction. [`TracingObserver`] is the default and simply
//! forwards to the `tracing` facade.

use serde::Serialize;

/// Lifecycle events emitted while extracting one ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    CascadeStarted {
        ticker: String,
        primary_usable: bool,
    },
    TierAttempted {
        ticker: String,
        tier: String,
    },
    TierSucceeded {
        ticker: String,
        tier: String,
        annual: usize,
        quarterly: usize,
    },
    TierFailed {
        ticker: String,
        tier: String,
        reason: String,
    },
    /// Tier not attempted at all (open circuit).
    TierSkipped {
        ticker: String,
        tier: String,
        reason: String,
    },
    CascadeExhausted {
        ticker: String,
    },
    TablesReconciled {
        ticker: String,
        rows: usize,
    },
}

/// Receives pipeline events. Implementations must be cheap and non-blocking.
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Default observer: structured logs through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::CascadeStarted {
                ticker,
                primary_usable,
            } => {
                tracing::debug!(%ticker, primary_usable, "fallback cascade started");
            }
            PipelineEvent::TierAttempted { ticker, tier } => {
                tracing::debug!(%ticker, %tier, "attempting extraction tier");
            }
            PipelineEvent::TierSucceeded {
                ticker,
                tier,
                annual,
                quarterly,
            } => {
                tracing::info!(%ticker, %tier, annual, quarterly, "extraction tier succeeded");
            }
            PipelineEvent::TierFailed {
                ticker,
                tier,
                reason,
            } => {
                tracing::warn!(%ticker, %tier, %reason, "extraction tier failed");
            }
            PipelineEvent::TierSkipped {
                ticker,
                tier,
                reason,
            } => {
                tracing::warn!(%ticker, %tier, %reason, "extraction tier skipped");
            }
            PipelineEvent::CascadeExhausted { ticker } => {
                tracing::warn!(%ticker, "all extraction tiers failed");
            }
            PipelineEvent::TablesReconciled { ticker, rows } => {
                tracing::info!(%ticker, rows, "sources reconciled");
            }
        }
    }
}

/// Discards every event. Useful in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl PipelineObserver for NullObserver {
    fn on_event(&self, _event: &PipelineEvent) {}
}
