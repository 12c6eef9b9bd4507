//! Ticker-level pipeline facade.
//!
//! Wires the extraction cascade, the normalizer, the reconciler, and the
//! derived-metrics pass into one call per ticker:
//!
//! 1. Validate and normalize the ticker symbol
//! 2. Extract period records (primary facts document, then fallback tiers)
//! 3. Tabulate extraction output and scraped records onto canonical rows
//! 4. Reconcile the two tables, extraction output winning conflicts
//! 5. Append growth and CAGR columns

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use finfacts_core::{
    normalize_ticker, CanonicalRow, DocumentStore, ExtractionResult, KeyValueStore, Metric,
    PipelineConfig, PipelineEvent, PipelineObserver, TierExtractor, TracingObserver,
};
use finfacts_extract::{
    CacheTierExtractor, FactsExtractor, FallbackCascade, FilingTierExtractor, SourceBreaker,
    TranscriptTierExtractor,
};
use finfacts_tabulate::{add_cagr, add_growth, combine, tabulate_raw, tabulate_records, Prefer};

/// One ticker's worth of input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickerRequest {
    pub ticker: String,

    /// Structured company-facts document, when the caller has one.
    pub facts: Option<Value>,

    /// Externally scraped records reconciled against extraction output.
    #[serde(default)]
    pub scraped: Vec<Value>,
}

impl TickerRequest {
    #[must_use]
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_facts(mut self, facts: Value) -> Self {
        self.facts = Some(facts);
        self
    }

    #[must_use]
    pub fn with_scraped(mut self, scraped: Vec<Value>) -> Self {
        self.scraped = scraped;
        self
    }
}

/// Final per-ticker output.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub ticker: String,

    /// Normalization warnings, e.g. a dot-to-dash symbol correction.
    pub warnings: Vec<String>,

    /// Raw extraction outcome, including per-tier failure reasons when the
    /// whole cascade came up empty.
    pub extraction: ExtractionResult,

    /// Reconciled canonical rows with derived columns, sorted by period.
    pub rows: Vec<CanonicalRow>,
}

/// The assembled pipeline. Construct once, run for many tickers.
pub struct Pipeline {
    config: PipelineConfig,
    facts: FactsExtractor,
    cascade: FallbackCascade,
    observer: Arc<dyn PipelineObserver>,
}

impl Pipeline {
    /// Wires the tier extractors onto the given stores. The breaker is
    /// shared across tiers and across calls, so repeated failures of one
    /// source open its circuit for every subsequent ticker.
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        docs: Arc<dyn DocumentStore>,
        cache: Arc<dyn KeyValueStore>,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        let breaker = Arc::new(SourceBreaker::new(config.breaker.clone()));
        let tiers: Vec<Arc<dyn TierExtractor>> = vec![
            Arc::new(FilingTierExtractor::new(Arc::clone(&docs))),
            Arc::new(CacheTierExtractor::new(cache)),
            Arc::new(TranscriptTierExtractor::new(docs)),
        ];
        let cascade =
            FallbackCascade::new(tiers, breaker, config.cascade.clone(), Arc::clone(&observer));

        Self {
            config,
            facts: FactsExtractor::new(),
            cascade,
            observer,
        }
    }

    /// Default configuration and the tracing observer.
    #[must_use]
    pub fn with_defaults(docs: Arc<dyn DocumentStore>, cache: Arc<dyn KeyValueStore>) -> Self {
        Self::new(
            PipelineConfig::default(),
            docs,
            cache,
            Arc::new(TracingObserver),
        )
    }

    /// Runs the full pipeline for one ticker.
    ///
    /// Extraction failure is not an error here: the output then carries an
    /// empty table and the structured failure detail in `extraction`. Only
    /// an unusable ticker symbol fails the call.
    pub async fn run(&self, request: &TickerRequest) -> Result<PipelineOutput> {
        let (ticker, warnings) = normalize_ticker(&request.ticker)?;
        for warning in &warnings {
            tracing::warn!(%ticker, %warning, "ticker normalization");
        }

        let primary = match &request.facts {
            Some(facts) => match self.facts.extract(&ticker, facts) {
                Ok(data) => ExtractionResult::from_tier(data),
                Err(err) => ExtractionResult::primary_error(err.to_string()),
            },
            None => ExtractionResult::primary_error("no company facts document"),
        };

        let extraction = self.cascade.extract(&ticker, primary).await;

        let authoritative =
            tabulate_records(&extraction.all_records(), &self.config.default_currency);
        let scraped = tabulate_raw(&request.scraped, &self.config.default_currency);
        let mut rows = combine(&scraped, &authoritative, Prefer::B);

        add_growth(&mut rows, &Metric::GROWTH_DEFAULTS);
        add_cagr(
            &mut rows,
            &Metric::CAGR_DEFAULTS,
            self.config.cagr_window as u32,
            None,
        );

        self.observer.on_event(&PipelineEvent::TablesReconciled {
            ticker: ticker.clone(),
            rows: rows.len(),
        });

        Ok(PipelineOutput {
            ticker,
            warnings,
            extraction,
            rows,
        })
    }

    /// Runs many tickers concurrently. Output order matches input order;
    /// one ticker's failure never affects the others.
    pub async fn run_many(self: &Arc<Self>, requests: Vec<TickerRequest>) -> Vec<Result<PipelineOutput>> {
        let count = requests.len();
        let mut set = tokio::task::JoinSet::new();
        for (idx, request) in requests.into_iter().enumerate() {
            let pipeline = Arc::clone(self);
            set.spawn(async move { (idx, pipeline.run(&request).await) });
        }

        let mut slots: Vec<Result<PipelineOutput>> = (0..count)
            .map(|_| Err(anyhow::anyhow!("pipeline task aborted")))
            .collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, result)) => slots[idx] = result,
                Err(err) => tracing::error!(%err, "pipeline task panicked"),
            }
        }
        slots
    }
}
