//! Core types, traits, and configuration for the financial facts pipeline.
//!
//! This crate defines:
//! - The canonical data model (`PeriodRecord`, `CanonicalRow`, `Metric`)
//! - The uniform tier contract (`ExtractionResult`, `TierError`)
//! - Collaborator traits the pipeline is generic over
//! - Configuration and the observer/event seam

pub mod config;
pub mod error;
pub mod events;
pub mod metric;
pub mod numeric;
pub mod row;
pub mod ticker;
pub mod traits;
pub mod types;

pub use config::{BreakerConfig, CascadeConfig, PipelineConfig};
pub use error::{TickerError, TierError};
pub use events::{NullObserver, PipelineEvent, PipelineObserver, TracingObserver};
pub use metric::Metric;
pub use row::{CanonicalRow, DerivedCell, MetricNote, RowKey};
pub use ticker::normalize_ticker;
pub use traits::{DocumentStore, KeyValueStore, TierExtractor};
pub use types::{
    ExtractionResult, PeriodRecord, Quarter, Source, TierData, MAX_ANNUAL_PERIODS,
    MAX_QUARTERLY_PERIODS,
};
