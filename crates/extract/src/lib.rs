//! Multi-tier fallback extraction.
//!
//! This crate provides:
//! - A per-source circuit breaker with a sliding failure window
//! - Four tier extractors, from structured facts down to transcript
//!   heuristics
//! - The fallback cascade orchestrating them
//! - In-memory, file-backed, and cache-directory store backends

pub mod breaker;
pub mod cascade;
pub mod stores;
pub mod tiers;

pub use breaker::{CircuitState, SourceBreaker};
pub use cascade::FallbackCascade;
pub use stores::{FileKvStore, FsDocumentStore, MemoryKvStore};
pub use tiers::{CacheTierExtractor, FactsExtractor, FilingTierExtractor, TranscriptTierExtractor};
