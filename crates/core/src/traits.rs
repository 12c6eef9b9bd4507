//! Collaborator seams the pipeline depends on.
//!
//! Concrete backends (in-memory maps, cache-dir files, a real store) live
//! in the extract crate or in the caller; the pipeline only ever sees
//! these traits.

use anyhow::Result;
use async_trait::async_trait;

use crate::error::TierError;
use crate::types::TierData;

/// Read-mostly key → JSON store backing the local-cache tier.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;
}

/// Provider of cached filing and transcript text for a ticker.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Plain text of the most recent cached filing, if any.
    async fn filing_text(&self, ticker: &str) -> Result<Option<String>>;

    /// Concatenated transcripts / press releases, if any.
    async fn transcript_text(&self, ticker: &str) -> Result<Option<String>>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        (**self).set(key, value).await
    }
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<T> {
    async fn filing_text(&self, ticker: &str) -> Result<Option<String>> {
        (**self).filing_text(ticker).await
    }

    async fn transcript_text(&self, ticker: &str) -> Result<Option<String>> {
        (**self).transcript_text(ticker).await
    }
}

/// One extraction strategy in the fallback cascade.
#[async_trait]
pub trait TierExtractor: Send + Sync {
    /// Circuit-breaker key identifying the underlying source.
    fn source_key(&self) -> &'static str;

    /// Provenance tag stamped onto produced records.
    fn extraction_method(&self) -> &'static str;

    /// Attempts to produce period records for a ticker. All expected
    /// failure modes come back as `TierError`; this must not panic on bad
    /// source content.
    async fn extract(&self, ticker: &str) -> Result<TierData, TierError>;
}
