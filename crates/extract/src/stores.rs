//! Store backends for the collaborator traits.
//!
//! The pipeline never depends on a concrete backend; these are the
//! batteries-included implementations for local runs and tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use finfacts_core::{DocumentStore, KeyValueStore};

// =============================================================================
// Key-value stores
// =============================================================================

/// In-memory key → JSON store.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    map: RwLock<HashMap<String, Value>>,
}

impl MemoryKvStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.map.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.map.write().insert(key.to_string(), value);
        Ok(())
    }
}

/// Key → JSON store persisted as a single JSON object on disk.
///
/// Loads the whole map at construction and rewrites the file on every
/// `set`. Suitable for the small per-ticker caches this pipeline reads,
/// not for high write volume.
#[derive(Debug)]
pub struct FileKvStore {
    path: PathBuf,
    map: RwLock<HashMap<String, Value>>,
}

impl FileKvStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let map = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("corrupt cache file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("reading cache file {}", path.display()))
            }
        };
        Ok(Self {
            path,
            map: RwLock::new(map),
        })
    }

    fn flush(&self) -> Result<()> {
        let map = self.map.read();
        let contents = serde_json::to_string_pretty(&*map)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("writing cache file {}", self.path.display()))
    }
}

#[async_trait]
impl KeyValueStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.map.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.map.write().insert(key.to_string(), value);
        self.flush()
    }
}

// =============================================================================
// Document store
// =============================================================================

/// Cache-directory document store.
///
/// Filings are files named `{TICKER}_*10k*` / `{TICKER}_*10q*` with an
/// `.htm`/`.html`/`.txt` extension; transcripts are
/// `{TICKER}_earnings*`, `{TICKER}_press_release*`, or
/// `{TICKER}_conference_call*` text files. Markup is stripped to plain
/// text before pattern matching.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    cache_dir: PathBuf,
}

impl FsDocumentStore {
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    fn matching_files(&self, predicate: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("reading cache dir {}", self.cache_dir.display()))
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |name| predicate(&name.to_ascii_lowercase()))
            })
            .collect();
        paths.sort();
        Ok(paths)
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn filing_text(&self, ticker: &str) -> Result<Option<String>> {
        let prefix = format!("{}_", ticker.to_ascii_lowercase());
        let paths = self.matching_files(|name| {
            name.starts_with(&prefix)
                && (name.contains("10k") || name.contains("10q"))
                && (name.ends_with(".htm") || name.ends_with(".html") || name.ends_with(".txt"))
        })?;

        let Some(path) = paths.first() else {
            return Ok(None);
        };
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading filing {}", path.display()))?;
        Ok(Some(strip_markup(&contents)))
    }

    async fn transcript_text(&self, ticker: &str) -> Result<Option<String>> {
        let prefix = format!("{}_", ticker.to_ascii_lowercase());
        let paths = self.matching_files(|name| {
            name.starts_with(&prefix)
                && name.ends_with(".txt")
                && (name.contains("earnings")
                    || name.contains("press_release")
                    || name.contains("conference_call"))
        })?;

        if paths.is_empty() {
            return Ok(None);
        }
        let mut combined = String::new();
        for path in paths {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading transcript {}", path.display()))?;
            combined.push_str(&contents);
            combined.push('\n');
        }
        Ok(Some(combined))
    }
}

/// Minimal tag strip for cached HTML filings. Keeps the text content so
/// the tier-1 patterns can run over statements and tables alike.
fn strip_markup(html: &str) -> String {
    static TAG: std::sync::LazyLock<regex::Regex> =
        std::sync::LazyLock::new(|| regex::Regex::new(r"<[^>]*>").unwrap());
    let text = TAG.replace_all(html, " ");
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&#8217;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryKvStore::new();
        assert!(store.get("missing").await.unwrap().is_none());

        store.set("k", serde_json::json!({"a": 1})).await.unwrap();
        assert_eq!(
            store.get("k").await.unwrap(),
            Some(serde_json::json!({"a": 1}))
        );
    }

    #[tokio::test]
    async fn test_file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        {
            let store = FileKvStore::open(&path).unwrap();
            store
                .set("FOUR_revenue_cache", serde_json::json!([{"year": 2023}]))
                .await
                .unwrap();
        }

        let reopened = FileKvStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("FOUR_revenue_cache").await.unwrap(),
            Some(serde_json::json!([{"year": 2023}]))
        );
    }

    #[tokio::test]
    async fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::open(dir.path().join("absent.json")).unwrap();
        assert!(store.get("anything").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_document_store_finds_filing_and_strips_markup() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("four_latest_10k.htm"),
            "<html><body><p>Revenue of $1,000 million for fiscal year 2023.</p></body></html>",
        )
        .unwrap();

        let store = FsDocumentStore::new(dir.path());
        let text = store.filing_text("FOUR").await.unwrap().unwrap();
        assert!(text.contains("Revenue of $1,000 million"));
        assert!(!text.contains('<'));

        assert!(store.filing_text("AAPL").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_document_store_concatenates_transcripts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("four_earnings_q3.txt"), "first part").unwrap();
        std::fs::write(dir.path().join("four_press_release_2023.txt"), "second part").unwrap();
        std::fs::write(dir.path().join("aapl_earnings_q3.txt"), "other ticker").unwrap();

        let store = FsDocumentStore::new(dir.path());
        let text = store.transcript_text("FOUR").await.unwrap().unwrap();
        assert!(text.contains("first part"));
        assert!(text.contains("second part"));
        assert!(!text.contains("other ticker"));
    }

    #[tokio::test]
    async fn test_document_store_missing_dir_is_none() {
        let store = FsDocumentStore::new("/nonexistent/cache/dir");
        assert!(store.filing_text("FOUR").await.unwrap().is_none());
        assert!(store.transcript_text("FOUR").await.unwrap().is_none());
    }
}
