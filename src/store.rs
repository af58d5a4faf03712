//! File layout of the stock database: cached news in, mover summaries out.
//!
//! # Layout
//!
//! ```text
//! STOCK_DB/
//! ├── news/
//! │   ├── AAPL_news.json     # cached articles, newest first
//! │   └── MSFT_news.json
//! └── movers/
//!     ├── AAPL_summary.json  # overwritten on every run
//!     └── MSFT_summary.json
//! ```

use crate::error::{PipelineError, Result};
use crate::models::{Article, SummaryRecord};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

const NEWS_SUFFIX: &str = "_news.json";
const SUMMARY_SUFFIX: &str = "_summary.json";

/// Paths and JSON I/O rooted at a stock database directory.
#[derive(Debug, Clone)]
pub struct NewsStore {
    root: PathBuf,
}

impl NewsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn news_dir(&self) -> PathBuf {
        self.root.join("news")
    }

    pub fn movers_dir(&self) -> PathBuf {
        self.root.join("movers")
    }

    pub fn news_path(&self, symbol: &str) -> Result<PathBuf> {
        validate_symbol(symbol)?;
        Ok(self.news_dir().join(format!("{symbol}{NEWS_SUFFIX}")))
    }

    pub fn summary_path(&self, symbol: &str) -> Result<PathBuf> {
        validate_symbol(symbol)?;
        Ok(self.movers_dir().join(format!("{symbol}{SUMMARY_SUFFIX}")))
    }

    /// Whether a news cache exists for `symbol`.
    ///
    /// Only a missing file is `Ok(false)`; failures to inspect the path
    /// (permissions, a file where a directory should be) are errors.
    pub async fn news_exists(&self, symbol: &str) -> Result<bool> {
        Ok(fs::try_exists(self.news_path(symbol)?).await?)
    }

    /// Read every cached article for `symbol`.
    pub async fn read_news(&self, symbol: &str) -> Result<Vec<Article>> {
        load_json(&self.news_path(symbol)?).await
    }

    /// All `*_news.json` files in the news directory, sorted by file name.
    #[instrument(level = "info", skip_all, fields(dir = %self.news_dir().display()))]
    pub async fn list_news_files(&self) -> Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(self.news_dir()).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if symbol_from_news_file(&path).is_some() {
                files.push(path);
            }
        }
        files.sort();
        info!(count = files.len(), "Found stocks with news data");
        Ok(files)
    }

    /// Write a summary record, creating the movers directory if needed.
    #[instrument(level = "info", skip_all, fields(symbol = %record.symbol))]
    pub async fn write_summary(&self, record: &SummaryRecord) -> Result<PathBuf> {
        fs::create_dir_all(self.movers_dir()).await?;
        let path = self.summary_path(&record.symbol)?;
        save_json(record, &path).await?;
        Ok(path)
    }
}

/// Reject symbols that would escape the database directory.
///
/// Tickers like `BRK.B` are fine; anything with a path separator is not.
pub fn validate_symbol(symbol: &str) -> Result<()> {
    let bad = symbol.trim().is_empty()
        || symbol.contains(['/', '\\', '\0'])
        || symbol == "."
        || symbol == "..";
    if bad {
        return Err(PipelineError::InvalidSymbol(symbol.to_string()));
    }
    Ok(())
}

/// The symbol encoded in a news cache file name (`AAPL_news.json` -> `AAPL`).
pub fn symbol_from_news_file(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let symbol = name.strip_suffix(NEWS_SUFFIX)?;
    (!symbol.is_empty()).then(|| symbol.to_string())
}

/// Deserialize a JSON file.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read(path).await?;
    debug!(path = %path.display(), bytes = raw.len(), "Read JSON");
    Ok(serde_json::from_slice(&raw)?)
}

/// Serialize `value` as pretty JSON, replacing any existing file.
pub async fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).await?;
    debug!(path = %path.display(), "Wrote JSON");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Classification;

    #[test]
    fn test_symbol_from_news_file() {
        assert_eq!(
            symbol_from_news_file(Path::new("STOCK_DB/news/AAPL_news.json")),
            Some("AAPL".to_string())
        );
        assert_eq!(
            symbol_from_news_file(Path::new("BRK.B_news.json")),
            Some("BRK.B".to_string())
        );
        assert_eq!(symbol_from_news_file(Path::new("_news.json")), None);
        assert_eq!(symbol_from_news_file(Path::new("AAPL_summary.json")), None);
        assert_eq!(symbol_from_news_file(Path::new("notes.txt")), None);
    }

    #[test]
    fn test_validate_symbol() {
        assert!(validate_symbol("AAPL").is_ok());
        assert!(validate_symbol("BRK.B").is_ok());
        assert!(validate_symbol("^GSPC").is_ok());
        for bad in ["", "  ", "..", "../etc/passwd", "a/b", "a\\b", "nul\0"] {
            assert!(
                matches!(validate_symbol(bad), Err(PipelineError::InvalidSymbol(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_paths_reject_traversal() {
        let tmp = tempfile::tempdir().unwrap();
        let store = NewsStore::new(tmp.path().join("STOCK_DB"));
        assert!(store.news_path("../../outside").is_err());
        assert!(store.summary_path("../x").is_err());
        assert!(store.read_news("../x").await.is_err());

        let record = SummaryRecord::new("../escape", "NASDAQ", Classification::Loser, "x");
        let err = store.write_summary(&record).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSymbol(_)));
        assert!(!tmp.path().join("escape_summary.json").exists());
    }

    #[tokio::test]
    async fn test_news_exists_distinguishes_missing_from_inaccessible() {
        let tmp = tempfile::tempdir().unwrap();
        let store = NewsStore::new(tmp.path());
        assert!(!store.news_exists("AAPL").await.unwrap());

        // A regular file where the news directory should be.
        fs::write(store.news_dir(), "not a directory").await.unwrap();
        assert!(matches!(
            store.news_exists("AAPL").await,
            Err(PipelineError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_list_news_files_is_sorted_and_filtered() {
        let tmp = tempfile::tempdir().unwrap();
        let store = NewsStore::new(tmp.path());
        fs::create_dir_all(store.news_dir()).await.unwrap();
        for name in ["MSFT_news.json", "AAPL_news.json", "README.md"] {
            fs::write(store.news_dir().join(name), "[]").await.unwrap();
        }

        let files = store.list_news_files().await.unwrap();
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| symbol_from_news_file(p))
            .collect();
        assert_eq!(names, vec!["AAPL", "MSFT"]);
    }

    #[tokio::test]
    async fn test_read_news_reports_parse_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let store = NewsStore::new(tmp.path());
        fs::create_dir_all(store.news_dir()).await.unwrap();
        fs::write(store.news_path("BAD").unwrap(), "{not json").await.unwrap();

        let err = store.read_news("BAD").await.unwrap_err();
        assert!(matches!(err, PipelineError::Json(_)));

        let missing = store.read_news("NONE").await.unwrap_err();
        assert!(matches!(missing, PipelineError::Io(_)));
    }

    #[tokio::test]
    async fn test_write_summary_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let store = NewsStore::new(tmp.path());

        let first = SummaryRecord::new("AAPL", "NASDAQ", Classification::Gainer, "first");
        store.write_summary(&first).await.unwrap();
        let second = SummaryRecord::new("AAPL", "NASDAQ", Classification::Loser, "second");
        let path = store.write_summary(&second).await.unwrap();

        assert_eq!(path, tmp.path().join("movers").join("AAPL_summary.json"));
        let back: SummaryRecord = load_json(&path).await.unwrap();
        assert_eq!(back, second);
    }
}
