//! Data models for cached news articles and mover summaries.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Article`]: A cached news article, enriched in place with extracted and condensed text
//! - [`Classification`]: Whether a stock is a gainer or a loser for the day
//! - [`SummaryRecord`]: The per-symbol explanation written to the movers directory
//!
//! Cached articles come from an upstream fetcher whose schema we only partly
//! own, so every field we do not read is preserved verbatim in
//! [`Article::extra`].

use crate::extract::NOT_FOUND_SENTINEL;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A news article as stored in `<db>/news/<symbol>_news.json`.
///
/// The upstream cache uses either `url` or `link` for the article address.
/// `full_article_text` may be missing, empty, or the extraction sentinel.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Article {
    /// Canonical article URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Alternate URL field used by some feeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Extracted body text, or the sentinel when extraction failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_article_text: Option<String>,
    /// Condensed text produced by the NLP pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condensed_text: Option<String>,
    /// Upstream metadata (title, publisher, timestamps, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Article {
    /// The address to extract text from: `url`, then `link`.
    ///
    /// Empty strings count as absent.
    pub fn source_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| self.link.as_deref().filter(|u| !u.is_empty()))
    }

    /// True when `full_article_text` holds real extracted text.
    pub fn has_usable_text(&self) -> bool {
        matches!(
            self.full_article_text.as_deref(),
            Some(text) if !text.is_empty() && text != NOT_FOUND_SENTINEL
        )
    }

    /// The article title if the upstream metadata carries one.
    pub fn title(&self) -> Option<&str> {
        self.extra.get("title").and_then(Value::as_str)
    }
}

/// Direction of a stock's daily move.
///
/// A zero change is classified as [`Classification::Loser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Gainer,
    Loser,
}

impl Classification {
    /// Classify a daily change percentage.
    pub fn from_change(change_pct: f64) -> Self {
        if change_pct > 0.0 {
            Classification::Gainer
        } else {
            Classification::Loser
        }
    }

    /// Word used in the per-article summary prompt.
    pub fn direction(self) -> &'static str {
        match self {
            Classification::Gainer => "up",
            Classification::Loser => "down",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Gainer => "gainer",
            Classification::Loser => "loser",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The explanation for one symbol's move, as written to `<db>/movers/<symbol>_summary.json`.
///
/// Each run fully overwrites the previous file for the symbol.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SummaryRecord {
    pub symbol: String,
    pub exchange: String,
    /// Serialized as `type` to match the downstream consumers.
    #[serde(rename = "type")]
    pub classification: Classification,
    /// Only set on the "no news" fallbacks (always `"day"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    pub summary: String,
    /// Filled in by [`crate::pipeline::MoverSummaryPipeline::run`].
    #[serde(default)]
    pub daily_change_percentage: f64,
    /// RFC 3339 UTC timestamp of generation.
    #[serde(default)]
    pub date_generated: String,
}

impl SummaryRecord {
    /// A record without a `period`, before the run stamps change and date.
    pub fn new(
        symbol: &str,
        exchange: &str,
        classification: Classification,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            exchange: exchange.to_string(),
            classification,
            period: None,
            summary: summary.into(),
            daily_change_percentage: 0.0,
            date_generated: String::new(),
        }
    }

    /// Tag the record with a reporting period.
    pub fn with_period(mut self, period: &str) -> Self {
        self.period = Some(period.to_string());
        self
    }
}
