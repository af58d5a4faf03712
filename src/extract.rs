//! Article body extraction.
//!
//! Fetches an article page and pulls its body text out of the HTML. Failure
//! is reported in-band with [`NOT_FOUND_SENTINEL`] rather than an error, so the
//! pipeline can count usable articles without caring why one failed.
//!
//! # Extraction order
//!
//! 1. JSON-LD `articleBody` (most publishers embed the full body there)
//! 2. Paragraphs inside `<article>`
//! 3. Every `<p>` on the page
//!
//! Paragraphs shorter than [`MIN_PARAGRAPH_CHARS`] are dropped; on news pages
//! they are almost always bylines, captions, or navigation.

use crate::error::Result;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Marks an article whose text could not be extracted.
pub const NOT_FOUND_SENTINEL: &str = "Full article text not found.";

/// Paragraphs shorter than this are treated as page furniture.
pub const MIN_PARAGRAPH_CHARS: usize = 40;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

static JSON_LD: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script[type='application/ld+json']").unwrap());
static ARTICLE_PARAGRAPHS: Lazy<Selector> = Lazy::new(|| Selector::parse("article p").unwrap());
static PARAGRAPHS: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

/// Turns an article URL into its body text.
pub trait ArticleExtractor {
    /// Extract the article text, or [`NOT_FOUND_SENTINEL`] when none was found.
    async fn extract(&self, url: &str) -> Result<String>;
}

/// Extractor that downloads the page with `reqwest` and parses it with `scraper`.
#[derive(Debug, Clone)]
pub struct HttpExtractor {
    client: Client,
}

impl HttpExtractor {
    pub fn new(timeout: Duration) -> std::result::Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &str) -> std::result::Result<String, Box<dyn std::error::Error>> {
        let parsed = Url::parse(url)?;
        let body = self
            .client
            .get(parsed)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

impl ArticleExtractor for HttpExtractor {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn extract(&self, url: &str) -> Result<String> {
        let t0 = Instant::now();
        let html = match self.fetch(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(error = %e, "Article fetch failed");
                return Ok(NOT_FOUND_SENTINEL.to_string());
            }
        };

        match extract_text_from_html(&html) {
            Some(text) => {
                info!(
                    bytes = text.len(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Extracted article text"
                );
                Ok(text)
            }
            None => {
                warn!("No article text found in page");
                Ok(NOT_FOUND_SENTINEL.to_string())
            }
        }
    }
}

/// Pull article text out of an HTML document.
///
/// Returns `None` when nothing that looks like article prose was found.
pub fn extract_text_from_html(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    if let Some(body) = json_ld_article_body(&document) {
        debug!(bytes = body.len(), "Using JSON-LD articleBody");
        return Some(body);
    }

    let text = collect_paragraphs(&document, &ARTICLE_PARAGRAPHS)
        .or_else(|| collect_paragraphs(&document, &PARAGRAPHS))?;
    Some(text)
}

fn json_ld_article_body(document: &Html) -> Option<String> {
    for script in document.select(&JSON_LD) {
        let raw = script.text().collect::<String>();
        let Ok(json) = serde_json::from_str::<Value>(raw.trim()) else {
            continue;
        };
        // JSON-LD may be a single object, an array, or an @graph container.
        let candidates: Vec<&Value> = match &json {
            Value::Array(items) => items.iter().collect(),
            Value::Object(obj) => match obj.get("@graph") {
                Some(Value::Array(items)) => items.iter().collect(),
                _ => vec![&json],
            },
            _ => continue,
        };
        for candidate in candidates {
            if let Some(body) = candidate.get("articleBody").and_then(Value::as_str) {
                let body = body.trim();
                if !body.is_empty() {
                    return Some(body.to_string());
                }
            }
        }
    }
    None
}

fn collect_paragraphs(document: &Html, selector: &Selector) -> Option<String> {
    let paragraphs: Vec<String> = document
        .select(selector)
        .map(|p| normalize_whitespace(&p.text().collect::<Vec<_>>().join(" ")))
        .filter(|p| p.chars().count() >= MIN_PARAGRAPH_CHARS)
        .collect();

    if paragraphs.is_empty() {
        None
    } else {
        Some(paragraphs.join("\n\n"))
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: &str = "Apple shares rose 4% after the company reported record iPhone revenue.";

    #[test]
    fn test_prefers_json_ld_article_body() {
        let html = format!(
            r#"<html><head><script type="application/ld+json">
            {{"@type": "NewsArticle", "articleBody": "Body from JSON-LD."}}
            </script></head><body><article><p>{LONG}</p></article></body></html>"#
        );
        assert_eq!(extract_text_from_html(&html).as_deref(), Some("Body from JSON-LD."));
    }

    #[test]
    fn test_json_ld_graph_container() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@graph": [{"@type": "WebPage"}, {"@type": "NewsArticle", "articleBody": "Graph body."}]}
            </script></head><body></body></html>"#;
        assert_eq!(extract_text_from_html(html).as_deref(), Some("Graph body."));
    }

    #[test]
    fn test_article_paragraphs_skip_short_ones() {
        let html = format!(
            "<html><body><nav><p>Sign in to read more stories from us today</p></nav>\
             <article><p>By Staff</p><p>{LONG}</p><p>  The   gain   extended a three-day rally for the stock.  </p></article></body></html>"
        );
        let text = extract_text_from_html(&html).unwrap();
        assert!(text.starts_with(LONG));
        assert!(text.contains("The gain extended a three-day rally for the stock."));
        assert!(!text.contains("By Staff"));
        assert!(!text.contains("Sign in"));
    }

    #[test]
    fn test_falls_back_to_all_paragraphs() {
        let html = format!("<html><body><div><p>{LONG}</p></div></body></html>");
        assert_eq!(extract_text_from_html(&html).as_deref(), Some(LONG));
    }

    #[test]
    fn test_no_prose_returns_none() {
        let html = "<html><body><p>Menu</p><p>Login</p></body></html>";
        assert!(extract_text_from_html(html).is_none());
    }

    #[tokio::test]
    async fn test_invalid_url_yields_sentinel() {
        let extractor = HttpExtractor::new(Duration::from_secs(1)).unwrap();
        let text = extractor.extract("not a url").await.unwrap();
        assert_eq!(text, NOT_FOUND_SENTINEL);
    }
}
