//! The mover summary pipeline.
//!
//! For one symbol: load the cached news, make sure each article has text,
//! condense the batch, summarize each condensed article, and merge those
//! summaries into one explanation of the day's move. The result is always a
//! [`SummaryRecord`]; when any step cannot produce an explanation the record
//! carries a fixed fallback text instead.
//!
//! # Decision flow
//!
//! ```text
//! no articles ──────────────────────────────► NO_NEWS (period = day)
//! extract missing text ─► none usable ──────► NO_NEWS (period = day)
//! condense ─► summarize each ─► none ───────► NO_VALID_SUMMARIES
//!                             └► aggregate ─► explanation
//! any collaborator error ───────────────────► SUMMARY_ERROR
//! ```
//!
//! Only the two "no news" fallbacks carry `period`. Downstream readers rely
//! on that shape, so it is kept as-is.

use crate::api::{Summarizer, clean_article_summary};
use crate::error::Result;
use crate::extract::ArticleExtractor;
use crate::models::{Article, Classification, SummaryRecord};
use crate::nlp::Condenser;
use crate::pacing::Pacer;
use crate::price::PriceProvider;
use crate::store::{NewsStore, symbol_from_news_file, validate_symbol};
use crate::utils::{preview, truncate_for_log};
use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

pub const NO_NEWS_SUMMARY: &str = "There are no news currently affecting the stock price, fluctuations might be due to market conditions.";
pub const NO_VALID_SUMMARIES: &str = "No valid article summaries could be generated.";
pub const SUMMARY_ERROR: &str = "There was an error generating the summary.";

/// Runtime knobs for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Exchange label used by [`MoverSummaryPipeline::run_all`].
    pub exchange: String,
    /// How many of the most recent cached articles to use.
    pub max_articles: usize,
    /// Minimum gap between per-article summarizer calls.
    pub article_delay: Duration,
    /// Minimum gap between symbols in a batch run.
    pub symbol_delay: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            exchange: "NASDAQ".to_string(),
            max_articles: 5,
            article_delay: Duration::from_secs(2),
            symbol_delay: Duration::from_secs(3),
        }
    }
}

/// Outcome of a batch run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchReport {
    /// Symbols whose summary file was written.
    pub processed: Vec<String>,
    /// News files that could not be processed.
    pub failed: Vec<String>,
}

/// What the collaborators managed to produce for a non-empty article list.
#[derive(Debug)]
enum Explanation {
    NoUsableText,
    NoSummaries,
    Summary(String),
}

pub struct MoverSummaryPipeline<E, C, S, P> {
    store: NewsStore,
    extractor: E,
    condenser: C,
    summarizer: S,
    prices: P,
    settings: PipelineSettings,
    article_pacer: Pacer,
    symbol_pacer: Pacer,
}

impl<E, C, S, P> MoverSummaryPipeline<E, C, S, P>
where
    E: ArticleExtractor,
    C: Condenser,
    S: Summarizer,
    P: PriceProvider,
{
    pub fn new(
        store: NewsStore,
        extractor: E,
        condenser: C,
        summarizer: S,
        prices: P,
        settings: PipelineSettings,
    ) -> Self {
        let article_pacer = Pacer::new("article", settings.article_delay);
        let symbol_pacer = Pacer::new("symbol", settings.symbol_delay);
        Self {
            store,
            extractor,
            condenser,
            summarizer,
            prices,
            settings,
            article_pacer,
            symbol_pacer,
        }
    }

    pub fn store(&self) -> &NewsStore {
        &self.store
    }

    /// Gainer when the change is strictly positive, loser otherwise.
    pub fn classify(change_pct: f64) -> Classification {
        Classification::from_change(change_pct)
    }

    /// The most recent cached articles for `symbol`.
    ///
    /// A missing or unreadable cache is not an error: it is logged and the
    /// symbol is treated as having no news. Only a missing file is reported
    /// as "no news file"; anything else is logged as an error.
    #[instrument(level = "info", skip(self))]
    pub async fn load_recent_news(&self, symbol: &str) -> Vec<Article> {
        match self.store.news_exists(symbol).await {
            Ok(true) => {}
            Ok(false) => {
                warn!("No news file found");
                return Vec::new();
            }
            Err(e) => {
                error!(stage = e.stage(), error = %e, "Cannot access news file");
                return Vec::new();
            }
        }

        match self.store.read_news(symbol).await {
            Ok(articles) => self.most_recent(articles),
            Err(e) => {
                error!(error = %e, "Error loading news");
                Vec::new()
            }
        }
    }

    fn most_recent(&self, mut articles: Vec<Article>) -> Vec<Article> {
        articles.truncate(self.settings.max_articles);
        articles
    }

    /// Explain the move for `symbol`, falling back to fixed texts.
    ///
    /// Never fails: collaborator errors are logged with their stage and turned
    /// into the [`SUMMARY_ERROR`] record.
    #[instrument(level = "info", skip(self, articles), fields(count = articles.len()))]
    pub async fn build_summary(
        &mut self,
        symbol: &str,
        exchange: &str,
        articles: Vec<Article>,
        classification: Classification,
    ) -> SummaryRecord {
        info!(%classification, "Processing data for symbol");

        if articles.is_empty() {
            info!("No news articles found");
            return no_news(symbol, exchange, classification);
        }

        match self.explain(symbol, articles, classification).await {
            Ok(Explanation::Summary(text)) => {
                SummaryRecord::new(symbol, exchange, classification, text)
            }
            Ok(Explanation::NoUsableText) => {
                info!("No article text could be extracted; skipping summary");
                no_news(symbol, exchange, classification)
            }
            Ok(Explanation::NoSummaries) => {
                info!("No valid summaries generated");
                SummaryRecord::new(symbol, exchange, classification, NO_VALID_SUMMARIES)
            }
            Err(e) => {
                error!(stage = e.stage(), error = %e, "Error summarizing articles");
                SummaryRecord::new(symbol, exchange, classification, SUMMARY_ERROR)
            }
        }
    }

    async fn explain(
        &mut self,
        symbol: &str,
        mut articles: Vec<Article>,
        classification: Classification,
    ) -> Result<Explanation> {
        let mut with_text = 0usize;
        for article in articles.iter_mut() {
            if article.has_usable_text() {
                with_text += 1;
                continue;
            }
            let Some(url) = article.source_url().map(str::to_string) else {
                debug!("Article has neither text nor URL");
                continue;
            };
            debug!(title = ?article.title(), %url, "Extracting article text");
            let text = self.extractor.extract(&url).await?;
            article.full_article_text = Some(text);
            if article.has_usable_text() {
                with_text += 1;
            }
        }
        info!(with_text, total = articles.len(), "Article text available");
        if with_text == 0 {
            return Ok(Explanation::NoUsableText);
        }

        let condensed = self
            .condenser
            .process_articles_batch(articles, symbol, symbol)?;

        let mut summaries = Vec::new();
        for (i, article) in condensed.iter().enumerate() {
            let text = article.condensed_text.as_deref().unwrap_or_default();
            if text.is_empty() {
                continue;
            }
            debug!(index = i, condensed = %truncate_for_log(text, 300), "Condensed text");

            self.article_pacer.wait().await;
            let summary = self
                .summarizer
                .summarize_article(text, symbol, classification.direction())
                .await?;
            let summary = clean_article_summary(&summary);
            if summary.is_empty() {
                debug!(index = i, "Empty article summary");
            } else {
                summaries.push(summary);
            }
        }

        if summaries.is_empty() {
            return Ok(Explanation::NoSummaries);
        }
        let explanation = self.summarizer.summarize_articles(&summaries, symbol).await?;
        Ok(Explanation::Summary(explanation))
    }

    /// Generate, stamp and persist the summary for one symbol.
    ///
    /// Returns an error when the symbol is not a valid file name component or
    /// when the summary file cannot be written.
    #[instrument(level = "info", skip(self))]
    pub async fn run(
        &mut self,
        symbol: &str,
        exchange: &str,
        change_pct: f64,
    ) -> Result<SummaryRecord> {
        validate_symbol(symbol)?;
        let articles = self.load_recent_news(symbol).await;
        self.run_with_articles(symbol, exchange, change_pct, articles)
            .await
    }

    /// [`run`](Self::run) with the change taken from the price provider.
    pub async fn run_symbol(&mut self, symbol: &str, exchange: &str) -> Result<SummaryRecord> {
        let change = self.prices.daily_change(symbol);
        info!(%symbol, change = %format!("{change:.2}"), "Processing symbol");
        self.run(symbol, exchange, change).await
    }

    async fn run_with_articles(
        &mut self,
        symbol: &str,
        exchange: &str,
        change_pct: f64,
        articles: Vec<Article>,
    ) -> Result<SummaryRecord> {
        let t0 = Instant::now();
        let classification = Self::classify(change_pct);
        let mut record = self
            .build_summary(symbol, exchange, articles, classification)
            .await;
        record.daily_change_percentage = change_pct;
        record.date_generated = Utc::now().to_rfc3339();

        let path = self.store.write_summary(&record).await?;
        info!(
            path = %path.display(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "{exchange}/{symbol} mover summary saved"
        );
        Ok(record)
    }

    /// Summarize every symbol that has cached news.
    ///
    /// Each symbol is isolated: a corrupt cache file or a failed write is
    /// logged, recorded in the report, and the batch moves on.
    #[instrument(level = "info", skip_all)]
    pub async fn run_all(&mut self) -> BatchReport {
        let mut report = BatchReport::default();
        let news_dir = self.store.news_dir();
        match fs::try_exists(&news_dir).await {
            Ok(true) => {}
            Ok(false) => {
                error!(dir = %news_dir.display(), "News directory not found");
                return report;
            }
            Err(e) => {
                error!(dir = %news_dir.display(), error = %e, "Cannot access news directory");
                return report;
            }
        }

        let files = match self.store.list_news_files().await {
            Ok(files) => files,
            Err(e) => {
                error!(dir = %news_dir.display(), error = %e, "Failed to list news files");
                return report;
            }
        };

        let exchange = self.settings.exchange.clone();
        for file in files {
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let Some(symbol) = symbol_from_news_file(&file) else {
                continue;
            };

            let articles = match self.store.read_news(&symbol).await {
                Ok(articles) => self.most_recent(articles),
                Err(e) => {
                    error!(file = %file_name, error = %e, "Error processing news file");
                    report.failed.push(file_name);
                    continue;
                }
            };

            self.symbol_pacer.wait().await;
            let change = self.prices.daily_change(&symbol);
            info!(%symbol, change = %format!("{change:.2}"), "Processing symbol");

            match self
                .run_with_articles(&symbol, &exchange, change, articles)
                .await
            {
                Ok(record) => {
                    println!("\n{symbol} ({exchange}) - Change: {change:.2}%");
                    println!("Classification: {}", record.classification);
                    println!("Summary: {}\n", preview(&record.summary, 200));
                    report.processed.push(symbol);
                }
                Err(e) => {
                    error!(file = %file_name, stage = e.stage(), error = %e, "Error processing news file");
                    report.failed.push(file_name);
                }
            }
        }

        info!(
            processed = report.processed.len(),
            failed = report.failed.len(),
            "Batch complete"
        );
        report
    }
}

fn no_news(symbol: &str, exchange: &str, classification: Classification) -> SummaryRecord {
    SummaryRecord::new(symbol, exchange, classification, NO_NEWS_SUMMARY).with_period("day")
}
