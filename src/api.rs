//! LLM summarization with exponential backoff retry logic.
//!
//! This module provides the summarizer the pipeline talks to. Requests go to
//! an OpenAI-compatible API through `awful_aj`, wrapped in automatic retry
//! with exponential backoff and jitter to ride out rate limits and transient
//! failures.
//!
//! # Architecture
//!
//! - [`AskAsync`]: Core trait defining async LLM interaction
//! - [`AskFnWrapper`]: Wraps the `awful_aj` library's `ask` function
//! - [`RetryAsk`]: Decorator that adds retry logic to any `AskAsync` implementation
//! - [`Summarizer`]: What the pipeline needs (per-article and aggregate summaries)
//! - [`LlmSummarizer`]: [`Summarizer`] backed by two chat templates
//!
//! # Retry Strategy
//!
//! - Maximum 5 retry attempts
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::error::{PipelineError, Result};
use crate::utils::truncate_for_log;
use awful_aj::api::ask;
use awful_aj::{config::AwfulJadeConfig, template::ChatTemplate};
use rand::{Rng, rng};
use std::error::Error;
use std::fmt;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration as StdDuration, Instant};
use tokio::fs;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Template used for one condensed article.
pub const ARTICLE_TEMPLATE: &str = "mover_article_summary";
/// Template used to merge per-article summaries into one explanation.
pub const EXPLANATION_TEMPLATE: &str = "mover_explanation";

/// Templates shipped with the binary, as `(name, yaml)`.
const BUNDLED_TEMPLATES: &[(&str, &str)] = &[
    (
        ARTICLE_TEMPLATE,
        include_str!("../templates/mover_article_summary.yaml"),
    ),
    (
        EXPLANATION_TEMPLATE,
        include_str!("../templates/mover_explanation.yaml"),
    ),
];

/// Replies that mean "nothing relevant" rather than a summary.
const PLACEHOLDER_REPLIES: &[&str] = &["n/a", "na", "none", "null", "nothing", "empty", "no summary"];

/// Write the bundled chat templates into `dir`, skipping any that exist.
///
/// Existing files are left alone so local prompt edits survive upgrades.
/// Returns the paths that were written.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn install_templates(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).await?;
    let mut written = Vec::new();
    for (name, yaml) in BUNDLED_TEMPLATES {
        let path = dir.join(format!("{name}.yaml"));
        if fs::try_exists(&path).await? {
            debug!(path = %path.display(), "Template already installed");
            continue;
        }
        fs::write(&path, yaml).await?;
        info!(path = %path.display(), "Installed template");
        written.push(path);
    }
    Ok(written)
}

/// Normalize a per-article reply, mapping "no summary" answers to empty.
///
/// Models asked to stay silent often answer with `""`, `N/A` and the like
/// instead.
pub fn clean_article_summary(reply: &str) -> String {
    let trimmed = reply
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '\u{201c}' | '\u{201d}'))
        .trim();
    let bare = trimmed.trim_end_matches('.').to_ascii_lowercase();
    if PLACEHOLDER_REPLIES.contains(&bare.as_str()) {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// Trait for async LLM interaction.
///
/// Implementors of this trait can send text to an LLM and receive a response.
/// This abstraction allows for different LLM backends or decorators (like retry logic).
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send text to the LLM and receive a response.
    async fn ask(&self, text: &str) -> std::result::Result<Self::Response, Box<dyn Error>>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    /// The underlying LLM client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Create a new retry wrapper around an existing [`AskAsync`] implementation.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    /// Delay before retry number `attempt` (1-based), without jitter.
    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(31) as u32;
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> std::result::Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = self.backoff(attempt) + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Wrapper around `awful_aj::api::ask` that implements [`AskAsync`].
#[derive(Debug)]
pub struct AskFnWrapper<'a> {
    /// LLM configuration (API keys, endpoints, model settings).
    pub config: &'a AwfulJadeConfig,
    /// Chat template defining the conversation structure.
    pub template: &'a ChatTemplate,
}

impl<'a> AskAsync for AskFnWrapper<'a> {
    type Response = String;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> std::result::Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = ask(self.config, text.to_string(), self.template, None, None).await;
        let dt = t0.elapsed();

        if let Err(e) = &res {
            warn!(elapsed_ms = dt.as_millis() as u64, error = %e, "API call failed");
        }
        res
    }
}

/// Call the LLM through [`RetryAsk`] with the standard policy.
#[instrument(level = "info", skip_all)]
pub async fn ask_with_backoff(
    config: &AwfulJadeConfig,
    prompt: &str,
    template: &ChatTemplate,
) -> std::result::Result<String, Box<dyn Error>> {
    let t0 = Instant::now();
    let client = AskFnWrapper { config, template };
    let api = RetryAsk::new(client, 5, StdDuration::from_secs(1));
    let res = api.ask(prompt).await;
    let dt = t0.elapsed();

    match &res {
        Ok(_) => info!(elapsed_ms_total = dt.as_millis() as u64, "ask_with_backoff succeeded"),
        Err(e) => {
            error!(elapsed_ms_total = dt.as_millis() as u64, error = %e, "ask_with_backoff failed")
        }
    }
    res
}

/// The summarization collaborator of the pipeline.
pub trait Summarizer {
    /// Explain, from one condensed article, why `symbol` moved `direction`.
    ///
    /// An empty string means the article had nothing useful to say.
    async fn summarize_article(&self, condensed: &str, symbol: &str, direction: &str)
    -> Result<String>;

    /// Merge per-article summaries into one explanation.
    async fn summarize_articles(&self, summaries: &[String], symbol: &str) -> Result<String>;
}

/// [`Summarizer`] backed by `awful_aj` chat templates.
pub struct LlmSummarizer {
    config: AwfulJadeConfig,
    article_template: ChatTemplate,
    explanation_template: ChatTemplate,
}

impl LlmSummarizer {
    pub fn new(
        config: AwfulJadeConfig,
        article_template: ChatTemplate,
        explanation_template: ChatTemplate,
    ) -> Self {
        Self {
            config,
            article_template,
            explanation_template,
        }
    }
}

impl fmt::Debug for LlmSummarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSummarizer").finish_non_exhaustive()
    }
}

impl Summarizer for LlmSummarizer {
    #[instrument(level = "info", skip_all, fields(%symbol, %direction))]
    async fn summarize_article(
        &self,
        condensed: &str,
        symbol: &str,
        direction: &str,
    ) -> Result<String> {
        let prompt = article_prompt(condensed, symbol, direction);
        let response = ask_with_backoff(&self.config, &prompt, &self.article_template)
            .await
            .map_err(|e| PipelineError::Summarization(e.to_string()))?;
        let summary = clean_article_summary(&response);
        debug!(summary = %truncate_for_log(&summary, 200), "Article summary");
        Ok(summary)
    }

    #[instrument(level = "info", skip_all, fields(%symbol, count = summaries.len()))]
    async fn summarize_articles(&self, summaries: &[String], symbol: &str) -> Result<String> {
        let prompt = explanation_prompt(summaries, symbol);
        let response = ask_with_backoff(&self.config, &prompt, &self.explanation_template)
            .await
            .map_err(|e| PipelineError::Aggregation(e.to_string()))?;
        let explanation = response.trim().to_string();
        if explanation.is_empty() {
            return Err(PipelineError::Aggregation(
                "model returned an empty explanation".to_string(),
            ));
        }
        Ok(explanation)
    }
}

/// User message for the per-article template.
pub fn article_prompt(condensed: &str, symbol: &str, direction: &str) -> String {
    format!(
        "Stock symbol: {symbol}\nToday the stock went {direction}.\n\nArticle:\n{}",
        condensed.trim()
    )
}

/// User message for the explanation template, one numbered line per summary.
pub fn explanation_prompt(summaries: &[String], symbol: &str) -> String {
    let mut prompt = format!("Stock symbol: {symbol}\n\nArticle summaries:\n");
    for (i, summary) in summaries.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}", i + 1, summary.trim());
    }
    prompt
}
