//! # Why It Moves
//!
//! Explains why a stock moved today. For every symbol with cached news the
//! pipeline extracts article text, condenses it, asks an LLM to summarize
//! each article, merges the summaries into one explanation, and writes the
//! result as JSON.
//!
//! ## Usage
//!
//! ```sh
//! why_it_moves --db-dir ./STOCK_DB
//! why_it_moves --symbol AAPL --change -2.5
//! ```
//!
//! ## Architecture
//!
//! 1. **Loading**: Read the 5 most recent articles from `news/<symbol>_news.json`
//! 2. **Extraction**: Fetch article bodies that are not cached yet
//! 3. **Condensation**: Keep the sentences most likely to explain the move
//! 4. **Summarization**: One LLM call per article, then one to merge them
//! 5. **Output**: Write `movers/<symbol>_summary.json`

use awful_aj::{config, config_dir, template};
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod error;
mod extract;
mod models;
mod nlp;
mod pacing;
mod pipeline;
mod price;
mod store;
mod utils;

use api::{ARTICLE_TEMPLATE, EXPLANATION_TEMPLATE, LlmSummarizer, install_templates};
use cli::Cli;
use extract::HttpExtractor;
use nlp::KeywordCondenser;
use pipeline::{MoverSummaryPipeline, PipelineSettings};
use price::{FixedPriceProvider, PriceProvider, RandomPriceProvider};
use store::NewsStore;
use utils::{ensure_writable_dir, truncate_for_log};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("why_it_moves starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let store = NewsStore::new(&args.db_dir);

    // Early check: ensure the movers dir is writable
    if let Err(e) = ensure_writable_dir(&store.movers_dir()).await {
        error!(
            path = %store.movers_dir().display(),
            error = %e,
            "Movers directory is not writable (fix perms or choose a different --db-dir)"
        );
        return Err(e);
    }

    // ---- Load config & templates ----
    let config_path = match &args.config {
        Some(path) => PathBuf::from(path),
        None => config_dir()?.join("config.yaml"),
    };
    let config_path = config_path
        .to_str()
        .ok_or("config path is not valid UTF-8")?
        .to_string();
    let config = config::load_config(&config_path)?;
    info!(%config_path, "Loaded configuration");

    let template_dir = config_dir()?.join("templates");
    let installed = install_templates(&template_dir).await?;
    if !installed.is_empty() {
        info!(dir = %template_dir.display(), count = installed.len(), "Installed default templates");
    }

    let article_template = template::load_template(ARTICLE_TEMPLATE).await?;
    let explanation_template = template::load_template(EXPLANATION_TEMPLATE).await?;
    info!(
        article = ARTICLE_TEMPLATE,
        explanation = EXPLANATION_TEMPLATE,
        "Loaded templates"
    );

    // ---- Build pipeline ----
    let extractor = HttpExtractor::new(Duration::from_secs(args.fetch_timeout_secs))?;
    let summarizer = LlmSummarizer::new(config, article_template, explanation_template);
    let prices: Box<dyn PriceProvider> = match args.change {
        Some(change) => Box::new(FixedPriceProvider(change)),
        None => Box::new(RandomPriceProvider),
    };
    let settings = PipelineSettings {
        exchange: args.exchange.clone(),
        max_articles: args.max_articles,
        article_delay: Duration::from_secs(args.article_delay_secs),
        symbol_delay: Duration::from_secs(args.symbol_delay_secs),
    };
    let mut pipeline = MoverSummaryPipeline::new(
        store,
        extractor,
        KeywordCondenser::default(),
        summarizer,
        prices,
        settings,
    );

    match &args.symbol {
        Some(symbol) => {
            let record = pipeline.run_symbol(symbol, &args.exchange).await?;
            info!(
                %symbol,
                classification = %record.classification,
                summary = %truncate_for_log(&record.summary, 300),
                "Summary generated"
            );
        }
        None => {
            info!(db_dir = %args.db_dir, news_dir = %pipeline.store().news_dir().display(), "Processing all stocks");
            let report = pipeline.run_all().await;
            if !report.failed.is_empty() {
                error!(failed = ?report.failed, "Some news files could not be processed");
            }
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
