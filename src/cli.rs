//! Command-line interface definitions for why_it_moves.
//!
//! All options can be provided via command-line flags, and the ones that
//! tend to differ per deployment also read from environment variables.

use clap::Parser;

/// Command-line arguments for the mover summary pipeline.
///
/// # Examples
///
/// ```sh
/// # Summarize every symbol with cached news under ./STOCK_DB
/// why_it_moves
///
/// # One symbol with a known change
/// why_it_moves --symbol AAPL --change -2.5
///
/// # Custom database location and faster pacing for a local model
/// why_it_moves --db-dir /data/STOCK_DB --article-delay-secs 0 --symbol-delay-secs 0
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Root of the stock database (contains `news/` and `movers/`)
    #[arg(long, env = "STOCK_DB_DIR", default_value = "STOCK_DB")]
    pub db_dir: String,

    /// Only summarize this symbol instead of every cached one
    #[arg(short, long)]
    pub symbol: Option<String>,

    /// Exchange label written into the summaries
    #[arg(short, long, default_value = "NASDAQ")]
    pub exchange: String,

    /// Daily change percentage to use instead of the random placeholder
    #[arg(long, allow_hyphen_values = true)]
    pub change: Option<f64>,

    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Number of most recent cached articles to summarize per symbol
    #[arg(long, default_value_t = 5)]
    pub max_articles: usize,

    /// Seconds between per-article summarizer calls
    #[arg(long, default_value_t = 2)]
    pub article_delay_secs: u64,

    /// Seconds between symbols in a batch run
    #[arg(long, default_value_t = 3)]
    pub symbol_delay_secs: u64,

    /// Timeout for fetching an article page, in seconds
    #[arg(long, default_value_t = 20)]
    pub fetch_timeout_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["why_it_moves"]);

        assert_eq!(cli.db_dir, "STOCK_DB");
        assert_eq!(cli.exchange, "NASDAQ");
        assert_eq!(cli.symbol, None);
        assert_eq!(cli.change, None);
        assert_eq!(cli.max_articles, 5);
        assert_eq!(cli.article_delay_secs, 2);
        assert_eq!(cli.symbol_delay_secs, 3);
    }

    #[test]
    fn test_cli_single_symbol_with_negative_change() {
        let cli = Cli::parse_from([
            "why_it_moves",
            "-s",
            "AAPL",
            "--change",
            "-2.5",
            "-e",
            "NYSE",
            "--db-dir",
            "/tmp/STOCK_DB",
        ]);

        assert_eq!(cli.symbol.as_deref(), Some("AAPL"));
        assert_eq!(cli.change, Some(-2.5));
        assert_eq!(cli.exchange, "NYSE");
        assert_eq!(cli.db_dir, "/tmp/STOCK_DB");
    }
}
