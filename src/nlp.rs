//! Extractive condensation of article text.
//!
//! Full articles are too long and too noisy to send to the summarizer as-is.
//! [`KeywordCondenser`] keeps only the sentences most likely to explain a
//! price move: those naming the company, and those carrying market-moving
//! vocabulary or figures.

use crate::error::Result;
use crate::models::Article;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use tracing::{debug, info, instrument};

/// Words that tend to appear in sentences explaining a move.
const MARKET_KEYWORDS: &[&str] = &[
    "earnings",
    "revenue",
    "profit",
    "loss",
    "guidance",
    "forecast",
    "outlook",
    "upgrade",
    "downgrade",
    "analyst",
    "price target",
    "shares",
    "stock",
    "rally",
    "surge",
    "plunge",
    "slump",
    "acquisition",
    "merger",
    "deal",
    "lawsuit",
    "investigation",
    "dividend",
    "buyback",
    "sales",
    "quarter",
    "beat",
    "miss",
    "estimates",
    "layoffs",
    "approval",
    "tariff",
];

static KEYWORDS_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = MARKET_KEYWORDS.iter().map(|k| regex::escape(k)).join("|");
    RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
        .case_insensitive(true)
        .build()
        .unwrap()
});

static FIGURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\d+(?:\.\d+)?\s?(?:%|percent\b)|\$\s?\d+(?:\.\d+)?(?:\s?(?:billion|million|bn|m)\b)?")
        .unwrap()
});

/// Batch NLP pass that fills in [`Article::condensed_text`].
pub trait Condenser {
    /// Condense every article in the batch.
    ///
    /// Articles without usable text come back with an empty `condensed_text`.
    fn process_articles_batch(
        &self,
        articles: Vec<Article>,
        ticker: &str,
        company: &str,
    ) -> Result<Vec<Article>>;
}

/// Sentence-scoring condenser.
#[derive(Debug, Clone)]
pub struct KeywordCondenser {
    /// Maximum number of sentences kept per article.
    pub max_sentences: usize,
    /// Hard cap on condensed text length, in characters.
    pub max_chars: usize,
}

impl Default for KeywordCondenser {
    fn default() -> Self {
        Self {
            max_sentences: 8,
            max_chars: 4000,
        }
    }
}

impl KeywordCondenser {
    /// Condense one article body.
    pub fn condense(&self, text: &str, ticker: &str, company: &str) -> String {
        let sentences: Vec<&str> = split_sentences(text)
            .into_iter()
            .unique_by(|s| s.to_lowercase())
            .collect();
        if sentences.is_empty() {
            return String::new();
        }

        let ticker_re = word_regex(ticker, false);
        let company_re = if company.eq_ignore_ascii_case(ticker) {
            None
        } else {
            word_regex(company, true)
        };

        let scored: Vec<(usize, u32)> = sentences
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut score = 0u32;
                if ticker_re.as_ref().is_some_and(|re| re.is_match(s)) {
                    score += 3;
                }
                if company_re.as_ref().is_some_and(|re| re.is_match(s)) {
                    score += 3;
                }
                score += KEYWORDS_RE.find_iter(s).count().min(3) as u32;
                if FIGURE_RE.is_match(s) {
                    score += 1;
                }
                (i, score)
            })
            .collect();

        let mut keep: Vec<usize> = if scored.iter().all(|(_, score)| *score == 0) {
            (0..sentences.len().min(self.max_sentences)).collect()
        } else {
            scored
                .iter()
                .filter(|(_, score)| *score > 0)
                .sorted_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)))
                .take(self.max_sentences)
                .map(|(i, _)| *i)
                .collect()
        };
        keep.sort_unstable();

        let condensed = keep.iter().map(|&i| sentences[i]).join(" ");
        truncate_chars(&condensed, self.max_chars)
    }
}

impl Condenser for KeywordCondenser {
    #[instrument(level = "info", skip_all, fields(%ticker, count = articles.len()))]
    fn process_articles_batch(
        &self,
        mut articles: Vec<Article>,
        ticker: &str,
        company: &str,
    ) -> Result<Vec<Article>> {
        for (i, article) in articles.iter_mut().enumerate() {
            let condensed = match article.full_article_text.as_deref() {
                Some(text) if article.has_usable_text() => self.condense(text, ticker, company),
                _ => String::new(),
            };
            debug!(index = i, chars = condensed.chars().count(), "Condensed article");
            article.condensed_text = Some(condensed);
        }
        info!("Condensed article batch");
        Ok(articles)
    }
}

/// Case-sensitive tickers avoid matching ordinary words ("ALL", "ON").
fn word_regex(term: &str, case_insensitive: bool) -> Option<Regex> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }
    RegexBuilder::new(&format!(r"\b{}\b", regex::escape(term)))
        .case_insensitive(case_insensitive)
        .build()
        .ok()
}

/// Split prose into sentences.
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace, so decimals
/// like `4.5%` and tickers like `BRK.B` stay intact. Line breaks also end a
/// sentence, since paragraphs are joined with blank lines.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let boundary = match c {
            '\n' => Some(i),
            '.' | '!' | '?' => match chars.peek() {
                Some((_, next)) if next.is_whitespace() => Some(i + c.len_utf8()),
                None => Some(i + c.len_utf8()),
                _ => None,
            },
            _ => None,
        };
        if let Some(end) = boundary {
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::NOT_FOUND_SENTINEL;

    #[test]
    fn test_split_sentences_keeps_decimals() {
        let text = "Shares rose 4.5% on Monday. Analysts cheered! Was it enough?\nNew paragraph";
        assert_eq!(
            split_sentences(text),
            vec![
                "Shares rose 4.5% on Monday.",
                "Analysts cheered!",
                "Was it enough?",
                "New paragraph"
            ]
        );
    }

    #[test]
    fn test_condense_keeps_relevant_sentences_in_order() {
        let condenser = KeywordCondenser {
            max_sentences: 2,
            max_chars: 4000,
        };
        let text = "The weather was mild in Cupertino. \
                    AAPL jumped 3% after earnings beat estimates. \
                    A local bakery opened downtown. \
                    Apple raised its revenue guidance for the quarter.";
        let condensed = condenser.condense(text, "AAPL", "Apple");
        assert_eq!(
            condensed,
            "AAPL jumped 3% after earnings beat estimates. \
             Apple raised its revenue guidance for the quarter."
        );
    }

    #[test]
    fn test_condense_without_signal_takes_leading_sentences() {
        let condenser = KeywordCondenser {
            max_sentences: 2,
            max_chars: 4000,
        };
        let text = "First line here. Second line here. Third line here.";
        assert_eq!(
            condenser.condense(text, "ZZZZ", "ZZZZ"),
            "First line here. Second line here."
        );
    }

    #[test]
    fn test_condense_drops_duplicates_and_truncates() {
        let condenser = KeywordCondenser {
            max_sentences: 8,
            max_chars: 20,
        };
        let text = "TSLA shares fell. TSLA shares fell. Tesla cut prices again.";
        let condensed = condenser.condense(text, "TSLA", "Tesla");
        assert_eq!(condensed.chars().count(), 20);
        assert_eq!(condensed.matches("TSLA shares fell.").count(), 1);
    }

    #[test]
    fn test_ticker_match_is_case_sensitive() {
        let condenser = KeywordCondenser::default();
        let text = "It was all quiet. ALL reported higher premiums.";
        assert_eq!(condenser.condense(text, "ALL", "ALL"), "ALL reported higher premiums.");
    }

    #[test]
    fn test_batch_sets_condensed_text_for_every_article() {
        let articles = vec![
            Article {
                full_article_text: Some("NVDA stock surged on record data center sales.".into()),
                ..Default::default()
            },
            Article {
                full_article_text: Some(NOT_FOUND_SENTINEL.into()),
                ..Default::default()
            },
            Article::default(),
        ];
        let out = KeywordCondenser::default()
            .process_articles_batch(articles, "NVDA", "NVDA")
            .unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(
            out[0].condensed_text.as_deref(),
            Some("NVDA stock surged on record data center sales.")
        );
        assert_eq!(out[1].condensed_text.as_deref(), Some(""));
        assert_eq!(out[2].condensed_text.as_deref(), Some(""));
    }
}
