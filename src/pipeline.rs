use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::feed_reader::{ArticleSelector, FeedLoader, FeedSource, SourceFailure};
use crate::sentiment::{CurrencyScore, SentimentAggregator};
use crate::tagger::{AliasTable, Mention, MentionTagger};

/// Everything one run produced, including the sources it had to skip.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub cutoff: NaiveDate,
    pub sources: Vec<FeedSource>,
    pub failed_sources: Vec<SourceFailure>,
    pub article_count: usize,
    pub selected_count: usize,
    pub mention_count: usize,
    pub mentions: Vec<Mention>,
    pub scores: Vec<CurrencyScore>,
}

/// Feed loading -> date selection -> tagging -> aggregation.
pub struct Pipeline {
    loader: FeedLoader,
    selector: ArticleSelector,
    aliases: AliasTable,
    aggregator: SentimentAggregator,
}

impl Pipeline {
    pub fn new(
        loader: FeedLoader,
        selector: ArticleSelector,
        aliases: AliasTable,
        aggregator: SentimentAggregator,
    ) -> Self {
        Self {
            loader,
            selector,
            aliases,
            aggregator,
        }
    }

    /// Only classification errors under the abort policy fail the run;
    /// source failures are collected into the report.
    pub async fn run(&self, sources: &[FeedSource]) -> Result<RunReport> {
        // 1. Load every source, isolating failures
        let outcome = self.loader.load(sources).await;
        let article_count = outcome.articles.len();

        // 2. Drop anything older than the cutoff
        let selected = self.selector.select(outcome.articles);
        let selected_count = selected.len();

        // 3. Tag currency mentions
        let tagger = MentionTagger::new(&self.aliases);
        let mentions = tagger.tag(&selected);
        info!(
            "{} of {} articles on or after {}, {} mentions",
            selected_count,
            article_count,
            self.selector.cutoff(),
            mentions.len()
        );

        // 4. Classify and aggregate per currency
        let scores = self.aggregator.aggregate(mentions.clone()).await?;

        Ok(RunReport {
            generated_at: Utc::now(),
            cutoff: self.selector.cutoff(),
            sources: sources.to_vec(),
            failed_sources: outcome.failures,
            article_count,
            selected_count,
            mention_count: mentions.len(),
            mentions,
            scores,
        })
    }
}
