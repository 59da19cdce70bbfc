use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::fetcher::FeedFetcher;
use super::parser::parse_articles;
use super::source::FeedSource;
use super::Article;
use crate::error::{CoinSeerError, Result};

/// Diagnostic for a source that contributed no articles.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFailure {
    pub source: FeedSource,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub articles: Vec<Article>,
    pub failures: Vec<SourceFailure>,
}

pub struct FeedLoader {
    fetcher: Arc<dyn FeedFetcher>,
    timeout: Duration,
}

impl FeedLoader {
    pub fn new(fetcher: Arc<dyn FeedFetcher>, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    /// Fetch and parse one source, bounded by the per-source timeout.
    pub async fn load_source(&self, source: &FeedSource) -> Result<Vec<Article>> {
        let work = async {
            let document = self.fetcher.fetch(source).await?;
            parse_articles(source, &document)
        };

        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(CoinSeerError::SourceTimeout {
                source_id: source.to_string(),
                seconds: self.timeout.as_secs(),
            }),
        }
    }

    /// Loads every source concurrently. A failing source is logged and skipped;
    /// the rest are concatenated in source order.
    pub async fn load(&self, sources: &[FeedSource]) -> LoadOutcome {
        info!("Loading {} feed sources...", sources.len());

        let results = join_all(sources.iter().map(|source| self.load_source(source))).await;

        let mut outcome = LoadOutcome::default();
        for (source, result) in sources.iter().zip(results) {
            match result {
                Ok(articles) => {
                    info!("{}: {} articles", source, articles.len());
                    outcome.articles.extend(articles);
                }
                Err(e) => {
                    warn!("Cannot load feed, moving on: {} ({})", source, e);
                    outcome.failures.push(SourceFailure {
                        source: source.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Loaded {} articles ({} of {} sources failed)",
            outcome.articles.len(),
            outcome.failures.len(),
            sources.len()
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StubFetcher {
        documents: HashMap<String, String>,
    }

    #[async_trait]
    impl FeedFetcher for StubFetcher {
        async fn fetch(&self, source: &FeedSource) -> Result<Vec<u8>> {
            if source.as_str() == "slow" {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            self.documents
                .get(source.as_str())
                .map(|d| d.clone().into_bytes())
                .ok_or_else(|| CoinSeerError::source_unavailable(source.as_str(), "not found"))
        }
    }

    fn rss(titles: &[&str]) -> String {
        let items: String = titles
            .iter()
            .map(|t| {
                format!(
                    "<item><title>{}</title><pubDate>Thu, 22 Apr 2021 10:00:00 GMT</pubDate></item>",
                    t
                )
            })
            .collect();
        format!(
            "<rss version=\"2.0\"><channel><title>t</title><link>https://x</link><description>d</description>{}</channel></rss>",
            items
        )
    }

    fn loader() -> FeedLoader {
        let mut documents = HashMap::new();
        documents.insert("a".to_string(), rss(&["A1", "A2"]));
        documents.insert("b".to_string(), rss(&["B1"]));
        documents.insert("broken".to_string(), "definitely not a feed".to_string());
        documents.insert("slow".to_string(), rss(&["never"]));
        FeedLoader::new(Arc::new(StubFetcher { documents }), Duration::from_millis(200))
    }

    #[tokio::test]
    async fn concatenates_sources_in_order() {
        let outcome = loader()
            .load(&[FeedSource::new("b"), FeedSource::new("a")])
            .await;
        let titles: Vec<_> = outcome.articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["B1", "A1", "A2"]);
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn failing_sources_are_isolated() {
        let outcome = loader()
            .load(&[
                FeedSource::new("a"),
                FeedSource::new("broken"),
                FeedSource::new("missing"),
                FeedSource::new("b"),
            ])
            .await;

        let titles: Vec<_> = outcome.articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["A1", "A2", "B1"]);
        let failed: Vec<_> = outcome.failures.iter().map(|f| f.source.as_str()).collect();
        assert_eq!(failed, vec!["broken", "missing"]);
    }

    #[tokio::test]
    async fn slow_source_times_out_without_stalling_others() {
        let outcome = loader()
            .load(&[FeedSource::new("slow"), FeedSource::new("a")])
            .await;
        assert_eq!(outcome.articles.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].reason.contains("timed out"));
    }
}
