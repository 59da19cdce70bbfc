use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use super::classifier::{SentimentClassifier, SentimentResult};
use crate::error::{CoinSeerError, Result};
use crate::tagger::{Currency, Mention};

/// What to do when the classifier cannot score a mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationPolicy {
    /// Fail the whole aggregation with the first classification error.
    #[default]
    Abort,
    /// Mark the affected currency undetermined and keep going.
    MarkUndetermined,
}

impl FromStr for ClassificationPolicy {
    type Err = CoinSeerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(ClassificationPolicy::Abort),
            "undetermined" | "mark_undetermined" => Ok(ClassificationPolicy::MarkUndetermined),
            other => Err(CoinSeerError::config_error(format!(
                "Unknown classification policy: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateLabel {
    Positive,
    Negative,
    Undetermined,
}

impl fmt::Display for AggregateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateLabel::Positive => f.write_str("Positive"),
            AggregateLabel::Negative => f.write_str("Negative"),
            AggregateLabel::Undetermined => f.write_str("Undetermined"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationFailure {
    pub text: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyScore {
    pub currency: Currency,
    /// Successful results, in mention order.
    pub sentiments: Vec<SentimentResult>,
    pub failures: Vec<ClassificationFailure>,
    pub aggregate: AggregateLabel,
}

impl CurrencyScore {
    pub fn new(
        currency: Currency,
        sentiments: Vec<SentimentResult>,
        failures: Vec<ClassificationFailure>,
    ) -> Self {
        let aggregate = if failures.is_empty() {
            aggregate_label(&sentiments)
        } else {
            AggregateLabel::Undetermined
        };

        Self {
            currency,
            sentiments,
            failures,
            aggregate,
        }
    }

    pub fn mention_count(&self) -> usize {
        self.sentiments.len() + self.failures.len()
    }
}

/// Logical OR over the labels: any positive mention makes the currency positive.
pub fn aggregate_label(results: &[SentimentResult]) -> AggregateLabel {
    if results.iter().any(|r| r.label.is_positive()) {
        AggregateLabel::Positive
    } else {
        AggregateLabel::Negative
    }
}

/// Partitions mentions by currency. Groups appear in order of each currency's
/// first mention; mentions keep their arrival order within a group.
pub fn group_by_currency(mentions: Vec<Mention>) -> Vec<(Currency, Vec<Mention>)> {
    let mut groups: Vec<(Currency, Vec<Mention>)> = Vec::new();

    for mention in mentions {
        match groups.iter_mut().find(|(currency, _)| *currency == mention.currency) {
            Some((_, group)) => group.push(mention),
            None => groups.push((mention.currency, vec![mention])),
        }
    }

    groups
}

pub struct SentimentAggregator {
    classifier: Arc<dyn SentimentClassifier>,
    policy: ClassificationPolicy,
    max_concurrent: usize,
}

impl SentimentAggregator {
    pub fn new(classifier: Arc<dyn SentimentClassifier>, policy: ClassificationPolicy) -> Self {
        Self {
            classifier,
            policy,
            max_concurrent: 8,
        }
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn policy(&self) -> ClassificationPolicy {
        self.policy
    }

    /// Classifies every mention and reduces each currency group to one score.
    ///
    /// Classification runs concurrently across and within groups; `buffered`
    /// yields results in submission order so each group is reassembled in
    /// mention order.
    pub async fn aggregate(&self, mentions: Vec<Mention>) -> Result<Vec<CurrencyScore>> {
        let groups = group_by_currency(mentions);
        if groups.is_empty() {
            return Ok(Vec::new());
        }

        info!(
            "Classifying mentions for {} currencies with the {} classifier...",
            groups.len(),
            self.classifier.name()
        );

        let jobs: Vec<(usize, String)> = groups
            .iter()
            .enumerate()
            .flat_map(|(index, (_, group))| group.iter().map(move |m| (index, m.text.clone())))
            .collect();

        let mut results = stream::iter(jobs)
            .map(|(index, text)| {
                let classifier = Arc::clone(&self.classifier);
                async move {
                    let result = classifier.classify(&text).await;
                    (index, text, result)
                }
            })
            .buffered(self.max_concurrent);

        let mut sentiments: Vec<Vec<SentimentResult>> = vec![Vec::new(); groups.len()];
        let mut failures: Vec<Vec<ClassificationFailure>> = vec![Vec::new(); groups.len()];

        while let Some((index, text, result)) = results.next().await {
            match result {
                Ok(sentiment) => sentiments[index].push(sentiment),
                Err(e) => match self.policy {
                    // Dropping the stream cancels in-flight calls and submits no more
                    ClassificationPolicy::Abort => {
                        return Err(match e {
                            CoinSeerError::Classification { .. } => e,
                            other => CoinSeerError::classification_error(text, other),
                        });
                    }
                    ClassificationPolicy::MarkUndetermined => {
                        warn!("{}: could not classify \"{}\": {}", groups[index].0, text, e);
                        failures[index].push(ClassificationFailure {
                            text,
                            reason: e.to_string(),
                        });
                    }
                },
            }
        }

        let scores = groups
            .iter()
            .zip(sentiments.into_iter().zip(failures))
            .map(|((currency, _), (sentiments, failures))| {
                CurrencyScore::new(*currency, sentiments, failures)
            })
            .collect();

        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::SentimentLabel;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Positive iff the text contains "up"; fails on texts containing "boom".
    struct KeywordClassifier;

    #[async_trait]
    impl SentimentClassifier for KeywordClassifier {
        async fn classify(&self, text: &str) -> Result<SentimentResult> {
            if text.contains("boom") {
                return Err(CoinSeerError::classification_error(text, "model exploded"));
            }
            let positive = text.contains("up");
            let probability = if positive { 0.9 } else { 0.1 };
            Ok(SentimentResult::new(text, SentimentLabel::from_bool(positive), probability))
        }
    }

    /// Fails every call and counts how many were made.
    #[derive(Default)]
    struct CountingClassifier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SentimentClassifier for CountingClassifier {
        async fn classify(&self, text: &str) -> Result<SentimentResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CoinSeerError::classification_error(text, "endpoint down"))
        }
    }

    /// Sleeps for the number of milliseconds after the last space, then
    /// records the text as finished. Positive iff the text contains "up".
    #[derive(Default)]
    struct DelayedClassifier {
        finished: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SentimentClassifier for DelayedClassifier {
        async fn classify(&self, text: &str) -> Result<SentimentResult> {
            let millis = text
                .rsplit(' ')
                .next()
                .and_then(|n| n.parse::<u64>().ok())
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(millis)).await;
            self.finished.lock().unwrap().push(text.to_string());
            let label = SentimentLabel::from_bool(text.contains("up"));
            Ok(SentimentResult::new(text, label, 0.5))
        }
    }

    fn mention(currency: Currency, text: &str) -> Mention {
        Mention {
            currency,
            text: text.to_string(),
        }
    }

    fn result(label: SentimentLabel) -> SentimentResult {
        SentimentResult::new("t", label, 0.5)
    }

    #[test]
    fn any_positive_makes_the_aggregate_positive() {
        use SentimentLabel::*;
        assert_eq!(
            aggregate_label(&[result(Negative), result(Negative), result(Positive)]),
            AggregateLabel::Positive
        );
        assert_eq!(
            aggregate_label(&[result(Negative), result(Negative)]),
            AggregateLabel::Negative
        );
    }

    #[test]
    fn grouping_is_a_partition_preserving_order() {
        let mentions = vec![
            mention(Currency::ETH, "e1"),
            mention(Currency::BTC, "b1"),
            mention(Currency::ETH, "e2"),
            mention(Currency::BTC, "b2"),
            mention(Currency::XRP, "x1"),
        ];
        let groups = group_by_currency(mentions.clone());

        let order: Vec<_> = groups.iter().map(|(c, _)| *c).collect();
        assert_eq!(order, vec![Currency::ETH, Currency::BTC, Currency::XRP]);

        let total: usize = groups.iter().map(|(_, g)| g.len()).sum();
        assert_eq!(total, mentions.len());
        for (currency, group) in &groups {
            assert!(group.iter().all(|m| m.currency == *currency));
        }
        let eth: Vec<_> = groups[0].1.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(eth, vec!["e1", "e2"]);
    }

    #[tokio::test]
    async fn scores_each_currency_in_mention_order() {
        let aggregator = SentimentAggregator::new(Arc::new(KeywordClassifier), ClassificationPolicy::Abort)
            .with_max_concurrent(3);
        let scores = aggregator
            .aggregate(vec![
                mention(Currency::BTC, "btc down"),
                mention(Currency::ETH, "eth down"),
                mention(Currency::BTC, "btc up"),
                mention(Currency::ETH, "eth flat"),
            ])
            .await
            .unwrap();

        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].currency, Currency::BTC);
        assert_eq!(scores[0].aggregate, AggregateLabel::Positive);
        let texts: Vec<_> = scores[0].sentiments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["btc down", "btc up"]);

        assert_eq!(scores[1].currency, Currency::ETH);
        assert_eq!(scores[1].aggregate, AggregateLabel::Negative);
        assert_eq!(scores[1].mention_count(), 2);
    }

    #[tokio::test]
    async fn no_mentions_no_scores() {
        let aggregator = SentimentAggregator::new(Arc::new(KeywordClassifier), ClassificationPolicy::Abort);
        assert!(aggregator.aggregate(Vec::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn abort_policy_surfaces_the_error() {
        let aggregator = SentimentAggregator::new(Arc::new(KeywordClassifier), ClassificationPolicy::Abort);
        let err = aggregator
            .aggregate(vec![
                mention(Currency::BTC, "btc up"),
                mention(Currency::ETH, "eth boom"),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, CoinSeerError::Classification { .. }));
    }

    #[tokio::test]
    async fn abort_policy_stops_at_the_first_failure() {
        let classifier = Arc::new(CountingClassifier::default());
        let aggregator = SentimentAggregator::new(classifier.clone(), ClassificationPolicy::Abort)
            .with_max_concurrent(1);
        let mentions = (0..10)
            .map(|i| mention(Currency::BTC, &format!("bitcoin headline {}", i)))
            .collect();

        assert!(aggregator.aggregate(mentions).await.is_err());
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn results_are_reassembled_in_mention_order() {
        let classifier = Arc::new(DelayedClassifier::default());
        let aggregator = SentimentAggregator::new(classifier.clone(), ClassificationPolicy::Abort)
            .with_max_concurrent(4);
        let scores = aggregator
            .aggregate(vec![
                mention(Currency::BTC, "btc down 80"),
                mention(Currency::ETH, "eth up 60"),
                mention(Currency::BTC, "btc up 1"),
                mention(Currency::ETH, "eth down 20"),
            ])
            .await
            .unwrap();

        // Later mentions finished first
        let finished = classifier.finished.lock().unwrap().clone();
        assert_eq!(finished, vec!["btc up 1", "eth down 20", "eth up 60", "btc down 80"]);

        let btc: Vec<_> = scores[0].sentiments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(btc, vec!["btc down 80", "btc up 1"]);
        let eth: Vec<_> = scores[1].sentiments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(eth, vec!["eth up 60", "eth down 20"]);
        assert_eq!(scores[0].aggregate, AggregateLabel::Positive);
        assert_eq!(scores[1].aggregate, AggregateLabel::Positive);
    }

    #[tokio::test]
    async fn undetermined_policy_isolates_the_currency() {
        let aggregator =
            SentimentAggregator::new(Arc::new(KeywordClassifier), ClassificationPolicy::MarkUndetermined);
        let scores = aggregator
            .aggregate(vec![
                mention(Currency::BTC, "btc up"),
                mention(Currency::ETH, "eth up"),
                mention(Currency::ETH, "eth boom"),
            ])
            .await
            .unwrap();

        assert_eq!(scores[0].aggregate, AggregateLabel::Positive);
        assert_eq!(scores[1].aggregate, AggregateLabel::Undetermined);
        assert_eq!(scores[1].sentiments.len(), 1);
        assert_eq!(scores[1].failures.len(), 1);
        assert_eq!(scores[1].failures[0].text, "eth boom");
        assert_eq!(scores[1].mention_count(), 2);
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!("abort".parse::<ClassificationPolicy>().unwrap(), ClassificationPolicy::Abort);
        assert_eq!(
            "Undetermined".parse::<ClassificationPolicy>().unwrap(),
            ClassificationPolicy::MarkUndetermined
        );
        assert!("retry".parse::<ClassificationPolicy>().is_err());
    }
}
