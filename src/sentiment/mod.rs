pub mod classifier;
pub mod aggregator;

pub use classifier::{
    LexiconClassifier, RemoteClassifier, SentimentClassifier, SentimentLabel, SentimentResult,
};
pub use aggregator::{
    AggregateLabel, ClassificationFailure, ClassificationPolicy, CurrencyScore, SentimentAggregator,
};
