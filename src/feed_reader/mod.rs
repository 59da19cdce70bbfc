pub mod source;
pub mod fetcher;
pub mod parser;
pub mod loader;
pub mod selector;

pub use source::{FeedSource, read_feed_list, parse_feed_list};
pub use fetcher::{FeedFetcher, SourceFetcher};
pub use loader::{FeedLoader, LoadOutcome, SourceFailure};
pub use selector::ArticleSelector;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A single feed entry reduced to what the tagger needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    /// Publish time in the offset the feed used.
    pub published_at: DateTime<FixedOffset>,
}
