use chrono::{DateTime, FixedOffset, Offset, Utc};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

use super::source::FeedSource;
use super::Article;
use crate::error::{CoinSeerError, Result};

/// RFC 3339 (Atom, and many RSS feeds in practice) first, then RFC 2822.
fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_rfc2822(text))
        .ok()
}

/// Parses an RSS or Atom document into articles, in entry order.
///
/// Any entry without a title or without a readable timestamp fails the whole
/// document; partially parsed sources are never returned. Timestamps keep the
/// offset they were published with.
pub fn parse_articles(source: &FeedSource, document: &[u8]) -> Result<Vec<Article>> {
    // feed-rs only hands back UTC instants, so record each instant's offset on the way
    let offsets: Rc<RefCell<HashMap<DateTime<Utc>, FixedOffset>>> = Rc::default();
    let seen = Rc::clone(&offsets);
    let parser = feed_rs::parser::Builder::new()
        .timestamp_parser(move |text: &str| {
            let stamp = parse_timestamp(text)?;
            let instant = stamp.with_timezone(&Utc);
            seen.borrow_mut().insert(instant, *stamp.offset());
            Some(instant)
        })
        .build();

    let feed = parser
        .parse(document)
        .map_err(|e| CoinSeerError::source_parse(source.as_str(), e))?;
    let offsets = offsets.borrow();

    let mut articles = Vec::with_capacity(feed.entries.len());
    for (index, entry) in feed.entries.into_iter().enumerate() {
        let title = entry.title.map(|t| t.content).ok_or_else(|| {
            CoinSeerError::source_parse(source.as_str(), format!("entry {} has no title", index))
        })?;

        // Atom entries may only carry <updated>
        let instant = entry.published.or(entry.updated).ok_or_else(|| {
            CoinSeerError::source_parse(
                source.as_str(),
                format!("entry {} (\"{}\") has no valid publish date", index, title),
            )
        })?;
        let offset = offsets.get(&instant).copied().unwrap_or_else(|| Utc.fix());

        articles.push(Article {
            title,
            published_at: instant.with_timezone(&offset),
        });
    }

    debug!("Parsed {} articles from {}", articles.len(), source);
    Ok(articles)
}
