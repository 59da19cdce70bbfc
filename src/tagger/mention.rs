use serde::{Deserialize, Serialize};
use tracing::debug;

use super::alias::{AliasTable, Currency};
use crate::feed_reader::Article;

/// One currency tagged in one article title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub currency: Currency,
    /// The article title exactly as published.
    pub text: String,
}

pub struct MentionTagger<'a> {
    table: &'a AliasTable,
}

impl<'a> MentionTagger<'a> {
    pub fn new(table: &'a AliasTable) -> Self {
        Self { table }
    }

    /// Emits one mention per currency that has any alias contained in the
    /// lower-cased title. Matching is plain substring containment, so short
    /// aliases such as "eth" also hit words like "method".
    pub fn tag_article(&self, article: &Article) -> Vec<Mention> {
        let lowered = article.title.to_lowercase();

        self.table
            .iter()
            .filter(|(_, aliases)| aliases.iter().any(|alias| lowered.contains(alias.as_str())))
            .map(|(currency, _)| Mention {
                currency,
                text: article.title.clone(),
            })
            .collect()
    }

    pub fn tag(&self, articles: &[Article]) -> Vec<Mention> {
        let mentions: Vec<Mention> = articles
            .iter()
            .flat_map(|article| self.tag_article(article))
            .collect();

        debug!("Tagged {} mentions in {} articles", mentions.len(), articles.len());
        mentions
    }
}
