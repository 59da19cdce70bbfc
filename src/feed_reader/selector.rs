use chrono::NaiveDate;
use tracing::debug;

use super::Article;

/// Keeps articles published on or after a cutoff day.
#[derive(Debug, Clone, Copy)]
pub struct ArticleSelector {
    cutoff: NaiveDate,
}

impl ArticleSelector {
    pub fn new(cutoff: NaiveDate) -> Self {
        Self { cutoff }
    }

    pub fn cutoff(&self) -> NaiveDate {
        self.cutoff
    }

    /// Day-granularity comparison on the date as published, offset ignored;
    /// the boundary day is included.
    pub fn is_selected(&self, article: &Article) -> bool {
        article.published_at.date_naive() >= self.cutoff
    }

    pub fn select(&self, articles: Vec<Article>) -> Vec<Article> {
        let total = articles.len();
        let selected: Vec<Article> = articles
            .into_iter()
            .filter(|article| self.is_selected(article))
            .collect();

        debug!(
            "Selected {} of {} articles on or after {}",
            selected.len(),
            total,
            self.cutoff
        );
        selected
    }
}
