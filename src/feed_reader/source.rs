use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{CoinSeerError, Result};

/// Identifier of one syndication feed: an http(s) URL, a `file://` URI or a local path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedSource(String);

impl FeedSource {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_remote(&self) -> bool {
        let lower = self.0.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }

    /// Local filesystem path for non-remote sources. `file://` URIs are
    /// percent-decoded.
    pub fn local_path(&self) -> Option<PathBuf> {
        if self.is_remote() {
            return None;
        }
        match self.0.strip_prefix("file://") {
            Some(rest) => Some(
                Url::parse(&self.0)
                    .ok()
                    .and_then(|uri| uri.to_file_path().ok())
                    .unwrap_or_else(|| PathBuf::from(rest)),
            ),
            None => Some(PathBuf::from(&self.0)),
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeedSource {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One source per line; blank lines and `#` comments are skipped.
pub fn parse_feed_list(content: &str) -> Vec<FeedSource> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(FeedSource::new)
        .collect()
}

pub fn read_feed_list(path: &Path) -> Result<Vec<FeedSource>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CoinSeerError::config_error(format!("Cannot read feed list {}: {}", path.display(), e))
    })?;
    Ok(parse_feed_list(&content))
}
