use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::source::FeedSource;
use crate::error::{CoinSeerError, Result};

/// Produces the raw bytes of a feed document.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<u8>>;
}

pub const USER_AGENT: &str = concat!("coinseer/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by feed fetching and the remote classifier.
pub fn http_client(timeout: Duration, user_agent: &str) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|e| CoinSeerError::config_error(format!("Cannot build HTTP client: {}", e)))
}

/// Fetches http(s) sources with reqwest and everything else from disk.
pub struct SourceFetcher {
    client: Client,
}

impl SourceFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout, USER_AGENT)?,
        })
    }

    async fn fetch_remote(&self, source: &FeedSource) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(source.as_str())
            .send()
            .await
            .map_err(|e| CoinSeerError::source_unavailable(source.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoinSeerError::source_unavailable(
                source.as_str(),
                format!("HTTP {}", status),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CoinSeerError::source_unavailable(source.as_str(), e))?;

        Ok(body.to_vec())
    }
}

#[async_trait]
impl FeedFetcher for SourceFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<u8>> {
        debug!("Fetching feed {}", source);

        match source.local_path() {
            Some(path) => tokio::fs::read(path)
                .await
                .map_err(|e| CoinSeerError::source_unavailable(source.as_str(), e)),
            None => self.fetch_remote(source).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn reads_local_file_sources() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<rss/>").unwrap();

        let fetcher = SourceFetcher::new(Duration::from_secs(1)).unwrap();
        let source = FeedSource::new(format!("file://{}", file.path().display()));
        let bytes = fetcher.fetch(&source).await.unwrap();
        assert_eq!(bytes, b"<rss/>");
    }

    #[tokio::test]
    async fn reads_percent_encoded_file_uris() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my feed.xml");
        std::fs::write(&path, "<rss/>").unwrap();

        let fetcher = SourceFetcher::new(Duration::from_secs(1)).unwrap();
        let uri = url::Url::from_file_path(&path).unwrap();
        assert!(uri.as_str().contains("my%20feed.xml"));
        let bytes = fetcher.fetch(&FeedSource::new(uri.as_str())).await.unwrap();
        assert_eq!(bytes, b"<rss/>");
    }

    #[test]
    fn invalid_client_settings_are_a_config_error() {
        let err = http_client(Duration::from_secs(1), "coinseer\nbroken").unwrap_err();
        assert!(matches!(err, CoinSeerError::Config(_)));
    }

    #[tokio::test]
    async fn missing_local_file_is_source_unavailable() {
        let fetcher = SourceFetcher::new(Duration::from_secs(1)).unwrap();
        let err = fetcher
            .fetch(&FeedSource::new("/no/such/feed.xml"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoinSeerError::SourceUnavailable { .. }));
    }
}
