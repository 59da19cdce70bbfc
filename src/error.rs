use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum CoinSeerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Feed source unavailable: {source_id}: {reason}")]
    SourceUnavailable { source_id: String, reason: String },

    #[error("Cannot parse feed {source_id}: {reason}")]
    SourceParse { source_id: String, reason: String },

    #[error("Feed source timed out after {seconds}s: {source_id}")]
    SourceTimeout { source_id: String, seconds: u64 },

    #[error("Classification failed for \"{text}\": {reason}")]
    Classification { text: String, reason: String },

    #[error("Report error: {0}")]
    Report(String),
}

impl CoinSeerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn source_unavailable(source_id: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            source_id: source_id.into(),
            reason: reason.to_string(),
        }
    }

    pub fn source_parse(source_id: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceParse {
            source_id: source_id.into(),
            reason: reason.to_string(),
        }
    }

    pub fn classification_error(text: impl Into<String>, reason: impl ToString) -> Self {
        Self::Classification {
            text: text.into(),
            reason: reason.to_string(),
        }
    }

    pub fn report_error(msg: impl Into<String>) -> Self {
        Self::Report(msg.into())
    }

    /// Errors the feed loader recovers from by skipping the offending source.
    pub fn is_source_failure(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. } | Self::SourceParse { .. } | Self::SourceTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CoinSeerError>;
