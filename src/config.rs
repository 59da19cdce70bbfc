use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{CoinSeerError, Result};
use crate::feed_reader::{read_feed_list, FeedSource};
use crate::sentiment::ClassificationPolicy;
use crate::tagger::AliasTable;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub feeds_file: PathBuf,
    pub cutoff: Option<NaiveDate>,
    pub alias_table_path: Option<PathBuf>,
    pub feed_timeout_secs: u64,

    // Classification settings
    pub classifier_url: Option<String>,
    pub classification_policy: ClassificationPolicy,
    pub max_concurrent_classifications: usize,

    pub report_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds_file: PathBuf::from("Data/Feeds.txt"),
            cutoff: None,
            alias_table_path: None,
            feed_timeout_secs: 30,
            classifier_url: None,
            classification_policy: ClassificationPolicy::Abort,
            max_concurrent_classifications: 8,
            report_dir: PathBuf::from("./reports"),
        }
    }
}

pub fn parse_cutoff(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        CoinSeerError::config_error(format!(
            "Invalid cutoff date \"{}\" (expected YYYY-MM-DD): {}",
            value, e
        ))
    })
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CoinSeerError::config_error(format!("{} must be a number, got \"{}\"", key, value)))
}

impl Config {
    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(feeds_file) = lookup("FEEDS_FILE") {
            config.feeds_file = PathBuf::from(feeds_file);
        }

        if let Some(cutoff) = lookup("CUTOFF_DATE") {
            config.cutoff = Some(parse_cutoff(&cutoff)?);
        }

        if let Some(path) = lookup("ALIAS_TABLE_PATH") {
            config.alias_table_path = Some(PathBuf::from(path));
        }

        if let Some(timeout) = lookup("FEED_TIMEOUT_SECS") {
            config.feed_timeout_secs = parse_number("FEED_TIMEOUT_SECS", &timeout)?;
        }

        if let Some(url) = lookup("CLASSIFIER_URL") {
            if !url.trim().is_empty() {
                config.classifier_url = Some(url);
            }
        }

        if let Some(policy) = lookup("CLASSIFICATION_POLICY") {
            config.classification_policy = policy.parse()?;
        }

        if let Some(limit) = lookup("MAX_CONCURRENT_CLASSIFICATIONS") {
            config.max_concurrent_classifications =
                parse_number("MAX_CONCURRENT_CLASSIFICATIONS", &limit)?;
        }

        if let Some(dir) = lookup("REPORT_DIR") {
            config.report_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// The cutoff is mandatory; a run without one never starts.
    pub fn cutoff_date(&self) -> Result<NaiveDate> {
        self.cutoff.ok_or_else(|| {
            CoinSeerError::config_error("No cutoff date configured (set CUTOFF_DATE or pass --cutoff)")
        })
    }

    pub fn alias_table(&self) -> Result<AliasTable> {
        match &self.alias_table_path {
            Some(path) => AliasTable::from_file(path),
            None => Ok(AliasTable::default()),
        }
    }

    pub fn feed_sources(&self) -> Result<Vec<FeedSource>> {
        read_feed_list(&self.feeds_file)
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }

    /// Checks everything a run needs before any feed is touched.
    pub fn validate(&self) -> Result<()> {
        self.cutoff_date()?;
        self.alias_table()?;
        if self.feed_timeout_secs == 0 {
            return Err(CoinSeerError::config_error("FEED_TIMEOUT_SECS must be positive"));
        }
        if self.max_concurrent_classifications == 0 {
            return Err(CoinSeerError::config_error(
                "MAX_CONCURRENT_CLASSIFICATIONS must be positive",
            ));
        }
        Ok(())
    }
}

pub async fn load_config() -> Result<Config> {
    Config::from_lookup(|key| env::var(key).ok())
}

pub async fn initialize_config(config: &Config) -> Result<()> {
    info!("Checking configuration...");

    config.validate()?;
    info!("Cutoff date: {}", config.cutoff_date()?);

    let sources = config.feed_sources()?;
    if sources.is_empty() {
        warn!("Feed list {} contains no sources", config.feeds_file.display());
    }
    for source in &sources {
        info!("Feed source: {}", source);
    }

    let table = config.alias_table()?;
    for (currency, aliases) in table.iter() {
        let aliases: Vec<&str> = aliases.iter().map(String::as_str).collect();
        info!("{}: {}", currency, aliases.join(", "));
    }

    match &config.classifier_url {
        Some(url) => info!("Classifier: remote ({})", url),
        None => info!("Classifier: built-in lexicon"),
    }
    info!("Classification failure policy: {:?}", config.classification_policy);

    info!("Configuration looks good!");
    Ok(())
}
