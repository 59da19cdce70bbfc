use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{CoinSeerError, Result};
use crate::pipeline::RunReport;

/// Writes each run report as a pretty JSON file under `log_dir`.
pub struct ReportLogger {
    log_dir: PathBuf,
}

impl ReportLogger {
    pub fn new(log_dir: Option<&Path>) -> Result<Self> {
        let log_dir = log_dir.unwrap_or_else(|| Path::new("./reports")).to_path_buf();

        // Ensure the report directory exists
        fs::create_dir_all(&log_dir)?;

        Ok(Self { log_dir })
    }

    /// Returns the path of the written file.
    pub async fn write_report(&self, report: &RunReport) -> Result<PathBuf> {
        let file_name = format!(
            "sentiment-{}.json",
            report.generated_at.format("%Y%m%dT%H%M%S%.3fZ")
        );
        let path = self.log_dir.join(file_name);

        let json = serde_json::to_string_pretty(report)
            .map_err(|e| CoinSeerError::report_error(format!("Cannot serialize report: {}", e)))?;
        tokio::fs::write(&path, json).await?;

        info!("Report written to {}", path.display());
        Ok(path)
    }
}

/// Logs per-mention predictions and the verdict for each currency.
pub fn log_summary(report: &RunReport) {
    for failure in &report.failed_sources {
        warn!("Skipped source {}: {}", failure.source, failure.reason);
    }

    for score in &report.scores {
        for sentiment in &score.sentiments {
            info!(
                "Sentiment: {} | Prediction: {} | Probability: {:.4}",
                sentiment.text, sentiment.label, sentiment.probability
            );
        }
        info!(
            "{} -> {} ({} mentions)",
            score.currency,
            score.aggregate,
            score.mention_count()
        );
    }

    if report.scores.is_empty() {
        info!("No currency mentions on or after {}", report.cutoff);
    }
}
