use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use coinseer::config::{self, parse_cutoff, Config};
use coinseer::feed_reader::{ArticleSelector, FeedLoader, SourceFetcher};
use coinseer::monitoring::{log_summary, ReportLogger};
use coinseer::sentiment::{
    LexiconClassifier, RemoteClassifier, SentimentAggregator, SentimentClassifier,
};
use coinseer::Pipeline;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load feeds, tag currency mentions and score their sentiment
    Run {
        /// Earliest publish date to consider (YYYY-MM-DD)
        #[arg(long)]
        cutoff: Option<String>,
        /// Feed list file, one source per line
        #[arg(long)]
        feeds: Option<PathBuf>,
        /// JSON alias table replacing the built-in one
        #[arg(long)]
        aliases: Option<PathBuf>,
        /// Skip writing the JSON report
        #[arg(long)]
        no_report: bool,
    },
    /// Validate configuration and list sources and aliases
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    info!("Starting CoinSeer - crypto news sentiment oracle");

    let mut config = config::load_config().await?;

    match cli.command {
        Some(Commands::Run { cutoff, feeds, aliases, no_report }) => {
            if let Some(cutoff) = cutoff {
                config.cutoff = Some(parse_cutoff(&cutoff)?);
            }
            if let Some(feeds) = feeds {
                config.feeds_file = feeds;
            }
            if let Some(aliases) = aliases {
                config.alias_table_path = Some(aliases);
            }

            // Reported once, by the error returned from main
            run_coinseer(&config, !no_report).await.context("run failed")?;
        }
        Some(Commands::Init) => {
            config::initialize_config(&config).await?;
        }
        None => {
            info!("No command specified. Use --help for available commands.");
        }
    }

    Ok(())
}

async fn run_coinseer(config: &Config, write_report: bool) -> Result<()> {
    // Everything that can be misconfigured fails here, before any feed is read
    config.validate().context("invalid configuration")?;
    let cutoff = config.cutoff_date()?;
    let aliases = config.alias_table()?;
    let sources = config.feed_sources()?;
    let report_logger = if write_report {
        Some(ReportLogger::new(Some(config.report_dir.as_path()))?)
    } else {
        None
    };

    info!(
        "{} sources, {} currencies, cutoff {}",
        sources.len(),
        aliases.len(),
        cutoff
    );

    let classifier: Arc<dyn SentimentClassifier> = match &config.classifier_url {
        Some(url) => Arc::new(RemoteClassifier::new(url.clone(), config.feed_timeout())?),
        None => {
            info!("No classifier endpoint configured, using the built-in lexicon");
            Arc::new(LexiconClassifier::new())
        }
    };

    let loader = FeedLoader::new(
        Arc::new(SourceFetcher::new(config.feed_timeout())?),
        config.feed_timeout(),
    );
    let aggregator = SentimentAggregator::new(classifier, config.classification_policy)
        .with_max_concurrent(config.max_concurrent_classifications);
    let pipeline = Pipeline::new(loader, ArticleSelector::new(cutoff), aliases, aggregator);

    let report = pipeline.run(&sources).await?;

    log_summary(&report);
    if let Some(logger) = report_logger {
        logger.write_report(&report).await?;
    }

    Ok(())
}
