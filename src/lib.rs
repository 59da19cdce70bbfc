//! CoinSeer - crypto news sentiment oracle.
//!
//! Loads syndication feeds, tags headlines that mention tracked currencies and
//! aggregates a per-currency sentiment verdict from an injected classifier.

pub mod config;
pub mod error;
pub mod feed_reader;
pub mod monitoring;
pub mod pipeline;
pub mod sentiment;
pub mod tagger;

pub use error::{CoinSeerError, Result};
pub use pipeline::{Pipeline, RunReport};
