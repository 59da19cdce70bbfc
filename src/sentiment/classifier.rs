use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{CoinSeerError, Result};
use crate::feed_reader::fetcher::{http_client, USER_AGENT};

/// Binary sentiment label. `Negative < Positive`, so the maximum over a group
/// is the same as a logical OR of "is positive".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Negative,
    Positive,
}

impl SentimentLabel {
    pub fn from_bool(positive: bool) -> Self {
        if positive {
            SentimentLabel::Positive
        } else {
            SentimentLabel::Negative
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, SentimentLabel::Positive)
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentLabel::Positive => f.write_str("Positive"),
            SentimentLabel::Negative => f.write_str("Negative"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub text: String,
    pub label: SentimentLabel,
    /// Probability of the positive class, in [0, 1].
    pub probability: f64,
}

impl SentimentResult {
    pub fn new(text: impl Into<String>, label: SentimentLabel, probability: f64) -> Self {
        Self {
            text: text.into(),
            label,
            probability,
        }
    }
}

/// Scores a piece of text. Implementations must be safe to call concurrently.
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<SentimentResult>;

    fn name(&self) -> &str {
        "classifier"
    }
}

/// Rule-based classifier over a small financial/crypto lexicon.
pub struct LexiconClassifier {
    words: HashMap<&'static str, f64>,
    negations: Vec<&'static str>,
    steepness: f64,
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconClassifier {
    pub fn new() -> Self {
        let positive = [
            ("bullish", 0.8), ("surge", 0.7), ("surges", 0.7), ("surging", 0.7),
            ("rally", 0.7), ("rallies", 0.7), ("rallying", 0.7), ("soar", 0.8),
            ("soars", 0.8), ("gain", 0.5), ("gains", 0.5), ("profit", 0.6),
            ("growth", 0.6), ("rise", 0.5), ("rises", 0.5), ("jump", 0.5),
            ("jumps", 0.5), ("record", 0.6), ("high", 0.4), ("highs", 0.4),
            ("upgrade", 0.6), ("adoption", 0.6), ("approval", 0.6), ("approves", 0.6),
            ("partnership", 0.6), ("breakout", 0.6), ("recovery", 0.5),
            ("rebound", 0.5), ("rebounds", 0.5), ("moon", 0.9), ("ath", 0.8),
            ("wins", 0.6), ("win", 0.6), ("launch", 0.4), ("launches", 0.4),
            ("strong", 0.5), ("optimistic", 0.6), ("accumulate", 0.5),
        ];
        let negative = [
            ("bearish", -0.8), ("crash", -0.9), ("crashes", -0.9), ("plunge", -0.8),
            ("plunges", -0.8), ("drop", -0.6), ("drops", -0.6), ("dip", -0.4),
            ("dips", -0.4), ("fall", -0.5), ("falls", -0.5), ("decline", -0.6),
            ("declines", -0.6), ("loss", -0.6), ("losses", -0.6), ("down", -0.4),
            ("weak", -0.5), ("fear", -0.6), ("fears", -0.6), ("risk", -0.4),
            ("lawsuit", -0.7), ("sues", -0.7), ("ban", -0.8), ("bans", -0.8),
            ("hack", -0.9), ("hacked", -0.9), ("scam", -0.9), ("fraud", -0.9),
            ("dump", -0.8), ("dumps", -0.8), ("sell", -0.4), ("selloff", -0.7),
            ("liquidated", -0.9), ("liquidation", -0.9), ("fud", -0.6),
            ("warns", -0.5), ("warning", -0.5), ("bubble", -0.6), ("rekt", -0.9),
        ];

        Self {
            words: positive.into_iter().chain(negative).collect(),
            negations: vec!["not", "no", "never", "without", "isn't", "won't", "don't"],
            steepness: 3.0,
        }
    }

    fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'').to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Sum of matched word weights. A weight is flipped when one of the two
    /// preceding tokens is a negation ("not a scam").
    pub fn score(&self, text: &str) -> f64 {
        let tokens = Self::tokenize(text);
        let mut score = 0.0;

        for (i, token) in tokens.iter().enumerate() {
            if let Some(weight) = self.words.get(token.as_str()) {
                let negated = tokens[i.saturating_sub(2)..i]
                    .iter()
                    .any(|prev| self.negations.iter().any(|n| n == prev));
                score += if negated { -weight } else { *weight };
            }
        }

        score
    }
}

#[async_trait]
impl SentimentClassifier for LexiconClassifier {
    async fn classify(&self, text: &str) -> Result<SentimentResult> {
        let score = self.score(text);
        let probability = 1.0 / (1.0 + (-self.steepness * score).exp());
        // Neutral text (score 0) falls on the negative side, as with a
        // decision threshold of score > 0.
        let label = SentimentLabel::from_bool(score > 0.0);

        debug!("Lexicon score {:.2} for \"{}\"", score, text);
        Ok(SentimentResult::new(text, label, probability))
    }

    fn name(&self) -> &str {
        "lexicon"
    }
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    label: bool,
    probability: f64,
}

/// Delegates to an externally hosted model over HTTP.
///
/// Expects `POST {url}` with `{"text": ...}` to answer
/// `{"label": bool, "probability": float}`.
pub struct RemoteClassifier {
    url: String,
    client: Client,
}

impl RemoteClassifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        let client = http_client(timeout, USER_AGENT)?;
        info!("Using remote sentiment classifier at {}", url);
        Ok(Self { url, client })
    }
}

#[async_trait]
impl SentimentClassifier for RemoteClassifier {
    async fn classify(&self, text: &str) -> Result<SentimentResult> {
        let response = self
            .client
            .post(&self.url)
            .json(&ClassifyRequest { text })
            .send()
            .await
            .map_err(|e| CoinSeerError::classification_error(text, e))?;

        if !response.status().is_success() {
            return Err(CoinSeerError::classification_error(
                text,
                format!("classifier returned HTTP {}", response.status()),
            ));
        }

        let body: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| CoinSeerError::classification_error(text, e))?;

        if !(0.0..=1.0).contains(&body.probability) {
            return Err(CoinSeerError::classification_error(
                text,
                format!("probability {} outside [0, 1]", body.probability),
            ));
        }

        Ok(SentimentResult::new(
            text,
            SentimentLabel::from_bool(body.label),
            body.probability,
        ))
    }

    fn name(&self) -> &str {
        "remote"
    }
}
