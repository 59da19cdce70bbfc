use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::{CoinSeerError, Result};

/// Tracked currencies. Declaration order is the iteration order of an [`AliasTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Currency {
    XRP,
    BTC,
    XLM,
    ETH,
    BNB,
    LTC,
}

impl Currency {
    pub const ALL: [Currency; 6] = [
        Currency::XRP,
        Currency::BTC,
        Currency::XLM,
        Currency::ETH,
        Currency::BNB,
        Currency::LTC,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::XRP => "XRP",
            Currency::BTC => "BTC",
            Currency::XLM => "XLM",
            Currency::ETH => "ETH",
            Currency::BNB => "BNB",
            Currency::LTC => "LTC",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Currency {
    type Err = CoinSeerError;

    fn from_str(s: &str) -> Result<Self> {
        Currency::ALL
            .iter()
            .copied()
            .find(|c| c.symbol().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoinSeerError::config_error(format!("Unknown currency: {}", s)))
    }
}

/// Immutable currency -> alias mapping consulted by the mention tagger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasTable {
    entries: BTreeMap<Currency, BTreeSet<String>>,
}

impl Default for AliasTable {
    fn default() -> Self {
        let defaults: [(Currency, &[&str]); 6] = [
            (Currency::XRP, &["ripple", "xrp"]),
            (Currency::BTC, &["btc", "bitcoin"]),
            (Currency::XLM, &["stellar lumens", "xlm"]),
            (Currency::ETH, &["eth", "ethereum"]),
            (Currency::BNB, &["bnb", "binance coin"]),
            (Currency::LTC, &["ltc", "litecoin"]),
        ];

        let entries = defaults
            .iter()
            .map(|(currency, aliases)| {
                (*currency, aliases.iter().map(|a| a.to_string()).collect())
            })
            .collect();

        Self { entries }
    }
}

impl AliasTable {
    /// Builds a table from currency/alias pairs.
    ///
    /// Aliases must be non-blank and already lowercase; anything else is a
    /// configuration error. An empty alias set is accepted but that currency
    /// will never be tagged.
    pub fn new<I, A, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Currency, A)>,
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries: BTreeMap<Currency, BTreeSet<String>> = BTreeMap::new();

        for (currency, aliases) in pairs {
            let set = entries.entry(currency).or_default();
            for alias in aliases {
                let alias = alias.into();
                if alias.trim().is_empty() {
                    return Err(CoinSeerError::config_error(format!(
                        "Blank alias configured for {}",
                        currency
                    )));
                }
                if alias != alias.to_lowercase() {
                    return Err(CoinSeerError::config_error(format!(
                        "Alias \"{}\" for {} must be lowercase",
                        alias, currency
                    )));
                }
                set.insert(alias);
            }
        }

        for (currency, aliases) in &entries {
            if aliases.is_empty() {
                warn!("Currency {} has no aliases and can never be matched", currency);
            }
        }

        Ok(Self { entries })
    }

    /// Loads a table from a JSON object such as `{"BTC": ["btc", "bitcoin"]}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(json)
            .map_err(|e| CoinSeerError::config_error(format!("Malformed alias table: {}", e)))?;

        let mut pairs = Vec::with_capacity(raw.len());
        for (key, aliases) in raw {
            pairs.push((key.parse::<Currency>()?, aliases));
        }

        Self::new(pairs)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Loading alias table from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoinSeerError::config_error(format!(
                "Cannot read alias table {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    pub fn aliases_for(&self, currency: Currency) -> Option<&BTreeSet<String>> {
        self.entries.get(&currency)
    }

    pub fn all_currencies(&self) -> impl Iterator<Item = Currency> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Currency, &BTreeSet<String>)> {
        self.entries.iter().map(|(c, a)| (*c, a))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
