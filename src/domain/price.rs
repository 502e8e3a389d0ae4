//! Current and per-day stock prices.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::money::Money;

/// Default age after which a current price is considered stale.
pub const DEFAULT_STALE_AFTER_SECS: i64 = 3_600;

/// Latest known price for a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPrice {
    /// Stock symbol (unique).
    pub stock_symbol: String,
    /// Last observed price.
    pub price: Money,
    /// When the price was observed.
    pub last_updated: DateTime<Utc>,
    /// Set by the refresh sweep once `last_updated` falls behind the threshold.
    pub is_stale: bool,
}

/// Price a reward executes at, plus the current-price row to write with
/// the reward when the quote came from the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPrice {
    /// Per-share price used for the fee breakdown.
    pub price: Money,
    /// Fresh row replacing a missing or stale stored price.
    pub refreshed: Option<StockPrice>,
}

/// Price of a symbol pinned to a calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPriceHistory {
    /// Stock symbol.
    pub stock_symbol: String,
    /// Price on that day.
    pub price: Money,
    /// UTC calendar day.
    pub price_date: NaiveDate,
}

/// What historical valuation does when no history row exists for a day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryFallback {
    /// Price the day with a live oracle quote. Available but not truly historical.
    #[default]
    Live,
    /// Refuse to price the day.
    Strict,
}

impl fmt::Display for HistoryFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => f.write_str("live"),
            Self::Strict => f.write_str("strict"),
        }
    }
}

impl FromStr for HistoryFallback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(Self::Live),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown history fallback: {other}")),
        }
    }
}
