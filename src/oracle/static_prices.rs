//! Fixed-price oracle for tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{OracleError, PriceOracle};
use crate::domain::Money;

/// Oracle answering from a fixed table, with a default for other symbols.
#[derive(Debug, Default)]
pub struct StaticPriceOracle {
    prices: HashMap<String, Money>,
    default_price: Option<Money>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl StaticPriceOracle {
    /// Creates an oracle with no quotes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a quote for `symbol`.
    #[must_use]
    pub fn with_price(mut self, symbol: &str, price: Money) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }

    /// Quotes `price` for every symbol without an explicit entry.
    #[must_use]
    pub fn with_default(mut self, price: Money) -> Self {
        self.default_price = Some(price);
        self
    }

    /// Makes every fetch fail until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of fetches served or refused so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceOracle for StaticPriceOracle {
    async fn fetch_price(&self, symbol: &str) -> Result<Money, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(OracleError::Unavailable(symbol.to_string()));
        }
        self.prices
            .get(symbol)
            .copied()
            .or(self.default_price)
            .ok_or_else(|| OracleError::Unavailable(symbol.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn explicit_quote_wins_over_default() {
        let oracle = StaticPriceOracle::new()
            .with_price("TCS", Money::new(Decimal::from(3500)))
            .with_default(Money::new(Decimal::from(1000)));
        assert_eq!(oracle.fetch_price("TCS").await, Ok(Money::new(Decimal::from(3500))));
        assert_eq!(oracle.fetch_price("ZZZ").await, Ok(Money::new(Decimal::from(1000))));
        assert_eq!(oracle.calls(), 2);
    }

    #[tokio::test]
    async fn offline_and_unknown_symbols_fail() {
        let oracle = StaticPriceOracle::new().with_price("TCS", Money::new(Decimal::from(3500)));
        assert!(oracle.fetch_price("ZZZ").await.is_err());
        oracle.set_offline(true);
        assert_eq!(
            oracle.fetch_price("TCS").await,
            Err(OracleError::Unavailable("TCS".to_string()))
        );
    }
}
