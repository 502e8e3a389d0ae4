//! Simulated market feed: a random draw within ±5 % of a base price.

use std::collections::HashMap;

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;

use super::{OracleError, PriceOracle};
use crate::domain::Money;

/// Base price used for symbols missing from the table.
pub const DEFAULT_BASE_PRICE: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Maximum variation around the base price, in basis points.
const MAX_VARIATION_BPS: i64 = 500;

const BASE_PRICES: [(&str, i64); 10] = [
    ("RELIANCE", 2500),
    ("TCS", 3500),
    ("INFY", 1500),
    ("HDFCBANK", 1700),
    ("ICICIBANK", 950),
    ("BHARTIARTL", 1200),
    ("SBIN", 600),
    ("BAJFINANCE", 7000),
    ("WIPRO", 450),
    ("HINDUNILVR", 2500),
];

/// Oracle returning `base × (1 ± 5 %)`, rounded to two decimals.
#[derive(Debug, Clone)]
pub struct RandomWalkOracle {
    base_prices: HashMap<String, Decimal>,
}

impl Default for RandomWalkOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomWalkOracle {
    /// Creates an oracle seeded with large-cap NSE base prices.
    #[must_use]
    pub fn new() -> Self {
        let base_prices = BASE_PRICES
            .iter()
            .map(|(symbol, price)| ((*symbol).to_string(), Decimal::from(*price)))
            .collect();
        Self { base_prices }
    }

    /// Base price for `symbol`, or [`DEFAULT_BASE_PRICE`].
    #[must_use]
    pub fn base_price(&self, symbol: &str) -> Decimal {
        self.base_prices
            .get(symbol)
            .copied()
            .unwrap_or(DEFAULT_BASE_PRICE)
    }

    /// Applies a variation expressed in basis points and rounds to paise.
    fn quote(base: Decimal, variation_bps: i64) -> Money {
        let factor = Decimal::ONE + Decimal::new(variation_bps, 4);
        Money::new((base * factor).round_dp(2))
    }
}

#[async_trait]
impl PriceOracle for RandomWalkOracle {
    async fn fetch_price(&self, symbol: &str) -> Result<Money, OracleError> {
        let variation_bps = rand::thread_rng().gen_range(-MAX_VARIATION_BPS..=MAX_VARIATION_BPS);
        let price = Self::quote(self.base_price(symbol), variation_bps);
        tracing::debug!(symbol, %price, "fetched stock price");
        Ok(price)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn unknown_symbol_uses_default_base() {
        let oracle = RandomWalkOracle::new();
        assert_eq!(oracle.base_price("ZZZ"), DEFAULT_BASE_PRICE);
        assert_eq!(oracle.base_price("TCS"), Decimal::from(3500));
    }

    #[test]
    fn quote_applies_basis_points() {
        let base = Decimal::from(1500);
        assert_eq!(RandomWalkOracle::quote(base, 500).amount(), Decimal::new(157_500, 2));
        assert_eq!(RandomWalkOracle::quote(base, -500).amount(), Decimal::new(142_500, 2));
        assert_eq!(RandomWalkOracle::quote(base, 1).amount(), Decimal::new(150_015, 2));
    }

    #[tokio::test]
    async fn quotes_stay_within_band() {
        let oracle = RandomWalkOracle::new();
        let low = Decimal::new(332_500, 2);
        let high = Decimal::new(367_500, 2);
        for _ in 0..50 {
            let Ok(price) = oracle.fetch_price("TCS").await else {
                panic!("random walk never fails");
            };
            assert!(price.amount() >= low && price.amount() <= high, "{price} out of band");
            assert_eq!(price.amount(), price.amount().round_dp(2));
        }
    }
}
