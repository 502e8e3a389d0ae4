//! Price oracle: the external source of current stock quotes.
//!
//! Services depend only on [`PriceOracle`]. The production binary wires a
//! [`RandomWalkOracle`]; tests use a [`StaticPriceOracle`] so that every
//! valuation is reproducible.

use std::fmt;

use async_trait::async_trait;

use crate::domain::Money;
use crate::error::RewardsError;

pub mod random_walk;
pub mod static_prices;

pub use random_walk::RandomWalkOracle;
pub use static_prices::StaticPriceOracle;

/// Errors raised by a [`PriceOracle`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// The oracle has no quote for the symbol right now.
    #[error("no quote available for {0}")]
    Unavailable(String),
}

impl From<OracleError> for RewardsError {
    fn from(err: OracleError) -> Self {
        Self::Oracle(err.to_string())
    }
}

/// Source of current prices.
#[async_trait]
pub trait PriceOracle: Send + Sync + fmt::Debug {
    /// Current price of `symbol`.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Unavailable`] if no quote can be produced.
    async fn fetch_price(&self, symbol: &str) -> Result<Money, OracleError>;
}
