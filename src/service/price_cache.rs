//! Price cache: current quotes with a staleness flag and per-day history.
//!
//! The cache never decides staleness on read. A periodic sweep
//! ([`PriceCache::mark_stale_prices`]) flips the flag; readers prefer rows
//! whose flag is clear and otherwise fall through to the oracle.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::domain::price::DEFAULT_STALE_AFTER_SECS;
use crate::domain::{ExecutionPrice, HistoryFallback, Money, StockPrice, StockPriceHistory};
use crate::error::RewardsError;
use crate::oracle::PriceOracle;
use crate::persistence::RewardStore;

/// Outcome of one [`PriceCache::refresh_all`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Symbols whose current price was rewritten.
    pub refreshed: usize,
    /// Symbols skipped because the oracle or the store failed.
    pub failed: usize,
}

/// Point and historical price lookups backed by the store and the oracle.
#[derive(Debug, Clone)]
pub struct PriceCache {
    store: Arc<dyn RewardStore>,
    oracle: Arc<dyn PriceOracle>,
    stale_after: Duration,
    history_fallback: HistoryFallback,
}

impl PriceCache {
    /// Creates a cache with a one-hour staleness threshold and the live
    /// history fallback.
    #[must_use]
    pub fn new(store: Arc<dyn RewardStore>, oracle: Arc<dyn PriceOracle>) -> Self {
        Self {
            store,
            oracle,
            stale_after: Duration::seconds(DEFAULT_STALE_AFTER_SECS),
            history_fallback: HistoryFallback::default(),
        }
    }

    /// Overrides the staleness threshold.
    #[must_use]
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Overrides what happens when a day has no stored price.
    #[must_use]
    pub fn with_history_fallback(mut self, history_fallback: HistoryFallback) -> Self {
        self.history_fallback = history_fallback;
        self
    }

    /// The staleness threshold.
    #[must_use]
    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// Current price straight from the oracle. Nothing is read or written.
    ///
    /// # Errors
    ///
    /// Returns [`RewardsError::Oracle`] if the oracle has no quote.
    pub async fn get_price(&self, symbol: &str) -> Result<Money, RewardsError> {
        Ok(self.oracle.fetch_price(symbol).await?)
    }

    /// Upserts the current price of `symbol`, clearing its stale flag.
    ///
    /// # Errors
    ///
    /// Returns [`RewardsError::Store`] on database failure.
    pub async fn update_price(
        &self,
        symbol: &str,
        price: Money,
        observed_at: DateTime<Utc>,
    ) -> Result<(), RewardsError> {
        self.store
            .upsert_price(&StockPrice {
                stock_symbol: symbol.to_string(),
                price,
                last_updated: observed_at,
                is_stale: false,
            })
            .await?;
        Ok(())
    }

    /// Flags every price older than the threshold as stale. Running it
    /// twice with the same `now` flips nothing the second time.
    ///
    /// # Errors
    ///
    /// Returns [`RewardsError::Store`] on database failure.
    pub async fn mark_stale_prices(&self, now: DateTime<Utc>) -> Result<u64, RewardsError> {
        let cutoff = now
            .checked_sub_signed(self.stale_after)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let flipped = self.store.mark_stale_prices(cutoff).await?;
        if flipped > 0 {
            tracing::info!(flipped, "marked stale prices");
        }
        Ok(flipped)
    }

    /// Price of `symbol` pinned to `date`.
    ///
    /// Without a stored row the configured [`HistoryFallback`] applies:
    /// `Live` quotes today's oracle price, `Strict` refuses.
    ///
    /// # Errors
    ///
    /// Returns [`RewardsError::HistoryUnavailable`] under the strict
    /// fallback, [`RewardsError::Store`] if the strict lookup itself fails,
    /// or [`RewardsError::Oracle`] if the live fallback fails.
    pub async fn get_historical_price(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Money, RewardsError> {
        match (self.store.historical_price(symbol, date).await, self.history_fallback) {
            (Ok(Some(price)), _) => Ok(price),
            (Ok(None), HistoryFallback::Live) => {
                tracing::debug!(symbol, %date, "no historical price, using live quote");
                self.get_price(symbol).await
            }
            (Err(e), HistoryFallback::Live) => {
                tracing::warn!(symbol, %date, error = %e, "historical lookup failed, using live quote");
                self.get_price(symbol).await
            }
            (Ok(None), HistoryFallback::Strict) => Err(RewardsError::HistoryUnavailable {
                symbol: symbol.to_string(),
                date,
            }),
            (Err(e), HistoryFallback::Strict) => Err(e.into()),
        }
    }

    /// Upserts the `(symbol, date)` history row.
    ///
    /// # Errors
    ///
    /// Returns [`RewardsError::Store`] on database failure.
    pub async fn save_historical_price(
        &self,
        symbol: &str,
        date: NaiveDate,
        price: Money,
    ) -> Result<(), RewardsError> {
        self.store
            .upsert_historical_price(&StockPriceHistory {
                stock_symbol: symbol.to_string(),
                price,
                price_date: date,
            })
            .await?;
        Ok(())
    }

    /// Execution price for a new reward: the stored price if it is not
    /// stale, otherwise a fresh oracle quote. Nothing is written; a fresh
    /// quote comes back as the row the reward commit should store.
    ///
    /// # Errors
    ///
    /// Returns [`RewardsError::Store`] or [`RewardsError::Oracle`].
    pub async fn resolve_execution_price(
        &self,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> Result<ExecutionPrice, RewardsError> {
        match self.store.current_price(symbol).await? {
            Some(current) if !current.is_stale => {
                return Ok(ExecutionPrice {
                    price: current.price,
                    refreshed: None,
                });
            }
            _ => {}
        }
        let price = self.get_price(symbol).await?;
        Ok(ExecutionPrice {
            price,
            refreshed: Some(StockPrice {
                stock_symbol: symbol.to_string(),
                price,
                last_updated: now,
                is_stale: false,
            }),
        })
    }

    /// Re-quotes every tracked symbol. When `record_history` is set the
    /// quote is also pinned to `now`'s UTC day. Per-symbol failures are
    /// logged and counted.
    ///
    /// # Errors
    ///
    /// Returns [`RewardsError::Store`] if the symbol list cannot be read.
    pub async fn refresh_all(
        &self,
        now: DateTime<Utc>,
        record_history: bool,
    ) -> Result<RefreshSummary, RewardsError> {
        let symbols = self.store.tracked_symbols().await?;
        let mut summary = RefreshSummary::default();

        for symbol in &symbols {
            match self.refresh_one(symbol, now, record_history).await {
                Ok(()) => summary.refreshed += 1,
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "price refresh failed");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            refreshed = summary.refreshed,
            failed = summary.failed,
            "updated all stock prices"
        );
        Ok(summary)
    }

    async fn refresh_one(
        &self,
        symbol: &str,
        now: DateTime<Utc>,
        record_history: bool,
    ) -> Result<(), RewardsError> {
        let price = self.get_price(symbol).await?;
        self.update_price(symbol, price, now).await?;
        if record_history {
            self.save_historical_price(symbol, now.date_naive(), price)
                .await?;
        }
        Ok(())
    }
}
