//! Portfolio valuation: current holdings and point-in-time replay.
//!
//! Current value joins holdings with fresh stored prices and falls back to
//! the oracle. Past value replays the reward log day by day against the
//! historical price table. Both read paths are best-effort: a symbol or a
//! day that cannot be priced is logged and left out rather than failing
//! the whole answer.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::calendar::day_window;
use crate::domain::{
    ConsistencyPolicy, HistoricalValue, Money, PortfolioItem, PortfolioStats, PricedHolding,
    Quantity, UserId,
};
use crate::error::RewardsError;
use crate::persistence::RewardStore;
use crate::service::price_cache::PriceCache;

/// Portfolio valuator.
#[derive(Debug, Clone)]
pub struct PortfolioService {
    store: Arc<dyn RewardStore>,
    prices: Arc<PriceCache>,
}

impl PortfolioService {
    /// Creates a new `PortfolioService`.
    #[must_use]
    pub fn new(store: Arc<dyn RewardStore>, prices: Arc<PriceCache>) -> Self {
        Self { store, prices }
    }

    /// Holdings with a positive quantity, valued at the current price and
    /// sorted by value, largest first.
    ///
    /// A holding without a fresh stored price is quoted live and the quote
    /// is written back as the current price. If the oracle fails too the
    /// holding is listed at price zero. A holding whose value does not fit
    /// the money range is logged and left out.
    ///
    /// # Errors
    ///
    /// Returns [`RewardsError::Store`] if the holdings cannot be read.
    pub async fn get_portfolio(&self, user_id: UserId) -> Result<Vec<PortfolioItem>, RewardsError> {
        let holdings = self.store.priced_holdings(user_id).await?;
        let now = Utc::now();

        let policy = ConsistencyPolicy::ReadBestEffort;
        let mut items = Vec::with_capacity(holdings.len());
        for priced in holdings {
            let valued = self.value_holding(priced, now).await;
            if let Some(item) = policy.admit("holding valuation", valued)? {
                items.push(item);
            }
        }
        items.sort_by(|a, b| {
            b.current_value
                .cmp(&a.current_value)
                .then_with(|| a.stock_symbol.cmp(&b.stock_symbol))
        });
        Ok(items)
    }

    async fn value_holding(
        &self,
        priced: PricedHolding,
        now: DateTime<Utc>,
    ) -> Result<PortfolioItem, RewardsError> {
        let PricedHolding {
            holding,
            fresh_price,
        } = priced;
        if let Some(price) = fresh_price {
            return PortfolioItem::priced(holding, price);
        }

        let symbol = holding.stock_symbol.clone();
        match self.prices.get_price(&symbol).await {
            Ok(price) => {
                if let Err(e) = self.prices.update_price(&symbol, price, now).await {
                    tracing::warn!(symbol = %symbol, error = %e, "could not persist live quote");
                }
                PortfolioItem::priced(holding, price)
            }
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "no price for holding, valuing at zero");
                PortfolioItem::priced(holding, Money::ZERO)
            }
        }
    }

    /// Sum of `current_value` over [`PortfolioService::get_portfolio`].
    ///
    /// # Errors
    ///
    /// Returns [`RewardsError::Store`] if the holdings cannot be read, or
    /// [`RewardsError::Internal`] if the total does not fit the money range.
    pub async fn get_current_portfolio_value(&self, user_id: UserId) -> Result<Money, RewardsError> {
        let items = self.get_portfolio(user_id).await?;
        PortfolioItem::total(&items)
    }

    /// Today's rewarded quantities per symbol plus the current value.
    ///
    /// # Errors
    ///
    /// Returns [`RewardsError::Store`] on database failure.
    pub async fn get_stats(&self, user_id: UserId) -> Result<PortfolioStats, RewardsError> {
        self.get_stats_at(user_id, Utc::now()).await
    }

    /// Like [`PortfolioService::get_stats`], with "today" taken from `now`.
    ///
    /// # Errors
    ///
    /// Returns [`RewardsError::Store`] on database failure, or
    /// [`RewardsError::Internal`] if a total does not fit its range.
    pub async fn get_stats_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<PortfolioStats, RewardsError> {
        let (start, end) = day_window(now);
        let rewards = self.store.rewards_between(user_id, start, end).await?;

        let mut today_stocks: BTreeMap<String, Quantity> = BTreeMap::new();
        for reward in rewards {
            let total = today_stocks.entry(reward.stock_symbol).or_default();
            *total = total.checked_add(reward.quantity).ok_or_else(|| {
                RewardsError::Internal("today's rewarded quantity is out of range".to_string())
            })?;
        }

        Ok(PortfolioStats {
            today_stocks,
            current_portfolio_value_inr: self.get_current_portfolio_value(user_id).await?,
        })
    }

    /// Portfolio value at the end of every past UTC day on which the user
    /// received an active reward, latest day first.
    ///
    /// # Errors
    ///
    /// Returns [`RewardsError::Store`] if the reward days cannot be read.
    /// Days that fail to value are skipped.
    pub async fn get_historical_inr(
        &self,
        user_id: UserId,
    ) -> Result<Vec<HistoricalValue>, RewardsError> {
        self.get_historical_inr_at(user_id, Utc::now()).await
    }

    /// Like [`PortfolioService::get_historical_inr`], with "today" taken
    /// from `now`.
    ///
    /// # Errors
    ///
    /// Returns [`RewardsError::Store`] if the reward days cannot be read.
    pub async fn get_historical_inr_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<HistoricalValue>, RewardsError> {
        let dates = self
            .store
            .reward_dates_before(user_id, now.date_naive())
            .await?;

        let policy = ConsistencyPolicy::ReadBestEffort;
        let mut series = Vec::with_capacity(dates.len());
        for date in dates {
            let valued = self.value_on(user_id, date).await;
            if let Some(value) = policy.admit("historical valuation", valued)? {
                series.push(HistoricalValue { date, value });
            }
        }
        Ok(series)
    }

    /// Value of everything rewarded up to and including `date`, priced at
    /// that day's historical prices.
    async fn value_on(&self, user_id: UserId, date: NaiveDate) -> Result<Money, RewardsError> {
        let quantities = self.store.cumulative_quantities(user_id, date).await?;
        let mut total = Money::ZERO;
        for (symbol, quantity) in quantities {
            let price = self.prices.get_historical_price(&symbol, date).await?;
            total = price
                .checked_mul(quantity)
                .and_then(|value| total.checked_add(value))
                .ok_or_else(|| {
                    RewardsError::Internal(format!("portfolio value on {date} is out of range"))
                })?;
        }
        Ok(total)
    }
}
