//! Background price refresh loop.
//!
//! Runs once immediately, then on every tick: re-quote all tracked symbols
//! and sweep stale prices. Stops when the shutdown channel flips to `true`
//! or its sender is dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

use crate::service::price_cache::PriceCache;

/// Periodic re-priming of the price cache.
#[derive(Debug, Clone)]
pub struct PriceRefresher {
    prices: Arc<PriceCache>,
    period: Duration,
    record_history: bool,
}

impl PriceRefresher {
    /// Creates a refresher ticking every `period`.
    #[must_use]
    pub fn new(prices: Arc<PriceCache>, period: Duration, record_history: bool) -> Self {
        Self {
            prices,
            period,
            record_history,
        }
    }

    /// One refresh pass. Failures are logged; the loop keeps going.
    pub async fn tick(&self) {
        let now = Utc::now();
        if let Err(e) = self.prices.refresh_all(now, self.record_history).await {
            tracing::error!(error = %e, "price refresh failed");
        }
        if let Err(e) = self.prices.mark_stale_prices(now).await {
            tracing::error!(error = %e, "stale price sweep failed");
        }
    }

    /// Runs until `shutdown` signals.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(period_secs = self.period.as_secs(), "price refresh job started");

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("price refresh job stopped");
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::Money;
    use crate::oracle::{PriceOracle, StaticPriceOracle};
    use crate::persistence::{InMemoryStore, RewardStore};
    use rust_decimal::Decimal;

    fn setup() -> (Arc<InMemoryStore>, Arc<PriceCache>) {
        let store = Arc::new(InMemoryStore::new());
        let oracle = StaticPriceOracle::new().with_default(Money::new(Decimal::from(1234)));
        let prices = Arc::new(PriceCache::new(
            Arc::clone(&store) as Arc<dyn RewardStore>,
            Arc::new(oracle) as Arc<dyn PriceOracle>,
        ));
        (store, prices)
    }

    #[tokio::test]
    async fn tick_refreshes_tracked_symbols() {
        let (store, prices) = setup();
        let Ok(()) = prices
            .update_price("SBIN", Money::new(Decimal::from(600)), Utc::now())
            .await
        else {
            panic!("seed price");
        };
        let refresher = PriceRefresher::new(Arc::clone(&prices), Duration::from_secs(3600), true);
        refresher.tick().await;

        let Ok(Some(row)) = store.current_price("SBIN").await else {
            panic!("price row should exist");
        };
        assert_eq!(row.price, Money::new(Decimal::from(1234)));
        let today = Utc::now().date_naive();
        assert!(matches!(store.historical_price("SBIN", today).await, Ok(Some(_))));
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let (_, prices) = setup();
        let refresher = PriceRefresher::new(prices, Duration::from_millis(10), false);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(refresher.run(rx));

        tokio::time::sleep(Duration::from_millis(30)).await;
        let Ok(()) = tx.send(true) else {
            panic!("receiver alive");
        };
        let joined = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn run_stops_when_sender_dropped() {
        let (_, prices) = setup();
        let refresher = PriceRefresher::new(prices, Duration::from_secs(3600), false);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(refresher.run(rx));
        drop(tx);
        let joined = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }
}
