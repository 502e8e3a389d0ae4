//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::persistence::RewardStore;
use crate::service::{PortfolioService, PriceCache, RewardService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Ledger writer: reward creation and today's rewards.
    pub reward_service: Arc<RewardService>,
    /// Valuator: portfolio, stats and historical value.
    pub portfolio_service: Arc<PortfolioService>,
    /// Price cache, for historical price administration.
    pub price_cache: Arc<PriceCache>,
    /// Ledger store, for the health check.
    pub store: Arc<dyn RewardStore>,
}

impl AppState {
    /// Wires the services over one store and one price cache.
    #[must_use]
    pub fn new(store: Arc<dyn RewardStore>, price_cache: Arc<PriceCache>) -> Self {
        Self {
            reward_service: Arc::new(RewardService::new(
                Arc::clone(&store),
                Arc::clone(&price_cache),
            )),
            portfolio_service: Arc::new(PortfolioService::new(
                Arc::clone(&store),
                Arc::clone(&price_cache),
            )),
            price_cache,
            store,
        }
    }
}
