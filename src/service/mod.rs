//! Service layer: business logic orchestration.
//!
//! [`PriceCache`] wraps the store and the oracle for quotes.
//! [`RewardService`] books rewards into the ledger and
//! [`PortfolioService`] values what users hold. [`PriceRefresher`] keeps
//! the cache warm in the background.

pub mod portfolio_service;
pub mod price_cache;
pub mod price_refresher;
pub mod reward_service;

pub use portfolio_service::PortfolioService;
pub use price_cache::{PriceCache, RefreshSummary};
pub use price_refresher::PriceRefresher;
pub use reward_service::RewardService;
