//! Domain layer: identifiers, money, ledger legs and read models.
//!
//! Everything here is pure: no I/O, no clocks. Services pass timestamps
//! in explicitly so that valuation and staleness are reproducible.

pub mod calendar;
pub mod fees;
pub mod ids;
pub mod ledger;
pub mod money;
pub mod policy;
pub mod portfolio;
pub mod price;
pub mod reward;

pub use fees::FeeBreakdown;
pub use ids::{RewardId, TransactionId, UserId};
pub use ledger::{AccountType, LedgerEntry};
pub use money::{Money, Quantity};
pub use policy::ConsistencyPolicy;
pub use portfolio::{HistoricalValue, PortfolioItem, PortfolioStats, PricedHolding, UserHolding};
pub use price::{ExecutionPrice, HistoryFallback, StockPrice, StockPriceHistory};
pub use reward::{HoldingDelta, RewardEvent, RewardPosting, RewardRequest, RewardStatus, ValidatedReward};
