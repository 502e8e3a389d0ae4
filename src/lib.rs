//! # stock-rewards
//!
//! Stock reward ledger and portfolio valuation service.
//!
//! Users receive fractional shares as rewards. Every reward is priced,
//! charged brokerage, STT and GST, posted as four balanced double-entry
//! ledger legs and credited to the user's holding in one atomic unit.
//! Portfolios are valued at current and historical prices.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── RewardService, PortfolioService (service/)
//!     ├── PriceCache ── PriceRefresher (service/)
//!     │        │
//!     │        └── PriceOracle (oracle/)
//!     │
//!     └── RewardStore: PostgreSQL | in-memory (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod oracle;
pub mod persistence;
pub mod service;
