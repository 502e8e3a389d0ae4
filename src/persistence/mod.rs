//! Persistence layer: the reward store abstraction and its backends.
//!
//! Services never talk to a database handle directly. They receive an
//! `Arc<dyn RewardStore>` at construction time, which is either a
//! [`postgres::PostgresStore`] in production or a
//! [`memory::InMemoryStore`] in tests.
//!
//! The only multi-statement write is [`RewardStore::commit_reward`], which
//! must apply the whole [`RewardPosting`] or nothing.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{
    LedgerEntry, Money, PricedHolding, Quantity, RewardEvent, RewardId, RewardPosting, StockPrice,
    StockPriceHistory, UserId,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Errors raised by a [`RewardStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Driver-level failure (connection, query, commit).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Embedded migrations failed to apply.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The active-reference uniqueness constraint rejected the reward.
    #[error("duplicate reference id: {0}")]
    DuplicateReference(String),

    /// A stored row could not be decoded into a domain value.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// An accumulated quantity left the range its column can hold.
    #[error("value out of range: {0}")]
    OutOfRange(String),
}

/// Store session injected into every service.
///
/// Read methods that return lists only include rows that decode cleanly;
/// undecodable rows are skipped and logged. Writes are all-or-nothing.
#[async_trait]
pub trait RewardStore: Send + Sync + fmt::Debug {
    /// `true` if the user exists and is not soft-deleted.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on database failure.
    async fn user_exists(&self, user_id: UserId) -> Result<bool, StoreError>;

    /// The non-deleted reward carrying `reference_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on database failure.
    async fn find_active_reward_by_reference(
        &self,
        reference_id: &str,
    ) -> Result<Option<RewardEvent>, StoreError>;

    /// Cheap round trip proving the backing store answers.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the store is unreachable.
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Writes the reward row, its ledger legs, the holding delta and the
    /// optional refreshed current price as one unit of work.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateReference`] when another non-deleted
    /// reward already owns the reference id, and any other [`StoreError`]
    /// after rolling the unit of work back.
    async fn commit_reward(&self, posting: &RewardPosting) -> Result<(), StoreError>;

    /// Reward by id, including soft-deleted ones.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on database failure.
    async fn get_reward(&self, id: RewardId) -> Result<Option<RewardEvent>, StoreError>;

    /// Ledger legs produced for `reference_id`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on database failure.
    async fn ledger_entries_by_reference(
        &self,
        reference_id: &str,
    ) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Non-deleted rewards of `user_id` with `start <= reward_timestamp < end`,
    /// newest first.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on database failure.
    async fn rewards_between(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RewardEvent>, StoreError>;

    /// Holdings with a positive quantity, each joined with its non-stale
    /// current price.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on database failure.
    async fn priced_holdings(&self, user_id: UserId) -> Result<Vec<PricedHolding>, StoreError>;

    /// Distinct UTC days strictly before `before` carrying an active,
    /// non-deleted reward of `user_id`, latest first.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on database failure.
    async fn reward_dates_before(
        &self,
        user_id: UserId,
        before: NaiveDate,
    ) -> Result<Vec<NaiveDate>, StoreError>;

    /// Per-symbol sum of active, non-deleted reward quantities whose UTC
    /// day is on or before `through`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on database failure.
    async fn cumulative_quantities(
        &self,
        user_id: UserId,
        through: NaiveDate,
    ) -> Result<Vec<(String, Quantity)>, StoreError>;

    /// Current price row for `symbol`, stale or not.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on database failure.
    async fn current_price(&self, symbol: &str) -> Result<Option<StockPrice>, StoreError>;

    /// Inserts or overwrites the current price row for `price.stock_symbol`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on database failure.
    async fn upsert_price(&self, price: &StockPrice) -> Result<(), StoreError>;

    /// Flags every fresh price last updated before `cutoff` as stale.
    /// Returns the number of rows that flipped.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on database failure.
    async fn mark_stale_prices(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Stored price of `symbol` for exactly `date`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on database failure.
    async fn historical_price(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<Money>, StoreError>;

    /// Inserts or overwrites the `(symbol, date)` history row.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on database failure.
    async fn upsert_historical_price(&self, entry: &StockPriceHistory) -> Result<(), StoreError>;

    /// Symbols that appear in non-deleted rewards or in the current price
    /// table, sorted and de-duplicated.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on database failure.
    async fn tracked_symbols(&self) -> Result<Vec<String>, StoreError>;
}
