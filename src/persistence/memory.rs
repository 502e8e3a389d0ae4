//! In-memory [`RewardStore`] used by tests and local demos.
//!
//! All tables live behind one [`tokio::sync::RwLock`]. A reward commit is
//! staged on a copy of the tables and swapped in only once every step
//! succeeded, so a failed commit leaves nothing behind.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use super::{RewardStore, StoreError};
use crate::domain::{
    HoldingDelta, LedgerEntry, Money, PricedHolding, Quantity, RewardEvent, RewardId,
    RewardPosting, RewardStatus, StockPrice, StockPriceHistory, UserHolding, UserId,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    /// User id to soft-delete flag.
    users: BTreeMap<UserId, bool>,
    rewards: Vec<RewardEvent>,
    ledger: Vec<LedgerEntry>,
    holdings: BTreeMap<(UserId, String), UserHolding>,
    prices: BTreeMap<String, StockPrice>,
    history: BTreeMap<(String, NaiveDate), Money>,
}

impl Tables {
    fn active_rewards(&self, user_id: UserId) -> impl Iterator<Item = &RewardEvent> {
        self.rewards.iter().filter(move |r| {
            r.user_id == user_id && r.deleted_at.is_none() && r.status == RewardStatus::Active
        })
    }
}

/// Lock-guarded tables with the same semantics as the PostgreSQL schema.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    #[cfg(test)]
    fail_holding_upsert: std::sync::atomic::AtomicBool,
    #[cfg(test)]
    unreachable: std::sync::atomic::AtomicBool,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an active user.
    pub async fn insert_user(&self, user_id: UserId) {
        self.tables.write().await.users.insert(user_id, false);
    }

    /// Soft-deletes a user. Returns `false` if the user is unknown.
    pub async fn soft_delete_user(&self, user_id: UserId) -> bool {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&user_id) {
            Some(deleted) => {
                *deleted = true;
                true
            }
            None => false,
        }
    }

    /// Soft-deletes the non-deleted reward carrying `reference_id`.
    /// Returns `false` if there is none.
    pub async fn soft_delete_reward(&self, reference_id: &str, at: DateTime<Utc>) -> bool {
        let mut tables = self.tables.write().await;
        let reward = tables
            .rewards
            .iter_mut()
            .find(|r| r.reference_id == reference_id && r.deleted_at.is_none());
        match reward {
            Some(reward) => {
                reward.deleted_at = Some(at);
                reward.updated_at = at;
                true
            }
            None => false,
        }
    }

    /// Makes the holding step of the next commits fail, after the reward
    /// and its legs have been staged.
    #[cfg(test)]
    pub(crate) fn fail_holding_upsert(&self, fail: bool) {
        self.fail_holding_upsert
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Makes [`RewardStore::health_check`] fail.
    #[cfg(test)]
    pub(crate) fn set_unreachable(&self, unreachable: bool) {
        self.unreachable
            .store(unreachable, std::sync::atomic::Ordering::SeqCst);
    }

    fn stage_holding(&self, tables: &mut Tables, delta: &HoldingDelta) -> Result<(), StoreError> {
        #[cfg(test)]
        if self
            .fail_holding_upsert
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            return Err(StoreError::Database(sqlx::Error::Protocol(
                "injected holding upsert failure".to_string(),
            )));
        }

        let key = (delta.user_id, delta.stock_symbol.clone());
        match tables.holdings.get_mut(&key) {
            Some(holding) => {
                let Some(quantity) = holding.quantity.checked_add(delta.quantity) else {
                    return Err(StoreError::OutOfRange(format!(
                        "holding {} of {} plus {}",
                        holding.quantity, delta.stock_symbol, delta.quantity
                    )));
                };
                holding.quantity = quantity;
                holding.last_updated = delta.at;
            }
            None => {
                tables.holdings.insert(
                    key,
                    UserHolding {
                        user_id: delta.user_id,
                        stock_symbol: delta.stock_symbol.clone(),
                        quantity: delta.quantity,
                        last_updated: delta.at,
                    },
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RewardStore for InMemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        #[cfg(test)]
        if self.unreachable.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    async fn user_exists(&self, user_id: UserId) -> Result<bool, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&user_id).is_some_and(|deleted| !deleted))
    }

    async fn find_active_reward_by_reference(
        &self,
        reference_id: &str,
    ) -> Result<Option<RewardEvent>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .rewards
            .iter()
            .find(|r| r.reference_id == reference_id && r.deleted_at.is_none())
            .cloned())
    }

    async fn commit_reward(&self, posting: &RewardPosting) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;

        let reference_id = &posting.reward.reference_id;
        if tables
            .rewards
            .iter()
            .any(|r| &r.reference_id == reference_id && r.deleted_at.is_none())
        {
            return Err(StoreError::DuplicateReference(reference_id.clone()));
        }

        let mut staged = tables.clone();
        staged.rewards.push(posting.reward.clone());
        staged.ledger.extend(posting.legs.iter().cloned());
        self.stage_holding(&mut staged, &posting.holding)?;
        if let Some(price) = &posting.price_update {
            staged
                .prices
                .insert(price.stock_symbol.clone(), price.clone());
        }

        *tables = staged;
        Ok(())
    }

    async fn get_reward(&self, id: RewardId) -> Result<Option<RewardEvent>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.rewards.iter().find(|r| r.id == id).cloned())
    }

    async fn ledger_entries_by_reference(
        &self,
        reference_id: &str,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .ledger
            .iter()
            .filter(|e| e.reference_id == reference_id)
            .cloned()
            .collect())
    }

    async fn rewards_between(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RewardEvent>, StoreError> {
        let tables = self.tables.read().await;
        let mut rewards: Vec<RewardEvent> = tables
            .rewards
            .iter()
            .filter(|r| {
                r.user_id == user_id
                    && r.deleted_at.is_none()
                    && r.status == RewardStatus::Active
                    && r.reward_timestamp >= start
                    && r.reward_timestamp < end
            })
            .cloned()
            .collect();
        rewards.sort_by(|a, b| b.reward_timestamp.cmp(&a.reward_timestamp));
        Ok(rewards)
    }

    async fn priced_holdings(&self, user_id: UserId) -> Result<Vec<PricedHolding>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .holdings
            .values()
            .filter(|h| h.user_id == user_id && h.quantity.is_positive())
            .map(|h| PricedHolding {
                holding: h.clone(),
                fresh_price: tables
                    .prices
                    .get(&h.stock_symbol)
                    .filter(|p| !p.is_stale)
                    .map(|p| p.price),
            })
            .collect())
    }

    async fn reward_dates_before(
        &self,
        user_id: UserId,
        before: NaiveDate,
    ) -> Result<Vec<NaiveDate>, StoreError> {
        let tables = self.tables.read().await;
        let dates: BTreeSet<NaiveDate> = tables
            .active_rewards(user_id)
            .map(|r| r.reward_timestamp.date_naive())
            .filter(|d| *d < before)
            .collect();
        Ok(dates.into_iter().rev().collect())
    }

    async fn cumulative_quantities(
        &self,
        user_id: UserId,
        through: NaiveDate,
    ) -> Result<Vec<(String, Quantity)>, StoreError> {
        let tables = self.tables.read().await;
        let mut totals: BTreeMap<String, Quantity> = BTreeMap::new();
        for reward in tables
            .active_rewards(user_id)
            .filter(|r| r.reward_timestamp.date_naive() <= through)
        {
            let total = totals.entry(reward.stock_symbol.clone()).or_default();
            let Some(sum) = total.checked_add(reward.quantity) else {
                return Err(StoreError::OutOfRange(format!(
                    "cumulative {total} of {}",
                    reward.stock_symbol
                )));
            };
            *total = sum;
        }
        Ok(totals.into_iter().collect())
    }

    async fn current_price(&self, symbol: &str) -> Result<Option<StockPrice>, StoreError> {
        Ok(self.tables.read().await.prices.get(symbol).cloned())
    }

    async fn upsert_price(&self, price: &StockPrice) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .prices
            .insert(price.stock_symbol.clone(), price.clone());
        Ok(())
    }

    async fn mark_stale_prices(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let mut flipped = 0;
        for price in tables.prices.values_mut() {
            if !price.is_stale && price.last_updated < cutoff {
                price.is_stale = true;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn historical_price(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<Money>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.history.get(&(symbol.to_string(), date)).copied())
    }

    async fn upsert_historical_price(&self, entry: &StockPriceHistory) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .history
            .insert((entry.stock_symbol.clone(), entry.price_date), entry.price);
        Ok(())
    }

    async fn tracked_symbols(&self) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.read().await;
        let symbols: BTreeSet<String> = tables
            .rewards
            .iter()
            .filter(|r| r.deleted_at.is_none())
            .map(|r| r.stock_symbol.clone())
            .chain(tables.prices.keys().cloned())
            .collect();
        Ok(symbols.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::ledger::reward_legs;
    use crate::domain::{FeeBreakdown, TransactionId};
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        let Some(ts) = Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).single() else {
            panic!("valid timestamp");
        };
        ts
    }

    fn qty(n: i64) -> Quantity {
        Quantity::new(Decimal::new(n, 0))
    }

    fn posting(user_id: UserId, symbol: &str, n: i64, reference: &str, ts: DateTime<Utc>) -> RewardPosting {
        let Ok(fees) = FeeBreakdown::compute(Money::new(Decimal::ONE), qty(n)) else {
            panic!("fees in range");
        };
        RewardPosting {
            reward: RewardEvent {
                id: RewardId::new(),
                user_id,
                stock_symbol: symbol.to_string(),
                quantity: qty(n),
                reward_timestamp: ts,
                event_type: "referral".to_string(),
                reference_id: reference.to_string(),
                status: RewardStatus::Active,
                created_at: ts,
                updated_at: ts,
                deleted_at: None,
            },
            legs: reward_legs(TransactionId::new(), symbol, qty(n), &fees, reference, ts),
            holding: HoldingDelta {
                user_id,
                stock_symbol: symbol.to_string(),
                quantity: qty(n),
                at: ts,
            },
            price_update: None,
        }
    }

    async fn store_with_user() -> (InMemoryStore, UserId) {
        let store = InMemoryStore::new();
        let user = UserId::new();
        store.insert_user(user).await;
        (store, user)
    }

    #[tokio::test]
    async fn soft_deleted_user_does_not_exist() {
        let (store, user) = store_with_user().await;
        assert!(matches!(store.user_exists(user).await, Ok(true)));
        assert!(store.soft_delete_user(user).await);
        assert!(matches!(store.user_exists(user).await, Ok(false)));
        assert!(matches!(store.user_exists(UserId::new()).await, Ok(false)));
    }

    #[tokio::test]
    async fn commit_merges_holdings() {
        let (store, user) = store_with_user().await;
        for (i, n) in [4, 6].into_iter().enumerate() {
            let p = posting(user, "TCS", n, &format!("r{i}"), at(1, 10));
            assert!(store.commit_reward(&p).await.is_ok());
        }
        let Ok(holdings) = store.priced_holdings(user).await else {
            panic!("holdings should load");
        };
        assert_eq!(holdings.len(), 1);
        assert!(holdings.iter().all(|h| h.holding.quantity == qty(10)));
        assert!(holdings.iter().all(|h| h.fresh_price.is_none()));
    }

    #[tokio::test]
    async fn duplicate_active_reference_is_rejected() {
        let (store, user) = store_with_user().await;
        assert!(store.commit_reward(&posting(user, "TCS", 1, "r1", at(1, 9))).await.is_ok());
        let second = store.commit_reward(&posting(user, "TCS", 1, "r1", at(1, 9))).await;
        assert!(matches!(second, Err(StoreError::DuplicateReference(ref r)) if r == "r1"));

        assert!(store.soft_delete_reward("r1", at(1, 11)).await);
        assert!(store.commit_reward(&posting(user, "TCS", 1, "r1", at(1, 12))).await.is_ok());
    }

    #[tokio::test]
    async fn failed_commit_leaves_no_rows() {
        let (store, user) = store_with_user().await;
        store.fail_holding_upsert(true);
        let result = store.commit_reward(&posting(user, "INFY", 3, "r1", at(2, 9))).await;
        assert!(matches!(result, Err(StoreError::Database(_))));

        assert!(matches!(store.find_active_reward_by_reference("r1").await, Ok(None)));
        let Ok(legs) = store.ledger_entries_by_reference("r1").await else {
            panic!("ledger should load");
        };
        assert!(legs.is_empty());
        let Ok(holdings) = store.priced_holdings(user).await else {
            panic!("holdings should load");
        };
        assert!(holdings.is_empty());
    }

    #[tokio::test]
    async fn commit_stores_refreshed_price_with_the_reward() {
        let (store, user) = store_with_user().await;
        let mut p = posting(user, "TCS", 2, "r1", at(2, 9));
        p.price_update = Some(StockPrice {
            stock_symbol: "TCS".to_string(),
            price: Money::new(Decimal::new(1000, 0)),
            last_updated: at(2, 9),
            is_stale: false,
        });
        assert!(store.commit_reward(&p).await.is_ok());
        let Ok(Some(price)) = store.current_price("TCS").await else {
            panic!("price should be stored with the reward");
        };
        assert_eq!(price.price, Money::new(Decimal::new(1000, 0)));

        store.fail_holding_upsert(true);
        let mut failed = posting(user, "INFY", 2, "r2", at(2, 10));
        failed.price_update = Some(StockPrice {
            stock_symbol: "INFY".to_string(),
            price: Money::new(Decimal::new(1500, 0)),
            last_updated: at(2, 10),
            is_stale: false,
        });
        assert!(store.commit_reward(&failed).await.is_err());
        assert!(matches!(store.current_price("INFY").await, Ok(None)));
    }

    #[tokio::test]
    async fn holding_growth_past_column_range_fails_whole_commit() {
        let (store, user) = store_with_user().await;
        let big = 99_999_999_999_999;
        assert!(store.commit_reward(&posting(user, "TCS", big, "r1", at(1, 9))).await.is_ok());
        let second = store.commit_reward(&posting(user, "TCS", big, "r2", at(1, 10))).await;
        assert!(matches!(second, Err(StoreError::OutOfRange(_))));
        assert!(matches!(store.find_active_reward_by_reference("r2").await, Ok(None)));
    }

    #[tokio::test]
    async fn reversed_rewards_are_not_listed() {
        let (store, user) = store_with_user().await;
        let mut reversed = posting(user, "TCS", 1, "r1", at(5, 9));
        reversed.reward.status = RewardStatus::Reversed;
        assert!(store.commit_reward(&reversed).await.is_ok());
        assert!(store.commit_reward(&posting(user, "TCS", 1, "r2", at(5, 10))).await.is_ok());

        let Ok(rewards) = store.rewards_between(user, at(5, 0), at(6, 0)).await else {
            panic!("rewards should load");
        };
        let refs: Vec<&str> = rewards.iter().map(|r| r.reference_id.as_str()).collect();
        assert_eq!(refs, vec!["r2"]);
    }

    #[tokio::test]
    async fn mark_stale_is_idempotent() {
        let store = InMemoryStore::new();
        let now = at(3, 12);
        for (symbol, age) in [("OLD", 2), ("NEW", 0)] {
            let price = StockPrice {
                stock_symbol: symbol.to_string(),
                price: Money::new(Decimal::new(100, 0)),
                last_updated: now - Duration::hours(age),
                is_stale: false,
            };
            assert!(store.upsert_price(&price).await.is_ok());
        }
        let cutoff = now - Duration::hours(1);
        assert!(matches!(store.mark_stale_prices(cutoff).await, Ok(1)));
        assert!(matches!(store.mark_stale_prices(cutoff).await, Ok(0)));

        let Ok(Some(old)) = store.current_price("OLD").await else {
            panic!("OLD should be stored");
        };
        let Ok(Some(new)) = store.current_price("NEW").await else {
            panic!("NEW should be stored");
        };
        assert!(old.is_stale);
        assert!(!new.is_stale);
    }

    #[tokio::test]
    async fn replay_queries_respect_day_boundaries() {
        let (store, user) = store_with_user().await;
        let rewards = [
            ("TCS", 2, "a", at(1, 23)),
            ("TCS", 3, "b", at(2, 1)),
            ("INFY", 5, "c", at(2, 8)),
            ("INFY", 7, "d", at(4, 8)),
        ];
        for (symbol, n, reference, ts) in rewards {
            assert!(store.commit_reward(&posting(user, symbol, n, reference, ts)).await.is_ok());
        }

        let today = at(4, 0).date_naive();
        let Ok(dates) = store.reward_dates_before(user, today).await else {
            panic!("dates should load");
        };
        assert_eq!(dates, vec![at(2, 0).date_naive(), at(1, 0).date_naive()]);

        let Ok(through_day_two) = store.cumulative_quantities(user, at(2, 0).date_naive()).await
        else {
            panic!("quantities should load");
        };
        assert_eq!(
            through_day_two,
            vec![("INFY".to_string(), qty(5)), ("TCS".to_string(), qty(5))]
        );
    }

    #[tokio::test]
    async fn rewards_between_is_half_open_and_newest_first() {
        let (store, user) = store_with_user().await;
        for (reference, ts) in [("a", at(5, 0)), ("b", at(5, 13)), ("c", at(6, 0))] {
            assert!(store.commit_reward(&posting(user, "TCS", 1, reference, ts)).await.is_ok());
        }
        let Ok(rewards) = store.rewards_between(user, at(5, 0), at(6, 0)).await else {
            panic!("rewards should load");
        };
        let refs: Vec<&str> = rewards.iter().map(|r| r.reference_id.as_str()).collect();
        assert_eq!(refs, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn tracked_symbols_union_rewards_and_prices() {
        let (store, user) = store_with_user().await;
        assert!(store.commit_reward(&posting(user, "TCS", 1, "r1", at(1, 9))).await.is_ok());
        let price = StockPrice {
            stock_symbol: "HDFC".to_string(),
            price: Money::new(Decimal::new(1650, 0)),
            last_updated: at(1, 9),
            is_stale: false,
        };
        assert!(store.upsert_price(&price).await.is_ok());
        let Ok(symbols) = store.tracked_symbols().await else {
            panic!("symbols should load");
        };
        assert_eq!(symbols, vec!["HDFC".to_string(), "TCS".to_string()]);
    }
}
