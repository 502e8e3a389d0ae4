//! PostgreSQL implementation of the reward store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Row};

use super::{RewardStore, StoreError};
use crate::config::DatabaseConfig;
use crate::domain::{
    ConsistencyPolicy, HoldingDelta, LedgerEntry, Money, PricedHolding, Quantity, RewardEvent,
    RewardId, RewardPosting, StockPrice, StockPriceHistory, TransactionId, UserHolding, UserId,
};

/// Partial unique index guarding `reward_events.reference_id`.
pub const ACTIVE_REFERENCE_INDEX: &str = "reward_events_active_reference_idx";

const REWARD_COLUMNS: &str = "id, user_id, stock_symbol, quantity, reward_timestamp, event_type, \
     reference_id, status, created_at, updated_at, deleted_at";

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the database is unreachable.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Migration`] if a migration fails.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn reward_from_row(row: &PgRow) -> Result<RewardEvent, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(RewardEvent {
        id: RewardId::from_uuid(row.try_get("id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        stock_symbol: row.try_get("stock_symbol")?,
        quantity: Quantity::new(row.try_get("quantity")?),
        reward_timestamp: row.try_get("reward_timestamp")?,
        event_type: row.try_get("event_type")?,
        reference_id: row.try_get("reference_id")?,
        status: status.parse().map_err(StoreError::Corrupt)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

fn ledger_entry_from_row(row: &PgRow) -> Result<LedgerEntry, StoreError> {
    let account_type: String = row.try_get("account_type")?;
    Ok(LedgerEntry {
        id: row.try_get("id")?,
        transaction_id: TransactionId::from_uuid(row.try_get("transaction_id")?),
        account_type: account_type.parse().map_err(StoreError::Corrupt)?,
        account_symbol: row.try_get("account_symbol")?,
        debit_amount: Money::new(row.try_get("debit_amount")?),
        credit_amount: Money::new(row.try_get("credit_amount")?),
        stock_quantity: Quantity::new(row.try_get("stock_quantity")?),
        description: row.try_get("description")?,
        reference_id: row.try_get("reference_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn priced_holding_from_row(row: &PgRow) -> Result<PricedHolding, StoreError> {
    let price: Option<Decimal> = row.try_get("price")?;
    Ok(PricedHolding {
        holding: UserHolding {
            user_id: UserId::from_uuid(row.try_get("user_id")?),
            stock_symbol: row.try_get("stock_symbol")?,
            quantity: Quantity::new(row.try_get("quantity")?),
            last_updated: row.try_get("last_updated")?,
        },
        fresh_price: price.map(Money::new),
    })
}

fn stock_price_from_row(row: &PgRow) -> Result<StockPrice, StoreError> {
    Ok(StockPrice {
        stock_symbol: row.try_get("stock_symbol")?,
        price: Money::new(row.try_get("price")?),
        last_updated: row.try_get("last_updated")?,
        is_stale: row.try_get("is_stale")?,
    })
}

/// Maps a violation of [`ACTIVE_REFERENCE_INDEX`] to a duplicate reference.
fn classify_reward_insert(err: sqlx::Error, reference_id: &str) -> StoreError {
    let duplicate = matches!(
        &err,
        sqlx::Error::Database(db_err)
            if db_err.is_unique_violation() && db_err.constraint() == Some(ACTIVE_REFERENCE_INDEX)
    );
    if duplicate {
        StoreError::DuplicateReference(reference_id.to_string())
    } else {
        StoreError::Database(err)
    }
}

async fn insert_reward(conn: &mut PgConnection, reward: &RewardEvent) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO reward_events (id, user_id, stock_symbol, quantity, reward_timestamp, \
         event_type, reference_id, status, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(*reward.id.as_uuid())
    .bind(*reward.user_id.as_uuid())
    .bind(&reward.stock_symbol)
    .bind(reward.quantity.value())
    .bind(reward.reward_timestamp)
    .bind(&reward.event_type)
    .bind(&reward.reference_id)
    .bind(reward.status.as_str())
    .bind(reward.created_at)
    .bind(reward.updated_at)
    .execute(conn)
    .await
    .map_err(|e| classify_reward_insert(e, &reward.reference_id))?;
    Ok(())
}

async fn insert_leg(conn: &mut PgConnection, leg: &LedgerEntry) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO ledger_entries (id, transaction_id, account_type, account_symbol, \
         debit_amount, credit_amount, stock_quantity, description, reference_id, created_at, \
         updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(leg.id)
    .bind(*leg.transaction_id.as_uuid())
    .bind(leg.account_type.as_str())
    .bind(&leg.account_symbol)
    .bind(leg.debit_amount.amount())
    .bind(leg.credit_amount.amount())
    .bind(leg.stock_quantity.value())
    .bind(&leg.description)
    .bind(&leg.reference_id)
    .bind(leg.created_at)
    .bind(leg.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// SQLSTATE raised when a value does not fit its NUMERIC column.
const NUMERIC_OVERFLOW: &str = "22003";

fn classify_holding_upsert(err: sqlx::Error, delta: &HoldingDelta) -> StoreError {
    let overflow = matches!(
        &err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(NUMERIC_OVERFLOW)
    );
    if overflow {
        StoreError::OutOfRange(format!(
            "holding of {} plus {}",
            delta.stock_symbol, delta.quantity
        ))
    } else {
        StoreError::Database(err)
    }
}

async fn upsert_holding(conn: &mut PgConnection, delta: &HoldingDelta) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO user_holdings (user_id, stock_symbol, quantity, last_updated) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (user_id, stock_symbol) DO UPDATE \
         SET quantity = user_holdings.quantity + EXCLUDED.quantity, \
             last_updated = EXCLUDED.last_updated",
    )
    .bind(*delta.user_id.as_uuid())
    .bind(&delta.stock_symbol)
    .bind(delta.quantity.value())
    .bind(delta.at)
    .execute(conn)
    .await
    .map_err(|e| classify_holding_upsert(e, delta))?;
    Ok(())
}

async fn write_price(conn: &mut PgConnection, price: &StockPrice) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO stock_prices (stock_symbol, price, last_updated, is_stale) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (stock_symbol) DO UPDATE \
         SET price = EXCLUDED.price, last_updated = EXCLUDED.last_updated, \
             is_stale = EXCLUDED.is_stale",
    )
    .bind(&price.stock_symbol)
    .bind(price.price.amount())
    .bind(price.last_updated)
    .bind(price.is_stale)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl RewardStore for PostgresStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    async fn user_exists(&self, user_id: UserId) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(*user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn find_active_reward_by_reference(
        &self,
        reference_id: &str,
    ) -> Result<Option<RewardEvent>, StoreError> {
        let sql = format!(
            "SELECT {REWARD_COLUMNS} FROM reward_events \
             WHERE reference_id = $1 AND deleted_at IS NULL"
        );
        let row = sqlx::query(&sql)
            .bind(reference_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(reward_from_row).transpose()
    }

    async fn commit_reward(&self, posting: &RewardPosting) -> Result<(), StoreError> {
        let policy = ConsistencyPolicy::WriteAtomic;
        let mut tx = self.pool.begin().await?;

        policy.admit(
            "insert reward_events",
            insert_reward(&mut *tx, &posting.reward).await,
        )?;
        for leg in &posting.legs {
            policy.admit("insert ledger_entries", insert_leg(&mut *tx, leg).await)?;
        }
        policy.admit(
            "upsert user_holdings",
            upsert_holding(&mut *tx, &posting.holding).await,
        )?;
        if let Some(price) = &posting.price_update {
            policy.admit("upsert stock_prices", write_price(&mut *tx, price).await)?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_reward(&self, id: RewardId) -> Result<Option<RewardEvent>, StoreError> {
        let sql = format!("SELECT {REWARD_COLUMNS} FROM reward_events WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(reward_from_row).transpose()
    }

    async fn ledger_entries_by_reference(
        &self,
        reference_id: &str,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, transaction_id, account_type, account_symbol, debit_amount, \
             credit_amount, stock_quantity, description, reference_id, created_at, updated_at \
             FROM ledger_entries WHERE reference_id = $1 ORDER BY created_at, id",
        )
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;
        ConsistencyPolicy::ReadBestEffort
            .collect("ledger_entries row", rows.iter().map(ledger_entry_from_row))
    }

    async fn rewards_between(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RewardEvent>, StoreError> {
        let sql = format!(
            "SELECT {REWARD_COLUMNS} FROM reward_events \
             WHERE user_id = $1 AND reward_timestamp >= $2 AND reward_timestamp < $3 \
             AND status = 'active' AND deleted_at IS NULL ORDER BY reward_timestamp DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(*user_id.as_uuid())
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;
        ConsistencyPolicy::ReadBestEffort
            .collect("reward_events row", rows.iter().map(reward_from_row))
    }

    async fn priced_holdings(&self, user_id: UserId) -> Result<Vec<PricedHolding>, StoreError> {
        let rows = sqlx::query(
            "SELECT h.user_id, h.stock_symbol, h.quantity, h.last_updated, p.price \
             FROM user_holdings h \
             LEFT JOIN stock_prices p \
               ON p.stock_symbol = h.stock_symbol AND p.is_stale = FALSE \
             WHERE h.user_id = $1 AND h.quantity > 0 \
             ORDER BY h.stock_symbol",
        )
        .bind(*user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        ConsistencyPolicy::ReadBestEffort
            .collect("user_holdings row", rows.iter().map(priced_holding_from_row))
    }

    async fn reward_dates_before(
        &self,
        user_id: UserId,
        before: NaiveDate,
    ) -> Result<Vec<NaiveDate>, StoreError> {
        let rows = sqlx::query(
            "SELECT DISTINCT (reward_timestamp AT TIME ZONE 'UTC')::date AS reward_date \
             FROM reward_events \
             WHERE user_id = $1 AND status = 'active' AND deleted_at IS NULL \
               AND (reward_timestamp AT TIME ZONE 'UTC')::date < $2 \
             ORDER BY reward_date DESC",
        )
        .bind(*user_id.as_uuid())
        .bind(before)
        .fetch_all(&self.pool)
        .await?;
        ConsistencyPolicy::ReadBestEffort.collect(
            "reward date row",
            rows.iter()
                .map(|row| row.try_get::<NaiveDate, _>("reward_date").map_err(StoreError::from)),
        )
    }

    async fn cumulative_quantities(
        &self,
        user_id: UserId,
        through: NaiveDate,
    ) -> Result<Vec<(String, Quantity)>, StoreError> {
        let rows = sqlx::query(
            "SELECT stock_symbol, SUM(quantity) AS total_quantity \
             FROM reward_events \
             WHERE user_id = $1 AND status = 'active' AND deleted_at IS NULL \
               AND (reward_timestamp AT TIME ZONE 'UTC')::date <= $2 \
             GROUP BY stock_symbol ORDER BY stock_symbol",
        )
        .bind(*user_id.as_uuid())
        .bind(through)
        .fetch_all(&self.pool)
        .await?;
        ConsistencyPolicy::ReadBestEffort.collect(
            "cumulative quantity row",
            rows.iter().map(|row| -> Result<(String, Quantity), StoreError> {
                let symbol: String = row.try_get("stock_symbol")?;
                let total: Decimal = row.try_get("total_quantity")?;
                Ok((symbol, Quantity::new(total)))
            }),
        )
    }

    async fn current_price(&self, symbol: &str) -> Result<Option<StockPrice>, StoreError> {
        let row = sqlx::query(
            "SELECT stock_symbol, price, last_updated, is_stale \
             FROM stock_prices WHERE stock_symbol = $1",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(stock_price_from_row).transpose()
    }

    async fn upsert_price(&self, price: &StockPrice) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        write_price(&mut *conn, price).await
    }

    async fn mark_stale_prices(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE stock_prices SET is_stale = TRUE \
             WHERE is_stale = FALSE AND last_updated < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn historical_price(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<Money>, StoreError> {
        let price = sqlx::query_scalar::<_, Decimal>(
            "SELECT price FROM stock_price_history WHERE stock_symbol = $1 AND price_date = $2",
        )
        .bind(symbol)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(price.map(Money::new))
    }

    async fn upsert_historical_price(&self, entry: &StockPriceHistory) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO stock_price_history (stock_symbol, price_date, price) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (stock_symbol, price_date) DO UPDATE SET price = EXCLUDED.price",
        )
        .bind(&entry.stock_symbol)
        .bind(entry.price_date)
        .bind(entry.price.amount())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn tracked_symbols(&self) -> Result<Vec<String>, StoreError> {
        let symbols = sqlx::query_scalar::<_, String>(
            "SELECT stock_symbol FROM reward_events WHERE deleted_at IS NULL \
             UNION \
             SELECT stock_symbol FROM stock_prices \
             ORDER BY stock_symbol",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_constraint_errors_stay_transient() {
        let err = classify_reward_insert(sqlx::Error::RowNotFound, "r1");
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn reward_columns_match_decoder() {
        for column in ["id", "user_id", "quantity", "reference_id", "status", "deleted_at"] {
            assert!(REWARD_COLUMNS.contains(column), "missing column {column}");
        }
    }
}
