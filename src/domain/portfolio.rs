//! Holdings and the portfolio read models derived from them.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::UserId;
use super::money::{Money, Quantity};
use crate::error::RewardsError;

/// Cumulative quantity of one stock owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserHolding {
    /// Holder.
    pub user_id: UserId,
    /// Stock symbol.
    pub stock_symbol: String,
    /// Running total of rewarded shares.
    pub quantity: Quantity,
    /// Last time a reward touched this holding.
    pub last_updated: DateTime<Utc>,
}

/// A holding joined with its current price, if a fresh one is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedHolding {
    /// The holding row.
    pub holding: UserHolding,
    /// Non-stale stored price; `None` when absent or stale.
    pub fresh_price: Option<Money>,
}

/// One line of a user's portfolio. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioItem {
    /// Stock symbol.
    pub stock_symbol: String,
    /// Shares held.
    pub quantity: Quantity,
    /// Price used for valuation; zero if no price could be resolved.
    pub price: Money,
    /// `quantity × price`.
    pub current_value: Money,
    /// Last time a reward touched the holding.
    pub last_updated: DateTime<Utc>,
}

impl PortfolioItem {
    /// Values `holding` at `price`.
    ///
    /// # Errors
    ///
    /// Returns [`RewardsError::Internal`] when the value does not fit the
    /// money range.
    pub fn priced(holding: UserHolding, price: Money) -> Result<Self, RewardsError> {
        let current_value = price.checked_mul(holding.quantity).ok_or_else(|| {
            RewardsError::Internal(format!(
                "value of {} {} at {price} is out of range",
                holding.quantity, holding.stock_symbol
            ))
        })?;
        Ok(Self {
            current_value,
            stock_symbol: holding.stock_symbol,
            quantity: holding.quantity,
            price,
            last_updated: holding.last_updated,
        })
    }

    /// Sum of `current_value` over `items`.
    ///
    /// # Errors
    ///
    /// Returns [`RewardsError::Internal`] when the total does not fit the
    /// money range.
    pub fn total(items: &[PortfolioItem]) -> Result<Money, RewardsError> {
        Money::checked_sum(items.iter().map(|item| item.current_value))
            .ok_or_else(|| RewardsError::Internal("portfolio total is out of range".to_string()))
    }
}

/// Portfolio value as of the end of a past UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalValue {
    /// The valued day.
    pub date: NaiveDate,
    /// Value of all holdings accumulated up to and including that day.
    pub value: Money,
}

/// Dashboard statistics for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioStats {
    /// Shares rewarded today, per symbol.
    pub today_stocks: BTreeMap<String, Quantity>,
    /// Current value of all holdings.
    pub current_portfolio_value_inr: Money,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn holding(symbol: &str, quantity: Decimal) -> UserHolding {
        UserHolding {
            user_id: UserId::new(),
            stock_symbol: symbol.to_string(),
            quantity: Quantity::new(quantity),
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn priced_item_multiplies_quantity_by_price() {
        let Ok(item) = PortfolioItem::priced(
            holding("INFY", Decimal::new(3, 0)),
            Money::new(Decimal::new(150_050, 2)),
        ) else {
            panic!("value in range");
        };
        assert_eq!(item.current_value, Money::new(Decimal::new(450_150, 2)));
        assert_eq!(item.stock_symbol, "INFY");
    }

    #[test]
    fn out_of_range_value_is_an_error() {
        let result = PortfolioItem::priced(
            holding("TCS", Decimal::from(10_u64.pow(13))),
            Money::new(Decimal::from(3500)),
        );
        assert!(matches!(result, Err(RewardsError::Internal(_))));
    }

    #[test]
    fn total_sums_item_values() {
        let items: Vec<PortfolioItem> = [("TCS", 2, 3500), ("INFY", 3, 1500)]
            .into_iter()
            .filter_map(|(symbol, n, price)| {
                PortfolioItem::priced(holding(symbol, Decimal::from(n)), Money::new(Decimal::from(price)))
                    .ok()
            })
            .collect();
        assert_eq!(items.len(), 2);
        assert!(matches!(
            PortfolioItem::total(&items),
            Ok(total) if total == Money::new(Decimal::from(11_500))
        ));
        assert!(matches!(PortfolioItem::total(&[]), Ok(total) if total.is_zero()));
    }
}
