//! Reward events: requests, validation and the persisted record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{RewardId, UserId};
use super::ledger::LedgerEntry;
use super::money::{QUANTITY_LIMIT, Quantity};
use super::price::StockPrice;
use crate::error::RewardsError;

/// Lifecycle status of a reward event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardStatus {
    /// Counts towards holdings and valuation.
    Active,
    /// Reversed by an operator; excluded from historical valuation.
    Reversed,
}

impl RewardStatus {
    /// Column value stored in `reward_events.status`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Reversed => "reversed",
        }
    }
}

impl fmt::Display for RewardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewardStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "reversed" => Ok(Self::Reversed),
            other => Err(format!("unknown reward status: {other}")),
        }
    }
}

/// A user's claim to a quantity of a stock at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEvent {
    /// Row identifier.
    pub id: RewardId,
    /// Rewarded user.
    pub user_id: UserId,
    /// Stock symbol (e.g. `"TCS"`).
    pub stock_symbol: String,
    /// Shares granted; always positive.
    pub quantity: Quantity,
    /// When the reward was earned.
    pub reward_timestamp: DateTime<Utc>,
    /// Caller-defined event category (e.g. `"referral"`).
    pub event_type: String,
    /// External idempotency key, unique among non-deleted events.
    pub reference_id: String,
    /// Lifecycle status.
    pub status: RewardStatus,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Row update time.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Unvalidated reward request as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardRequest {
    /// User id in textual UUID form.
    pub user_id: String,
    /// Stock symbol.
    pub stock_symbol: String,
    /// Shares to grant.
    pub quantity: Decimal,
    /// When the reward was earned.
    pub reward_timestamp: DateTime<Utc>,
    /// Event category.
    pub event_type: String,
    /// Idempotency key.
    pub reference_id: String,
}

/// A reward request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedReward {
    /// Rewarded user.
    pub user_id: UserId,
    /// Trimmed stock symbol.
    pub stock_symbol: String,
    /// Positive quantity at quantity scale.
    pub quantity: Quantity,
    /// When the reward was earned.
    pub reward_timestamp: DateTime<Utc>,
    /// Trimmed event category.
    pub event_type: String,
    /// Trimmed idempotency key.
    pub reference_id: String,
}

impl RewardRequest {
    /// Checks identifiers, required text fields and the quantity.
    ///
    /// # Errors
    ///
    /// Returns [`RewardsError::InvalidUserId`] for a malformed user id and
    /// [`RewardsError::InvalidRequest`] for an empty field or a quantity that
    /// is not positive at six decimal places.
    pub fn validate(self) -> Result<ValidatedReward, RewardsError> {
        let user_id: UserId = self
            .user_id
            .parse()
            .map_err(|_| RewardsError::InvalidUserId(self.user_id.clone()))?;

        let stock_symbol = required("stock_symbol", &self.stock_symbol)?;
        let event_type = required("event_type", &self.event_type)?;
        let reference_id = required("reference_id", &self.reference_id)?;

        let quantity = Quantity::new(self.quantity);
        if !quantity.is_positive() {
            return Err(RewardsError::InvalidRequest(format!(
                "quantity must be greater than zero, got {}",
                self.quantity
            )));
        }
        if !quantity.in_range() {
            return Err(RewardsError::InvalidRequest(format!(
                "quantity must be below {QUANTITY_LIMIT}, got {}",
                self.quantity
            )));
        }

        Ok(ValidatedReward {
            user_id,
            stock_symbol,
            quantity,
            reward_timestamp: self.reward_timestamp,
            event_type,
            reference_id,
        })
    }
}

fn required(field: &str, value: &str) -> Result<String, RewardsError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RewardsError::InvalidRequest(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Quantity to add to a `(user, symbol)` holding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldingDelta {
    /// Holder.
    pub user_id: UserId,
    /// Stock symbol.
    pub stock_symbol: String,
    /// Shares to add.
    pub quantity: Quantity,
    /// Timestamp written to `last_updated`.
    pub at: DateTime<Utc>,
}

/// Everything one reward writes, committed as a single unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardPosting {
    /// Reward event row.
    pub reward: RewardEvent,
    /// Balanced ledger legs.
    pub legs: Vec<LedgerEntry>,
    /// Holdings upsert.
    pub holding: HoldingDelta,
    /// Fresh oracle quote to store as the current price, when the
    /// execution price did not come from a fresh stored row.
    pub price_update: Option<StockPrice>,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn request() -> RewardRequest {
        RewardRequest {
            user_id: uuid::Uuid::new_v4().to_string(),
            stock_symbol: " TCS ".to_string(),
            quantity: Decimal::new(10, 0),
            reward_timestamp: Utc::now(),
            event_type: "referral".to_string(),
            reference_id: "r1".to_string(),
        }
    }

    #[test]
    fn valid_request_is_trimmed() {
        let Ok(valid) = request().validate() else {
            panic!("request should validate");
        };
        assert_eq!(valid.stock_symbol, "TCS");
        assert_eq!(valid.quantity, Quantity::new(Decimal::new(10, 0)));
    }

    #[test]
    fn malformed_user_id_is_rejected() {
        let mut req = request();
        req.user_id = "12345".to_string();
        assert!(matches!(req.validate(), Err(RewardsError::InvalidUserId(_))));
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        for qty in [Decimal::ZERO, Decimal::new(-5, 0), Decimal::new(4, 7)] {
            let mut req = request();
            req.quantity = qty;
            assert!(
                matches!(req.validate(), Err(RewardsError::InvalidRequest(_))),
                "quantity {qty} should be rejected"
            );
        }
    }

    #[test]
    fn quantity_beyond_column_range_is_rejected() {
        for qty in [
            Decimal::from_i128_with_scale(10_i128.pow(26), 0),
            Decimal::from(10_u64.pow(14)),
        ] {
            let mut req = request();
            req.quantity = qty;
            assert!(
                matches!(req.validate(), Err(RewardsError::InvalidRequest(_))),
                "quantity {qty} should be rejected"
            );
        }

        let mut req = request();
        req.quantity = Decimal::from(10_u64.pow(14) - 1);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn blank_reference_id_is_rejected() {
        let mut req = request();
        req.reference_id = "   ".to_string();
        assert!(matches!(req.validate(), Err(RewardsError::InvalidRequest(_))));
    }

    #[test]
    fn status_round_trips_through_text() {
        assert_eq!("active".parse::<RewardStatus>(), Ok(RewardStatus::Active));
        assert_eq!(RewardStatus::Reversed.as_str(), "reversed");
        assert!("pending".parse::<RewardStatus>().is_err());
    }
}
