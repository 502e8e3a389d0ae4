//! Reward DTOs for creation and the today-stocks listing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{RewardEvent, RewardRequest};

/// Request body for `POST /reward`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRewardRequest {
    /// Recipient user UUID.
    pub user_id: String,
    /// Stock symbol (e.g. `TCS`).
    pub stock_symbol: String,
    /// Number of shares, as a JSON number or decimal string.
    #[schema(value_type = String, example = "10")]
    pub quantity: Decimal,
    /// When the reward was granted (ISO-8601).
    pub reward_timestamp: DateTime<Utc>,
    /// Reason for the reward (e.g. `referral`).
    pub event_type: String,
    /// Caller-supplied idempotency key.
    pub reference_id: String,
}

impl From<CreateRewardRequest> for RewardRequest {
    fn from(req: CreateRewardRequest) -> Self {
        Self {
            user_id: req.user_id,
            stock_symbol: req.stock_symbol,
            quantity: req.quantity,
            reward_timestamp: req.reward_timestamp,
            event_type: req.event_type,
            reference_id: req.reference_id,
        }
    }
}

/// A persisted reward event.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RewardDto {
    /// Reward identifier.
    pub id: uuid::Uuid,
    /// Recipient user.
    pub user_id: uuid::Uuid,
    /// Stock symbol.
    pub stock_symbol: String,
    /// Shares granted (string-encoded decimal).
    pub quantity: String,
    /// Grant time.
    pub reward_timestamp: DateTime<Utc>,
    /// Reason for the reward.
    pub event_type: String,
    /// Idempotency key.
    pub reference_id: String,
    /// `active` or `reversed`.
    pub status: String,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Row update time.
    pub updated_at: DateTime<Utc>,
}

impl From<RewardEvent> for RewardDto {
    fn from(event: RewardEvent) -> Self {
        Self {
            id: event.id.into(),
            user_id: event.user_id.into(),
            stock_symbol: event.stock_symbol,
            quantity: event.quantity.to_string(),
            reward_timestamp: event.reward_timestamp,
            event_type: event.event_type,
            reference_id: event.reference_id,
            status: event.status.to_string(),
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

/// Response body for `POST /reward` (201 Created).
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateRewardResponse {
    /// Confirmation message.
    pub message: String,
    /// The stored reward.
    pub reward: RewardDto,
}

/// Response body for `GET /today-stocks/{user_id}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TodayStocksResponse {
    /// User the rewards belong to.
    pub user_id: uuid::Uuid,
    /// Today's rewards, newest first.
    pub rewards: Vec<RewardDto>,
}
