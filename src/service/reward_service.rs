//! Reward service: turns a reward request into a committed, balanced
//! ledger transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::calendar::day_window;
use crate::domain::ledger::{is_balanced, reward_legs};
use crate::domain::{
    FeeBreakdown, HoldingDelta, LedgerEntry, RewardEvent, RewardId, RewardPosting, RewardRequest,
    RewardStatus, TransactionId, UserId,
};
use crate::error::RewardsError;
use crate::persistence::RewardStore;
use crate::service::price_cache::PriceCache;

/// Ledger writer for stock rewards.
///
/// Every call to [`RewardService::create_reward`] either commits one reward
/// row, four ledger legs and one holding delta, or nothing at all.
#[derive(Debug, Clone)]
pub struct RewardService {
    store: Arc<dyn RewardStore>,
    prices: Arc<PriceCache>,
}

impl RewardService {
    /// Creates a new `RewardService`.
    #[must_use]
    pub fn new(store: Arc<dyn RewardStore>, prices: Arc<PriceCache>) -> Self {
        Self { store, prices }
    }

    /// Records a reward at the current time.
    ///
    /// # Errors
    ///
    /// See [`RewardService::create_reward_at`].
    pub async fn create_reward(&self, request: RewardRequest) -> Result<RewardEvent, RewardsError> {
        self.create_reward_at(request, Utc::now()).await
    }

    /// Records a reward, stamping rows and any new price with `now`.
    ///
    /// Validation, the user check and the duplicate check run before any
    /// write. A freshly quoted execution price is stored as the new current
    /// price in the same commit as the reward, so a failed commit leaves no
    /// price row behind.
    ///
    /// # Errors
    ///
    /// - [`RewardsError::InvalidUserId`] / [`RewardsError::InvalidRequest`]
    ///   for malformed input.
    /// - [`RewardsError::UserNotFound`] if the user is missing or deleted.
    /// - [`RewardsError::DuplicateReward`] if the reference id is taken.
    /// - [`RewardsError::Store`] / [`RewardsError::Oracle`] on I/O failure;
    ///   nothing from the ledger transaction is visible afterwards.
    pub async fn create_reward_at(
        &self,
        request: RewardRequest,
        now: DateTime<Utc>,
    ) -> Result<RewardEvent, RewardsError> {
        let reward = request.validate()?;

        if !self.store.user_exists(reward.user_id).await? {
            return Err(RewardsError::UserNotFound(*reward.user_id.as_uuid()));
        }

        if self
            .store
            .find_active_reward_by_reference(&reward.reference_id)
            .await?
            .is_some()
        {
            tracing::warn!(reference_id = %reward.reference_id, "duplicate reward rejected");
            return Err(RewardsError::DuplicateReward(reward.reference_id));
        }

        let execution = self
            .prices
            .resolve_execution_price(&reward.stock_symbol, now)
            .await?;
        let fees = FeeBreakdown::compute(execution.price, reward.quantity)?;

        let legs = reward_legs(
            TransactionId::new(),
            &reward.stock_symbol,
            reward.quantity,
            &fees,
            &reward.reference_id,
            now,
        );
        if !is_balanced(&legs) {
            return Err(RewardsError::Internal(format!(
                "unbalanced ledger legs for reference_id {}",
                reward.reference_id
            )));
        }

        let event = RewardEvent {
            id: RewardId::new(),
            user_id: reward.user_id,
            stock_symbol: reward.stock_symbol.clone(),
            quantity: reward.quantity,
            reward_timestamp: reward.reward_timestamp,
            event_type: reward.event_type,
            reference_id: reward.reference_id,
            status: RewardStatus::Active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let posting = RewardPosting {
            holding: HoldingDelta {
                user_id: reward.user_id,
                stock_symbol: reward.stock_symbol,
                quantity: reward.quantity,
                at: now,
            },
            legs,
            reward: event,
            price_update: execution.refreshed,
        };

        if let Err(e) = self.store.commit_reward(&posting).await {
            let err = RewardsError::from(e);
            if matches!(err, RewardsError::DuplicateReward(_)) {
                tracing::warn!(
                    reference_id = %posting.reward.reference_id,
                    "duplicate reward rejected by store"
                );
            }
            return Err(err);
        }

        let reward_id = posting.reward.id;
        let stored = self
            .store
            .get_reward(reward_id)
            .await?
            .ok_or_else(|| RewardsError::Internal(format!("reward {reward_id} missing after commit")))?;

        tracing::info!(
            reward_id = %stored.id,
            user_id = %stored.user_id,
            symbol = %stored.stock_symbol,
            quantity = %stored.quantity,
            price = %fees.price,
            total_fees = %fees.total_fees,
            total_cost = %fees.total_cost,
            "reward created"
        );
        Ok(stored)
    }

    /// Active rewards granted to `user_id` during the current UTC day.
    ///
    /// # Errors
    ///
    /// Returns [`RewardsError::Store`] on database failure.
    pub async fn get_today_stocks(&self, user_id: UserId) -> Result<Vec<RewardEvent>, RewardsError> {
        self.get_today_stocks_at(user_id, Utc::now()).await
    }

    /// Active, non-deleted rewards granted to `user_id` during the UTC day
    /// containing `now`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`RewardsError::Store`] on database failure.
    pub async fn get_today_stocks_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<RewardEvent>, RewardsError> {
        let (start, end) = day_window(now);
        Ok(self.store.rewards_between(user_id, start, end).await?)
    }

    /// Ledger legs booked for `reference_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RewardsError::Store`] on database failure.
    pub async fn ledger_entries(&self, reference_id: &str) -> Result<Vec<LedgerEntry>, RewardsError> {
        Ok(self.store.ledger_entries_by_reference(reference_id).await?)
    }
}
