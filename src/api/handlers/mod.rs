//! REST endpoint handlers organized by resource.

pub mod portfolio;
pub mod prices;
pub mod reward;
pub mod system;

use axum::Router;

use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::RewardsError;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(reward::routes())
        .merge(portfolio::routes())
        .merge(prices::routes())
}

/// Parses a user id taken from a path segment.
pub(crate) fn parse_user_id(raw: &str) -> Result<UserId, RewardsError> {
    raw.parse()
        .map_err(|_| RewardsError::InvalidUserId(raw.to_string()))
}
