//! Reward handlers: create a reward, list today's rewards.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{CreateRewardRequest, CreateRewardResponse, RewardDto, TodayStocksResponse};
use crate::api::handlers::parse_user_id;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, RewardsError};

/// `POST /reward`: Record a stock reward.
///
/// # Errors
///
/// Returns [`RewardsError`] on invalid input, unknown user, duplicate
/// reference id, or a failed commit.
#[utoipa::path(
    post,
    path = "/api/v1/reward",
    tag = "Rewards",
    summary = "Record a stock reward",
    description = "Prices the reward, posts four balanced ledger legs and credits the user's holding in one atomic unit. `reference_id` is an idempotency key: a second active reward with the same key is rejected.",
    request_body = CreateRewardRequest,
    responses(
        (status = 201, description = "Reward created", body = CreateRewardResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Duplicate reference id", body = ErrorResponse),
        (status = 502, description = "Price oracle unavailable", body = ErrorResponse),
    )
)]
pub async fn create_reward(
    State(state): State<AppState>,
    Json(req): Json<CreateRewardRequest>,
) -> Result<impl IntoResponse, RewardsError> {
    let reward = state.reward_service.create_reward(req.into()).await?;

    let response = CreateRewardResponse {
        message: "Reward created successfully".to_string(),
        reward: reward.into(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// `GET /today-stocks/{user_id}`: Rewards granted today (UTC).
///
/// # Errors
///
/// Returns [`RewardsError`] on a malformed user id or store failure.
#[utoipa::path(
    get,
    path = "/api/v1/today-stocks/{user_id}",
    tag = "Rewards",
    summary = "Today's rewards",
    description = "Returns the user's active rewards whose timestamp falls in the current UTC day, newest first.",
    params(("user_id" = String, Path, description = "User UUID")),
    responses(
        (status = 200, description = "Today's rewards", body = TodayStocksResponse),
        (status = 400, description = "Invalid user id", body = ErrorResponse),
    )
)]
pub async fn get_today_stocks(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, RewardsError> {
    let user_id = parse_user_id(&user_id)?;
    let rewards = state.reward_service.get_today_stocks(user_id).await?;

    Ok(Json(TodayStocksResponse {
        user_id: user_id.into(),
        rewards: rewards.into_iter().map(RewardDto::from).collect(),
    }))
}

/// Reward routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reward", post(create_reward))
        .route("/today-stocks/{user_id}", get(get_today_stocks))
}
