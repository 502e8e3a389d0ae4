//! Portfolio read handlers: holdings, stats, historical value.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{
    HistoricalInrResponse, HistoricalValueDto, PortfolioItemDto, PortfolioResponse, StatsResponse,
};
use crate::api::handlers::parse_user_id;
use crate::app_state::AppState;
use crate::domain::PortfolioItem;
use crate::error::{ErrorResponse, RewardsError};

/// `GET /portfolio/{user_id}`: Holdings valued at current prices.
///
/// # Errors
///
/// Returns [`RewardsError`] on a malformed user id or store failure.
#[utoipa::path(
    get,
    path = "/api/v1/portfolio/{user_id}",
    tag = "Portfolio",
    summary = "Current portfolio",
    description = "Lists every holding with a positive quantity, valued at its current price, largest value first.",
    params(("user_id" = String, Path, description = "User UUID")),
    responses(
        (status = 200, description = "Portfolio", body = PortfolioResponse),
        (status = 400, description = "Invalid user id", body = ErrorResponse),
    )
)]
pub async fn get_portfolio(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, RewardsError> {
    let user_id = parse_user_id(&user_id)?;
    let holdings = state.portfolio_service.get_portfolio(user_id).await?;
    let total_value = PortfolioItem::total(&holdings)?;

    Ok(Json(PortfolioResponse {
        user_id: user_id.into(),
        holdings: holdings.into_iter().map(PortfolioItemDto::from).collect(),
        total_value: total_value.to_string(),
    }))
}

/// `GET /stats/{user_id}`: Today's rewarded shares and current value.
///
/// # Errors
///
/// Returns [`RewardsError`] on a malformed user id or store failure.
#[utoipa::path(
    get,
    path = "/api/v1/stats/{user_id}",
    tag = "Portfolio",
    summary = "Portfolio statistics",
    description = "Shares rewarded today per symbol, plus the current INR value of the whole portfolio.",
    params(("user_id" = String, Path, description = "User UUID")),
    responses(
        (status = 200, description = "Statistics", body = StatsResponse),
        (status = 400, description = "Invalid user id", body = ErrorResponse),
    )
)]
pub async fn get_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, RewardsError> {
    let user_id = parse_user_id(&user_id)?;
    let stats = state.portfolio_service.get_stats(user_id).await?;

    Ok(Json(StatsResponse {
        user_id: user_id.into(),
        stats: stats.into(),
    }))
}

/// `GET /historical-inr/{user_id}`: End-of-day portfolio values.
///
/// # Errors
///
/// Returns [`RewardsError`] on a malformed user id or store failure.
#[utoipa::path(
    get,
    path = "/api/v1/historical-inr/{user_id}",
    tag = "Portfolio",
    summary = "Historical portfolio value",
    description = "One value per past UTC day on which the user received a reward, priced at that day's historical prices. Days that cannot be priced are omitted.",
    params(("user_id" = String, Path, description = "User UUID")),
    responses(
        (status = 200, description = "Historical values, latest first", body = HistoricalInrResponse),
        (status = 400, description = "Invalid user id", body = ErrorResponse),
    )
)]
pub async fn get_historical_inr(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, RewardsError> {
    let user_id = parse_user_id(&user_id)?;
    let series = state.portfolio_service.get_historical_inr(user_id).await?;

    Ok(Json(HistoricalInrResponse {
        user_id: user_id.into(),
        historical_values: series.into_iter().map(HistoricalValueDto::from).collect(),
    }))
}

/// Portfolio routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/portfolio/{user_id}", get(get_portfolio))
        .route("/stats/{user_id}", get(get_stats))
        .route("/historical-inr/{user_id}", get(get_historical_inr))
}
