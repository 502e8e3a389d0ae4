//! Price administration: pin a day's historical price.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::put;
use axum::{Json, Router};
use chrono::NaiveDate;

use crate::api::dto::{HistoricalPriceResponse, SaveHistoricalPriceRequest};
use crate::app_state::AppState;
use crate::domain::Money;
use crate::domain::money::MONEY_LIMIT;
use crate::error::{ErrorResponse, RewardsError};

/// `PUT /prices/{symbol}/history/{date}`: Save a historical price.
///
/// # Errors
///
/// Returns [`RewardsError`] on a malformed date, a price that is not
/// positive or does not fit the price column, or store failure.
#[utoipa::path(
    put,
    path = "/api/v1/prices/{symbol}/history/{date}",
    tag = "Prices",
    summary = "Save a historical price",
    description = "Upserts the price of `symbol` for the UTC day `date` (YYYY-MM-DD). Historical valuation uses these rows.",
    params(
        ("symbol" = String, Path, description = "Stock symbol"),
        ("date" = String, Path, description = "UTC day, YYYY-MM-DD"),
    ),
    request_body = SaveHistoricalPriceRequest,
    responses(
        (status = 200, description = "Price stored", body = HistoricalPriceResponse),
        (status = 400, description = "Invalid date or price", body = ErrorResponse),
    )
)]
pub async fn save_historical_price(
    State(state): State<AppState>,
    Path((symbol, date)): Path<(String, String)>,
    Json(req): Json<SaveHistoricalPriceRequest>,
) -> Result<impl IntoResponse, RewardsError> {
    let symbol = symbol.trim().to_string();
    if symbol.is_empty() {
        return Err(RewardsError::InvalidRequest("stock_symbol is required".to_string()));
    }
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| RewardsError::InvalidRequest(format!("invalid date: {date}")))?;
    let price = Money::new(req.price);
    if !price.is_positive() {
        return Err(RewardsError::InvalidRequest("price must be positive".to_string()));
    }
    if !price.in_range() {
        return Err(RewardsError::InvalidRequest(format!(
            "price must be below {MONEY_LIMIT}"
        )));
    }

    state
        .price_cache
        .save_historical_price(&symbol, date, price)
        .await?;

    Ok(Json(HistoricalPriceResponse {
        stock_symbol: symbol,
        price_date: date,
        price: price.to_string(),
    }))
}

/// Price routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/prices/{symbol}/history/{date}", put(save_historical_price))
}
