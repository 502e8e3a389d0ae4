//! Historical price DTOs.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for `PUT /prices/{symbol}/history/{date}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveHistoricalPriceRequest {
    /// Closing price for the day.
    #[schema(value_type = String, example = "3512.45")]
    pub price: Decimal,
}

/// A stored historical price.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoricalPriceResponse {
    /// Stock symbol.
    pub stock_symbol: String,
    /// UTC calendar day.
    pub price_date: NaiveDate,
    /// Stored price (string-encoded decimal).
    pub price: String,
}
