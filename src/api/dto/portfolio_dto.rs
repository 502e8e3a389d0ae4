//! Portfolio, stats and historical-value DTOs.
//!
//! Monetary values and quantities are string-encoded decimals.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{HistoricalValue, PortfolioItem, PortfolioStats};

/// One holding valued at the current price.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PortfolioItemDto {
    /// Stock symbol.
    pub stock_symbol: String,
    /// Shares held.
    pub quantity: String,
    /// Price used for valuation.
    pub price: String,
    /// `quantity × price`.
    pub current_value: String,
    /// Last time a reward touched the holding.
    pub last_updated: DateTime<Utc>,
}

impl From<PortfolioItem> for PortfolioItemDto {
    fn from(item: PortfolioItem) -> Self {
        Self {
            stock_symbol: item.stock_symbol,
            quantity: item.quantity.to_string(),
            price: item.price.to_string(),
            current_value: item.current_value.to_string(),
            last_updated: item.last_updated,
        }
    }
}

/// Response body for `GET /portfolio/{user_id}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PortfolioResponse {
    /// Portfolio owner.
    pub user_id: uuid::Uuid,
    /// Holdings, largest value first.
    pub holdings: Vec<PortfolioItemDto>,
    /// Sum of `current_value`.
    pub total_value: String,
}

/// Value of the portfolio at the end of one day.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoricalValueDto {
    /// UTC calendar day.
    pub date: NaiveDate,
    /// Portfolio value in INR.
    pub value: String,
}

impl From<HistoricalValue> for HistoricalValueDto {
    fn from(point: HistoricalValue) -> Self {
        Self {
            date: point.date,
            value: point.value.to_string(),
        }
    }
}

/// Response body for `GET /historical-inr/{user_id}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoricalInrResponse {
    /// Portfolio owner.
    pub user_id: uuid::Uuid,
    /// One point per past reward day, latest first.
    pub historical_values: Vec<HistoricalValueDto>,
}

/// Dashboard statistics.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsDto {
    /// Shares rewarded today, per symbol.
    pub today_stocks: BTreeMap<String, String>,
    /// Current portfolio value in INR.
    pub current_portfolio_value_inr: String,
}

impl From<PortfolioStats> for StatsDto {
    fn from(stats: PortfolioStats) -> Self {
        Self {
            today_stocks: stats
                .today_stocks
                .into_iter()
                .map(|(symbol, quantity)| (symbol, quantity.to_string()))
                .collect(),
            current_portfolio_value_inr: stats.current_portfolio_value_inr.to_string(),
        }
    }
}

/// Response body for `GET /stats/{user_id}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    /// User the stats belong to.
    pub user_id: uuid::Uuid,
    /// Aggregated statistics.
    pub stats: StatsDto,
}
