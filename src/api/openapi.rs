//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use crate::api::handlers::{portfolio, prices, reward, system};

/// Generated OpenAPI 3.1 document, served at `/api-docs/openapi.json`.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "stock-rewards",
        description = "Stock reward ledger and portfolio valuation service."
    ),
    paths(
        reward::create_reward,
        reward::get_today_stocks,
        portfolio::get_portfolio,
        portfolio::get_stats,
        portfolio::get_historical_inr,
        prices::save_historical_price,
        system::health_handler,
    ),
    tags(
        (name = "Rewards", description = "Reward creation and listing"),
        (name = "Portfolio", description = "Holdings valuation"),
        (name = "Prices", description = "Price administration"),
        (name = "System", description = "Service health"),
    )
)]
pub struct ApiDoc;
