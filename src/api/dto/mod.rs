//! Data Transfer Objects for REST request/response serialization.
//!
//! Amounts and quantities are serialized as JSON strings so that clients
//! never round them through binary floats.

pub mod portfolio_dto;
pub mod price_dto;
pub mod reward_dto;

pub use portfolio_dto::*;
pub use price_dto::*;
pub use reward_dto::*;
