//! HTTP surface: one router per resource, merged into the API router.

pub mod clients;
pub mod orders;
pub mod products;
pub mod stock;
pub mod suppliers;

use axum::routing::get;
use axum::{Json, Router};
use rust_decimal::Decimal;
use validator::ValidationError;

use crate::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(clients::router())
        .merge(suppliers::router())
        .merge(products::router())
        .merge(stock::router())
        .merge(orders::router())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "vendas-erp"}))
}

pub(crate) fn positive_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("positive");
        err.message = Some("deve ser positivo".into());
        Err(err)
    }
}

pub(crate) fn digits_only(value: &str) -> Result<(), ValidationError> {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("digits");
        err.message = Some("deve conter apenas números".into());
        Err(err)
    }
}
