//! Stock ledger row: the tracked on-hand quantity for one product.

use serde::Serialize;
use uuid::Uuid;

/// One row per product; quantity never goes below zero. Absence of a row
/// means "no stock movement yet", not an error.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct StockRecord {
    pub id: Uuid,
    #[serde(rename = "produtoId")]
    pub product_id: Uuid,
    #[serde(rename = "quantidade")]
    pub quantity: i32,
}
