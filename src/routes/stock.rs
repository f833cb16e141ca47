//! Stock movement endpoints: entry, exit and balance queries.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::StockRecord;
use crate::error::ErpError;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct StockMovementPayload {
    #[serde(rename = "idProduto")]
    pub product_id: Uuid,
    #[serde(rename = "quantidade")]
    #[validate(range(min = 1, message = "Quantidade deve ser positiva"))]
    pub quantity: i32,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/estoque/entrada", post(entry))
        .route("/estoque/saida", post(exit))
        .route("/estoque/saldo/:produto_id", get(balance))
}

async fn entry(
    State(s): State<AppState>,
    Json(payload): Json<StockMovementPayload>,
) -> Result<Json<StockRecord>, ErpError> {
    payload.validate()?;
    ensure_product_exists(&s.db, payload.product_id).await?;
    let record = s.stock.increase(payload.product_id, payload.quantity).await?;
    Ok(Json(record))
}

async fn exit(
    State(s): State<AppState>,
    Json(payload): Json<StockMovementPayload>,
) -> Result<Json<StockRecord>, ErpError> {
    payload.validate()?;
    let record = s.stock.decrease(payload.product_id, payload.quantity).await?;
    Ok(Json(record))
}

async fn balance(
    State(s): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<StockRecord>, ErpError> {
    let record = s.stock.balance(product_id).await?;
    Ok(Json(record))
}

async fn ensure_product_exists(db: &sqlx::PgPool, product_id: Uuid) -> Result<(), ErpError> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
            .bind(product_id)
            .fetch_one(db)
            .await?;
    if !exists {
        return Err(ErpError::NotFound(format!(
            "Produto não encontrado com o ID: {product_id}"
        )));
    }
    Ok(())
}
