//! Product catalog endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::ErpError;
use crate::pagination::{PageParams, PageResponse};
use crate::AppState;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "descricao")]
    pub description: Option<String>,
    #[serde(rename = "codigoBarras")]
    pub barcode: String,
    #[serde(rename = "preco")]
    pub price: Decimal,
    #[serde(rename = "fornecedorId")]
    pub supplier_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductPayload {
    #[serde(rename = "nome")]
    #[validate(length(min = 1, max = 100, message = "Nome deve ter entre 1 e 100 caracteres"))]
    pub name: String,
    #[serde(rename = "descricao")]
    pub description: Option<String>,
    #[serde(rename = "codigoBarras")]
    #[validate(length(min = 1, max = 50, message = "Código de barras deve ter entre 1 e 50 caracteres"))]
    pub barcode: String,
    #[serde(rename = "preco")]
    #[validate(custom = "super::positive_decimal")]
    pub price: Decimal,
    #[serde(rename = "fornecedorId")]
    pub supplier_id: Uuid,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/produtos", get(list).post(create))
        .route("/produtos/:id", get(get_one).put(update).delete(remove))
}

async fn list(
    State(s): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<PageResponse<Product>>, ErpError> {
    let size = params.capped_size();
    let products =
        sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY name LIMIT $1 OFFSET $2")
            .bind(i64::from(size))
            .bind(params.offset())
            .fetch_all(&s.db)
            .await?;
    let (total,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM products")
        .fetch_one(&s.db)
        .await?;
    Ok(Json(PageResponse::new(products, params.page, size, total)))
}

async fn get_one(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ErpError> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

async fn create(
    State(s): State<AppState>,
    Json(payload): Json<ProductPayload>,
) -> Result<(StatusCode, Json<Product>), ErpError> {
    payload.validate()?;
    ensure_unique_barcode(&s.db, &payload.barcode, None).await?;
    ensure_supplier_exists(&s.db, payload.supplier_id).await?;
    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, name, description, barcode, price, supplier_id) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(&payload.barcode)
    .bind(payload.price)
    .bind(payload.supplier_id)
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<Product>, ErpError> {
    payload.validate()?;
    ensure_unique_barcode(&s.db, &payload.barcode, Some(id)).await?;
    ensure_supplier_exists(&s.db, payload.supplier_id).await?;
    let product = sqlx::query_as::<_, Product>(
        "UPDATE products SET name = $2, description = $3, barcode = $4, price = $5, \
         supplier_id = $6 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(&payload.barcode)
    .bind(payload.price)
    .bind(payload.supplier_id)
    .fetch_optional(&s.db)
    .await?
    .ok_or_else(|| not_found(id))?;
    Ok(Json(product))
}

async fn remove(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, ErpError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_unique_barcode(
    db: &sqlx::PgPool,
    barcode: &str,
    exclude: Option<Uuid>,
) -> Result<(), ErpError> {
    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM products WHERE barcode = $1 AND id IS DISTINCT FROM $2)",
    )
    .bind(barcode)
    .bind(exclude)
    .fetch_one(db)
    .await?;
    if taken {
        return Err(ErpError::Conflict("Código de barras já cadastrado".into()));
    }
    Ok(())
}

async fn ensure_supplier_exists(db: &sqlx::PgPool, supplier_id: Uuid) -> Result<(), ErpError> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM suppliers WHERE id = $1)")
            .bind(supplier_id)
            .fetch_one(db)
            .await?;
    if !exists {
        return Err(ErpError::NotFound(format!(
            "Fornecedor não encontrado com o ID: {supplier_id}"
        )));
    }
    Ok(())
}

fn not_found(id: Uuid) -> ErpError {
    ErpError::NotFound(format!("Produto não encontrado com o ID: {id}"))
}
