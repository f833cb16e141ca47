//! Order workflow endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{Order, OrderLine, OrderStatus};
use crate::error::ErpError;
use crate::pagination::{PageParams, PageResponse};
use crate::service::NewOrderItem;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrderPayload {
    #[serde(rename = "clienteId")]
    pub client_id: Uuid,
    #[serde(rename = "itens")]
    pub items: Vec<OrderItemPayload>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OrderItemPayload {
    #[serde(rename = "produtoId")]
    pub product_id: Uuid,
    #[serde(rename = "quantidade")]
    #[validate(range(min = 1, message = "Quantidade deve ser positiva"))]
    pub quantity: i32,
    #[serde(rename = "precoUnitario")]
    #[validate(custom = "super::positive_decimal")]
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    #[serde(rename = "clienteId")]
    pub client_id: Uuid,
    #[serde(rename = "clienteNome")]
    pub client_name: String,
    #[serde(rename = "dataPedido")]
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub total: Decimal,
    #[serde(rename = "itens")]
    pub lines: Vec<OrderLineResponse>,
}

#[derive(Debug, Serialize)]
pub struct OrderLineResponse {
    pub id: Uuid,
    #[serde(rename = "produtoId")]
    pub product_id: Uuid,
    #[serde(rename = "produtoNome")]
    pub product_name: String,
    #[serde(rename = "quantidade")]
    pub quantity: i32,
    #[serde(rename = "precoUnitario")]
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl From<OrderLine> for OrderLineResponse {
    fn from(line: OrderLine) -> Self {
        let subtotal = line.subtotal();
        Self {
            id: line.id,
            product_id: line.product_id,
            product_name: line.product_name,
            quantity: line.quantity,
            unit_price: line.unit_price,
            subtotal,
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            client_id: order.client_id,
            client_name: order.client_name,
            created_at: order.created_at,
            status: order.status,
            total: order.total,
            lines: order.lines.into_iter().map(Into::into).collect(),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pedidos/criar", post(create))
        .route("/pedidos/:id/processar", put(process))
        .route("/pedidos/:id/concluir", put(complete))
        .route("/pedidos/:id/cancelar", put(cancel))
        .route("/pedidos/:id", get(get_one))
        .route("/pedidos/listar", get(list))
        .route("/pedidos/cliente/:cliente_id", get(list_by_client))
        .route("/pedidos/status/:status", get(list_by_status))
}

async fn create(
    State(s): State<AppState>,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<(StatusCode, Json<OrderResponse>), ErpError> {
    for item in &payload.items {
        item.validate()?;
    }
    let items = payload
        .items
        .into_iter()
        .map(|item| NewOrderItem {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
        .collect();
    let order = s.orders.create(payload.client_id, items).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

async fn process(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ErpError> {
    Ok(Json(s.orders.process(id).await?.into()))
}

async fn complete(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ErpError> {
    Ok(Json(s.orders.complete(id).await?.into()))
}

async fn cancel(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ErpError> {
    Ok(Json(s.orders.cancel(id).await?.into()))
}

async fn get_one(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ErpError> {
    Ok(Json(s.orders.get(id).await?.into()))
}

async fn list(
    State(s): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<PageResponse<OrderResponse>>, ErpError> {
    let page = s
        .orders
        .list(params.page, params.capped_size())
        .await?
        .map(OrderResponse::from);
    Ok(Json(page))
}

async fn list_by_client(
    State(s): State<AppState>,
    Path(cliente_id): Path<Uuid>,
) -> Result<Json<Vec<OrderResponse>>, ErpError> {
    let orders = s.orders.list_by_client(cliente_id).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

async fn list_by_status(
    State(s): State<AppState>,
    Path(status): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, ErpError> {
    let status: OrderStatus = status.parse()?;
    let orders = s.orders.list_by_status(status).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}
