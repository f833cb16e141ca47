//! Client registry endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::ErpError;
use crate::AppState;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Client {
    pub id: Uuid,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "documento")]
    pub document: String,
    #[serde(rename = "telefone")]
    pub phone: String,
    #[serde(rename = "ativo")]
    pub active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ClientPayload {
    #[serde(rename = "nome")]
    #[validate(length(min = 1, max = 100, message = "Nome deve ter entre 1 e 100 caracteres"))]
    pub name: String,
    #[validate(email(message = "Email inválido"))]
    pub email: String,
    #[serde(rename = "documento")]
    #[validate(
        length(min = 11, max = 14, message = "Documento deve ter entre 11 e 14 caracteres"),
        custom = "super::digits_only"
    )]
    pub document: String,
    #[serde(rename = "telefone")]
    #[validate(
        length(min = 10, max = 15, message = "Telefone deve ter entre 10 e 15 caracteres"),
        custom = "super::digits_only"
    )]
    pub phone: String,
    #[serde(rename = "ativo")]
    pub active: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/clientes", get(list).post(create))
        .route("/clientes/:id", get(get_one).put(update).delete(remove))
}

async fn list(State(s): State<AppState>) -> Result<Json<Vec<Client>>, ErpError> {
    let clients = sqlx::query_as::<_, Client>("SELECT * FROM clients ORDER BY name")
        .fetch_all(&s.db)
        .await?;
    Ok(Json(clients))
}

async fn get_one(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Client>, ErpError> {
    fetch(&s.db, id).await.map(Json)
}

async fn create(
    State(s): State<AppState>,
    Json(payload): Json<ClientPayload>,
) -> Result<(StatusCode, Json<Client>), ErpError> {
    payload.validate()?;
    ensure_unique_email(&s.db, &payload.email, None).await?;
    let client = sqlx::query_as::<_, Client>(
        "INSERT INTO clients (id, name, email, document, phone, active) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&payload.document)
    .bind(&payload.phone)
    .bind(payload.active)
    .fetch_one(&s.db)
    .await?;
    Ok((StatusCode::CREATED, Json(client)))
}

async fn update(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ClientPayload>,
) -> Result<Json<Client>, ErpError> {
    payload.validate()?;
    ensure_unique_email(&s.db, &payload.email, Some(id)).await?;
    let client = sqlx::query_as::<_, Client>(
        "UPDATE clients SET name = $2, email = $3, document = $4, phone = $5, active = $6 \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&payload.document)
    .bind(&payload.phone)
    .bind(payload.active)
    .fetch_optional(&s.db)
    .await?
    .ok_or_else(|| not_found(id))?;
    Ok(Json(client))
}

async fn remove(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, ErpError> {
    let result = sqlx::query("DELETE FROM clients WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch(db: &sqlx::PgPool, id: Uuid) -> Result<Client, ErpError> {
    sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| not_found(id))
}

async fn ensure_unique_email(
    db: &sqlx::PgPool,
    email: &str,
    exclude: Option<Uuid>,
) -> Result<(), ErpError> {
    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM clients WHERE email = $1 AND id IS DISTINCT FROM $2)",
    )
    .bind(email)
    .bind(exclude)
    .fetch_one(db)
    .await?;
    if taken {
        return Err(ErpError::Conflict("E-mail já cadastrado".into()));
    }
    Ok(())
}

fn not_found(id: Uuid) -> ErpError {
    ErpError::NotFound(format!("Cliente não encontrado com o ID: {id}"))
}
