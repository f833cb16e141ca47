//! Typed errors for the API surface.
//!
//! Every domain-rule violation carries its intended HTTP status; handlers
//! bubble errors with `?` and the `IntoResponse` impl turns them into the
//! `{campo, mensagem}` bodies the API contract uses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ErpError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BusinessRule(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("Estoque insuficiente para o produto: {0}")]
    InsufficientStock(String),

    #[error("Status inválido: {0}. Status válidos: ABERTO, PROCESSANDO, CONCLUIDO, CANCELADO")]
    InvalidStatus(String),

    #[error("Dados inválidos")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Erro interno do servidor")]
    Database(sqlx::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub campo: String,
    pub mensagem: String,
}

impl ErpError {
    pub fn status(&self) -> StatusCode {
        match self {
            ErpError::NotFound(_) => StatusCode::NOT_FOUND,
            ErpError::Conflict(_) => StatusCode::CONFLICT,
            ErpError::BusinessRule(_)
            | ErpError::InvalidTransition(_)
            | ErpError::InsufficientStock(_)
            | ErpError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            ErpError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ErpError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ErpError {
    fn from(err: sqlx::Error) -> Self {
        // Unique (23505) and foreign-key (23503) violations are client
        // conflicts, not server faults.
        if let sqlx::Error::Database(db) = &err {
            match db.code().as_deref() {
                Some("23505") => return ErpError::Conflict("Registro duplicado".into()),
                Some("23503") => {
                    return ErpError::Conflict("Registro referenciado por outros dados".into())
                }
                _ => {}
            }
        }
        ErpError::Database(err)
    }
}

impl IntoResponse for ErpError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ErpError::Validation(errors) => {
                let body: Vec<ErrorBody> = errors
                    .field_errors()
                    .into_iter()
                    .flat_map(|(field, errs)| {
                        errs.iter().map(move |e| ErrorBody {
                            campo: field.to_string(),
                            mensagem: e
                                .message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string()),
                        })
                    })
                    .collect();
                (status, Json(body)).into_response()
            }
            ErpError::Database(ref err) => {
                tracing::error!(%err, "database failure");
                let body = ErrorBody {
                    campo: "erro".into(),
                    mensagem: self.to_string(),
                };
                (status, Json(body)).into_response()
            }
            other => {
                let body = ErrorBody {
                    campo: "Erro de regra de negócio".into(),
                    mensagem: other.to_string(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            ErpError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ErpError::Conflict("x".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErpError::InsufficientStock("Caneta".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErpError::InvalidStatus("FECHADO".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn insufficient_stock_names_the_product() {
        let err = ErpError::InsufficientStock("Caneta Azul".into());
        assert_eq!(
            err.to_string(),
            "Estoque insuficiente para o produto: Caneta Azul"
        );
    }
}
