//! Vendas ERP
//!
//! Self-hosted ERP backend for small commerce operations.
//!
//! ## Features
//! - Client and supplier registries
//! - Product catalog with barcode uniqueness
//! - Stock ledger with entry/exit movements and balance queries
//! - Sales orders: ABERTO → PROCESSANDO → CONCLUIDO, with CANCELADO as the
//!   alternate terminal state
//! - Atomic stock commit when an order is concluded

use std::sync::Arc;

pub mod domain;
pub mod error;
pub mod pagination;
pub mod routes;
pub mod service;
pub mod store;

use crate::service::OrderService;
use crate::store::StockLedger;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub stock: Arc<dyn StockLedger>,
    pub orders: OrderService,
}
