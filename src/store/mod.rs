//! Persistence seams for the order workflow.
//!
//! The workflow service receives these as trait objects, so the business
//! rules can be exercised against the in-memory backend while the running
//! service uses PostgreSQL.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Order, OrderStatus, StockRecord};
use crate::error::ErpError;

/// A client reference resolved for an order.
#[derive(Clone, Debug)]
pub struct ClientRef {
    pub id: Uuid,
    pub name: String,
}

/// A product reference with the name to denormalize into order lines.
#[derive(Clone, Debug)]
pub struct ProductRef {
    pub id: Uuid,
    pub name: String,
}

/// Lookup of the catalog entities an order references. Existence and naming
/// only; the workflow never reads live prices for billing.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn client(&self, id: Uuid) -> Result<Option<ClientRef>, ErpError>;
    async fn product(&self, id: Uuid) -> Result<Option<ProductRef>, ErpError>;
}

/// Per-product stock quantities with atomic, never-negative mutations.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Current record for a product; `NotFound` when stock was never moved.
    async fn balance(&self, product_id: Uuid) -> Result<StockRecord, ErpError>;

    /// Adds `amount` to the product's stock, creating the record at zero
    /// when this is the first movement.
    async fn increase(&self, product_id: Uuid, amount: i32) -> Result<StockRecord, ErpError>;

    /// Removes `amount` from the product's stock. Fails with `NotFound`
    /// when there is no record and `InsufficientStock` when the balance is
    /// short; the quantity is left untouched on failure.
    async fn decrease(&self, product_id: Uuid, amount: i32) -> Result<StockRecord, ErpError>;

    /// Read-only quantity used for order pre-checks; an absent record
    /// counts as zero.
    async fn on_hand(&self, product_id: Uuid) -> Result<i32, ErpError> {
        match self.balance(product_id).await {
            Ok(record) => Ok(record.quantity),
            Err(ErpError::NotFound(_)) => Ok(0),
            Err(err) => Err(err),
        }
    }
}

/// Order persistence, including the atomic conclusion commit.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order and its lines in one transaction.
    async fn insert(&self, order: &Order) -> Result<(), ErpError>;

    async fn fetch(&self, id: Uuid) -> Result<Option<Order>, ErpError>;

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<(), ErpError>;

    /// Decrements stock for every line and marks the order CONCLUIDO in a
    /// single transaction. Any line short on stock aborts the whole commit,
    /// leaving both stock and status untouched, with the error naming the
    /// offending product.
    async fn conclude(&self, order: &Order) -> Result<(), ErpError>;

    /// One page of orders, newest first, plus the total count.
    async fn list_page(&self, page: u32, size: u32) -> Result<(Vec<Order>, i64), ErpError>;

    async fn list_by_client(&self, client_id: Uuid) -> Result<Vec<Order>, ErpError>;

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, ErpError>;
}
