//! PostgreSQL-backed implementations of the store traits.
//!
//! Stock mutations rely on guarded `UPDATE`s: the row lock serializes
//! concurrent movements on the same product and the `quantity >= $n`
//! predicate is evaluated against the locked value, so the ledger can
//! never go negative under concurrency.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{Order, OrderLine, OrderStatus, StockRecord};
use crate::error::ErpError;
use crate::store::{Catalog, ClientRef, OrderStore, ProductRef, StockLedger};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Catalog for PgStore {
    async fn client(&self, id: Uuid) -> Result<Option<ClientRef>, ErpError> {
        let row = sqlx::query_as::<_, (Uuid, String)>("SELECT id, name FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id, name)| ClientRef { id, name }))
    }

    async fn product(&self, id: Uuid) -> Result<Option<ProductRef>, ErpError> {
        let row =
            sqlx::query_as::<_, (Uuid, String)>("SELECT id, name FROM products WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, name)| ProductRef { id, name }))
    }
}

#[async_trait]
impl StockLedger for PgStore {
    async fn balance(&self, product_id: Uuid) -> Result<StockRecord, ErpError> {
        sqlx::query_as::<_, StockRecord>(
            "SELECT id, product_id, quantity FROM stock_records WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ErpError::NotFound("Estoque não encontrado".into()))
    }

    async fn increase(&self, product_id: Uuid, amount: i32) -> Result<StockRecord, ErpError> {
        debug!(%product_id, amount, "stock entry");
        let record = sqlx::query_as::<_, StockRecord>(
            "INSERT INTO stock_records (id, product_id, quantity) VALUES ($1, $2, $3) \
             ON CONFLICT (product_id) DO UPDATE SET quantity = stock_records.quantity + $3 \
             RETURNING id, product_id, quantity",
        )
        .bind(Uuid::now_v7())
        .bind(product_id)
        .bind(amount)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    async fn decrease(&self, product_id: Uuid, amount: i32) -> Result<StockRecord, ErpError> {
        debug!(%product_id, amount, "stock exit");
        let updated = sqlx::query_as::<_, StockRecord>(
            "UPDATE stock_records SET quantity = quantity - $2 \
             WHERE product_id = $1 AND quantity >= $2 \
             RETURNING id, product_id, quantity",
        )
        .bind(product_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(record) => Ok(record),
            // The guarded update matched nothing: either the record does
            // not exist or the balance is short.
            None => match self.balance(product_id).await {
                Ok(_) => {
                    let name = self.product(product_id).await?;
                    Err(ErpError::InsufficientStock(
                        name.map(|p| p.name).unwrap_or_else(|| product_id.to_string()),
                    ))
                }
                Err(err) => Err(err),
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    client_id: Uuid,
    client_name: String,
    created_at: DateTime<Utc>,
    status: OrderStatus,
    total: Decimal,
}

#[derive(sqlx::FromRow)]
struct LineRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
}

const ORDER_SELECT: &str = "SELECT o.id, o.client_id, c.name AS client_name, o.created_at, \
     o.status, o.total FROM orders o INNER JOIN clients c ON c.id = o.client_id";

impl PgStore {
    /// Attaches lines to a batch of order rows with one extra query.
    async fn hydrate(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, ErpError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let lines = sqlx::query_as::<_, LineRow>(
            "SELECT id, order_id, product_id, product_name, quantity, unit_price \
             FROM order_lines WHERE order_id = ANY($1) ORDER BY position",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for line in lines {
            by_order.entry(line.order_id).or_default().push(OrderLine {
                id: line.id,
                product_id: line.product_id,
                product_name: line.product_name,
                quantity: line.quantity,
                unit_price: line.unit_price,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| Order {
                lines: by_order.remove(&row.id).unwrap_or_default(),
                id: row.id,
                client_id: row.client_id,
                client_name: row.client_name,
                created_at: row.created_at,
                status: row.status,
                total: row.total,
            })
            .collect())
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert(&self, order: &Order) -> Result<(), ErpError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO orders (id, client_id, created_at, status, total) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(order.id)
        .bind(order.client_id)
        .bind(order.created_at)
        .bind(order.status)
        .bind(order.total)
        .execute(&mut *tx)
        .await?;

        for (position, line) in order.lines.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_lines \
                 (id, order_id, product_id, product_name, quantity, unit_price, position) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(line.id)
            .bind(order.id)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Order>, ErpError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<(), ErpError> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ErpError::NotFound("Pedido não encontrado".into()));
        }
        Ok(())
    }

    async fn conclude(&self, order: &Order) -> Result<(), ErpError> {
        let mut tx = self.pool.begin().await?;

        for line in &order.lines {
            let updated = sqlx::query(
                "UPDATE stock_records SET quantity = quantity - $2 \
                 WHERE product_id = $1 AND quantity >= $2",
            )
            .bind(line.product_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                // Dropping the transaction rolls back every decrement made
                // so far.
                let exists = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS (SELECT 1 FROM stock_records WHERE product_id = $1)",
                )
                .bind(line.product_id)
                .fetch_one(&mut *tx)
                .await?;
                return Err(if exists {
                    ErpError::InsufficientStock(line.product_name.clone())
                } else {
                    ErpError::NotFound(format!(
                        "Estoque não encontrado para o produto: {}",
                        line.product_name
                    ))
                });
            }
        }

        let updated = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1 AND status = $3")
            .bind(order.id)
            .bind(OrderStatus::Concluido)
            .bind(OrderStatus::Processando)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(ErpError::InvalidTransition(
                "Apenas pedidos em processamento podem ser concluídos".into(),
            ));
        }

        tx.commit().await?;
        debug!(order_id = %order.id, "order concluded, stock committed");
        Ok(())
    }

    async fn list_page(&self, page: u32, size: u32) -> Result<(Vec<Order>, i64), ErpError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} ORDER BY o.created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(size))
        .bind(i64::from(page) * i64::from(size))
        .fetch_all(&self.pool)
        .await?;
        let (total,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok((self.hydrate(rows).await?, total))
    }

    async fn list_by_client(&self, client_id: Uuid) -> Result<Vec<Order>, ErpError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE o.client_id = $1 ORDER BY o.created_at DESC"
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(rows).await
    }

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, ErpError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE o.status = $1 ORDER BY o.created_at DESC"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(rows).await
    }
}
