//! In-memory backend implementing the same store contracts as PostgreSQL.
//!
//! One struct carries all three seams so the workflow tests can observe
//! stock and orders through a single handle. A single `RwLock` over the
//! whole state gives the conclude commit the same all-or-nothing behavior
//! the transactional implementation has.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Order, OrderStatus, StockRecord};
use crate::error::ErpError;
use crate::store::{Catalog, ClientRef, OrderStore, ProductRef, StockLedger};

#[derive(Default)]
struct Inner {
    clients: HashMap<Uuid, String>,
    products: HashMap<Uuid, String>,
    stock: HashMap<Uuid, StockRecord>,
    orders: Vec<Order>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_client(&self, id: Uuid, name: impl Into<String>) {
        self.inner.write().await.clients.insert(id, name.into());
    }

    pub async fn add_product(&self, id: Uuid, name: impl Into<String>) {
        self.inner.write().await.products.insert(id, name.into());
    }
}

#[async_trait]
impl Catalog for MemoryStore {
    async fn client(&self, id: Uuid) -> Result<Option<ClientRef>, ErpError> {
        let inner = self.inner.read().await;
        Ok(inner
            .clients
            .get(&id)
            .map(|name| ClientRef { id, name: name.clone() }))
    }

    async fn product(&self, id: Uuid) -> Result<Option<ProductRef>, ErpError> {
        let inner = self.inner.read().await;
        Ok(inner
            .products
            .get(&id)
            .map(|name| ProductRef { id, name: name.clone() }))
    }
}

#[async_trait]
impl StockLedger for MemoryStore {
    async fn balance(&self, product_id: Uuid) -> Result<StockRecord, ErpError> {
        let inner = self.inner.read().await;
        inner
            .stock
            .get(&product_id)
            .cloned()
            .ok_or_else(|| ErpError::NotFound("Estoque não encontrado".into()))
    }

    async fn increase(&self, product_id: Uuid, amount: i32) -> Result<StockRecord, ErpError> {
        let mut inner = self.inner.write().await;
        let record = inner.stock.entry(product_id).or_insert_with(|| StockRecord {
            id: Uuid::now_v7(),
            product_id,
            quantity: 0,
        });
        record.quantity += amount;
        Ok(record.clone())
    }

    async fn decrease(&self, product_id: Uuid, amount: i32) -> Result<StockRecord, ErpError> {
        let mut inner = self.inner.write().await;
        let product_name = inner
            .products
            .get(&product_id)
            .cloned()
            .unwrap_or_else(|| product_id.to_string());
        let record = inner
            .stock
            .get_mut(&product_id)
            .ok_or_else(|| ErpError::NotFound("Estoque não encontrado".into()))?;
        if record.quantity < amount {
            return Err(ErpError::InsufficientStock(product_name));
        }
        record.quantity -= amount;
        Ok(record.clone())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert(&self, order: &Order) -> Result<(), ErpError> {
        self.inner.write().await.orders.push(order.clone());
        Ok(())
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Order>, ErpError> {
        let inner = self.inner.read().await;
        Ok(inner.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<(), ErpError> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| ErpError::NotFound("Pedido não encontrado".into()))?;
        order.status = status;
        Ok(())
    }

    async fn conclude(&self, order: &Order) -> Result<(), ErpError> {
        let mut inner = self.inner.write().await;

        // Validate every line before touching anything, then apply; the
        // write lock is held for the whole commit.
        for line in &order.lines {
            match inner.stock.get(&line.product_id) {
                None => {
                    return Err(ErpError::NotFound(format!(
                        "Estoque não encontrado para o produto: {}",
                        line.product_name
                    )))
                }
                Some(record) if record.quantity < line.quantity => {
                    return Err(ErpError::InsufficientStock(line.product_name.clone()));
                }
                Some(_) => {}
            }
        }

        let stored = inner
            .orders
            .iter_mut()
            .find(|o| o.id == order.id)
            .ok_or_else(|| ErpError::NotFound("Pedido não encontrado".into()))?;
        if stored.status != OrderStatus::Processando {
            return Err(ErpError::InvalidTransition(
                "Apenas pedidos em processamento podem ser concluídos".into(),
            ));
        }
        stored.status = OrderStatus::Concluido;

        for line in &order.lines {
            if let Some(record) = inner.stock.get_mut(&line.product_id) {
                record.quantity -= line.quantity;
            }
        }
        Ok(())
    }

    async fn list_page(&self, page: u32, size: u32) -> Result<(Vec<Order>, i64), ErpError> {
        let inner = self.inner.read().await;
        let mut all: Vec<Order> = inner.orders.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = all.len() as i64;
        let content = all
            .into_iter()
            .skip(page as usize * size as usize)
            .take(size as usize)
            .collect();
        Ok((content, total))
    }

    async fn list_by_client(&self, client_id: Uuid) -> Result<Vec<Order>, ErpError> {
        let inner = self.inner.read().await;
        let mut matching: Vec<Order> = inner
            .orders
            .iter()
            .filter(|o| o.client_id == client_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, ErpError> {
        let inner = self.inner.read().await;
        let mut matching: Vec<Order> = inner
            .orders
            .iter()
            .filter(|o| o.status == status)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn increase_creates_the_record_lazily() {
        let store = MemoryStore::new();
        let product = Uuid::now_v7();
        assert!(store.balance(product).await.is_err());
        let record = store.increase(product, 7).await.unwrap();
        assert_eq!(record.quantity, 7);
    }

    #[tokio::test]
    async fn decrease_never_goes_below_zero() {
        let store = MemoryStore::new();
        let product = Uuid::now_v7();
        store.add_product(product, "Caderno").await;
        store.increase(product, 5).await.unwrap();

        let err = store.decrease(product, 6).await.unwrap_err();
        assert!(matches!(err, ErpError::InsufficientStock(ref name) if name == "Caderno"));
        assert_eq!(store.balance(product).await.unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn decrease_without_a_record_is_not_found() {
        let store = MemoryStore::new();
        let err = store.decrease(Uuid::now_v7(), 1).await.unwrap_err();
        assert!(matches!(err, ErpError::NotFound(_)));
    }

    #[tokio::test]
    async fn increase_then_decrease_round_trips() {
        let store = MemoryStore::new();
        let product = Uuid::now_v7();
        store.increase(product, 10).await.unwrap();
        store.increase(product, 3).await.unwrap();
        store.decrease(product, 3).await.unwrap();
        assert_eq!(store.balance(product).await.unwrap().quantity, 10);
    }

    #[tokio::test]
    async fn on_hand_treats_absence_as_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.on_hand(Uuid::now_v7()).await.unwrap(), 0);
    }
}
