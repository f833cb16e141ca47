//! Order workflow: creation, status transitions and listings.
//!
//! The service owns no persistence of its own; the catalog, the stock
//! ledger and the order store are injected so the workflow rules can run
//! against any backend. Stock is only committed when an order is
//! concluded; creation performs a pre-check, not a reservation.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{Order, OrderLine, OrderStatus};
use crate::error::ErpError;
use crate::pagination::PageResponse;
use crate::store::{Catalog, OrderStore, StockLedger};

/// One requested item at order creation: the unit price is the caller's
/// snapshot, never read back from the catalog.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Clone)]
pub struct OrderService {
    catalog: Arc<dyn Catalog>,
    stock: Arc<dyn StockLedger>,
    orders: Arc<dyn OrderStore>,
    events: Option<async_nats::Client>,
}

impl OrderService {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        stock: Arc<dyn StockLedger>,
        orders: Arc<dyn OrderStore>,
        events: Option<async_nats::Client>,
    ) -> Self {
        Self {
            catalog,
            stock,
            orders,
            events,
        }
    }

    pub async fn create(
        &self,
        client_id: Uuid,
        items: Vec<NewOrderItem>,
    ) -> Result<Order, ErpError> {
        let client = self
            .catalog
            .client(client_id)
            .await?
            .ok_or_else(|| ErpError::NotFound("Cliente não encontrado".into()))?;

        let mut lines = Vec::with_capacity(items.len());
        for item in &items {
            let product = self.catalog.product(item.product_id).await?.ok_or_else(|| {
                ErpError::NotFound(format!(
                    "Produto com ID {} não encontrado",
                    item.product_id
                ))
            })?;
            let available = self.stock.on_hand(item.product_id).await?;
            if available < item.quantity {
                return Err(ErpError::InsufficientStock(product.name));
            }
            lines.push(OrderLine {
                id: Uuid::now_v7(),
                product_id: product.id,
                product_name: product.name,
                quantity: item.quantity,
                unit_price: item.unit_price,
            });
        }

        let order = Order::create(client_id, client.name, lines)?;
        self.orders.insert(&order).await?;
        info!(order_id = %order.id, total = %order.total, "order created");
        self.publish("pedidos.criado", &order).await;
        Ok(order)
    }

    pub async fn process(&self, id: Uuid) -> Result<Order, ErpError> {
        let mut order = self.fetch(id).await?;
        order.process()?;
        self.orders.update_status(order.id, order.status).await?;
        info!(order_id = %order.id, "order moved to PROCESSANDO");
        self.publish("pedidos.processando", &order).await;
        Ok(order)
    }

    /// Concludes the order, committing the stock decrement for every line
    /// atomically. On `InsufficientStock` nothing is persisted and the
    /// order stays PROCESSANDO; the caller retries after restocking.
    pub async fn complete(&self, id: Uuid) -> Result<Order, ErpError> {
        let mut order = self.fetch(id).await?;
        order.conclude()?;
        self.orders.conclude(&order).await?;
        info!(order_id = %order.id, "order concluded");
        self.publish("pedidos.concluido", &order).await;
        Ok(order)
    }

    pub async fn cancel(&self, id: Uuid) -> Result<Order, ErpError> {
        let mut order = self.fetch(id).await?;
        order.cancel()?;
        self.orders.update_status(order.id, order.status).await?;
        info!(order_id = %order.id, "order cancelled");
        self.publish("pedidos.cancelado", &order).await;
        Ok(order)
    }

    pub async fn get(&self, id: Uuid) -> Result<Order, ErpError> {
        self.fetch(id).await
    }

    pub async fn list(&self, page: u32, size: u32) -> Result<PageResponse<Order>, ErpError> {
        let (orders, total) = self.orders.list_page(page, size).await?;
        Ok(PageResponse::new(orders, page, size, total))
    }

    pub async fn list_by_client(&self, client_id: Uuid) -> Result<Vec<Order>, ErpError> {
        self.orders.list_by_client(client_id).await
    }

    pub async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, ErpError> {
        self.orders.list_by_status(status).await
    }

    async fn fetch(&self, id: Uuid) -> Result<Order, ErpError> {
        self.orders
            .fetch(id)
            .await?
            .ok_or_else(|| ErpError::NotFound("Pedido não encontrado".into()))
    }

    async fn publish(&self, subject: &str, order: &Order) {
        let Some(nats) = &self.events else {
            return;
        };
        let event = serde_json::json!({
            "pedidoId": order.id,
            "clienteId": order.client_id,
            "status": order.status,
            "total": order.total,
        });
        if let Ok(payload) = serde_json::to_vec(&event) {
            if let Err(err) = nats.publish(subject.to_string(), payload.into()).await {
                warn!(%err, subject, "failed to publish order event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    struct Fixture {
        service: OrderService,
        store: MemoryStore,
        client_id: Uuid,
        product_id: Uuid,
    }

    async fn fixture(initial_stock: i32) -> Fixture {
        let store = MemoryStore::new();
        let client_id = Uuid::now_v7();
        let product_id = Uuid::now_v7();
        store.add_client(client_id, "Maria Souza").await;
        store.add_product(product_id, "Caneta Azul").await;
        if initial_stock > 0 {
            store.increase(product_id, initial_stock).await.unwrap();
        }
        let service = OrderService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            None,
        );
        Fixture {
            service,
            store,
            client_id,
            product_id,
        }
    }

    fn item(product_id: Uuid, quantity: i32, unit_price: Decimal) -> NewOrderItem {
        NewOrderItem {
            product_id,
            quantity,
            unit_price,
        }
    }

    #[tokio::test]
    async fn create_fixes_total_and_opens_without_moving_stock() {
        let fx = fixture(5).await;
        let order = fx
            .service
            .create(fx.client_id, vec![item(fx.product_id, 2, Decimal::new(1050, 2))])
            .await
            .unwrap();

        assert_eq!(order.total, Decimal::new(2100, 2));
        assert_eq!(order.status, OrderStatus::Aberto);
        assert_eq!(order.client_name, "Maria Souza");
        assert_eq!(order.lines[0].product_name, "Caneta Azul");
        // Creation is a pre-check only.
        assert_eq!(fx.store.balance(fx.product_id).await.unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn create_rejects_unknown_client() {
        let fx = fixture(5).await;
        let err = fx
            .service
            .create(Uuid::now_v7(), vec![item(fx.product_id, 1, Decimal::ONE)])
            .await
            .unwrap_err();
        assert!(matches!(err, ErpError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_rejects_unknown_product() {
        let fx = fixture(5).await;
        let err = fx
            .service
            .create(fx.client_id, vec![item(Uuid::now_v7(), 1, Decimal::ONE)])
            .await
            .unwrap_err();
        assert!(matches!(err, ErpError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_rejects_quantity_above_stock() {
        let fx = fixture(5).await;
        let err = fx
            .service
            .create(fx.client_id, vec![item(fx.product_id, 6, Decimal::ONE)])
            .await
            .unwrap_err();
        assert!(matches!(err, ErpError::InsufficientStock(ref name) if name == "Caneta Azul"));
    }

    #[tokio::test]
    async fn create_treats_untracked_stock_as_zero() {
        let fx = fixture(0).await;
        let err = fx
            .service
            .create(fx.client_id, vec![item(fx.product_id, 1, Decimal::ONE)])
            .await
            .unwrap_err();
        assert!(matches!(err, ErpError::InsufficientStock(_)));
    }

    #[tokio::test]
    async fn create_rejects_empty_item_list() {
        let fx = fixture(5).await;
        let err = fx.service.create(fx.client_id, vec![]).await.unwrap_err();
        assert!(matches!(err, ErpError::BusinessRule(_)));
    }

    #[tokio::test]
    async fn process_succeeds_once_then_rejects() {
        let fx = fixture(5).await;
        let order = fx
            .service
            .create(fx.client_id, vec![item(fx.product_id, 2, Decimal::ONE)])
            .await
            .unwrap();

        let processed = fx.service.process(order.id).await.unwrap();
        assert_eq!(processed.status, OrderStatus::Processando);

        let err = fx.service.process(order.id).await.unwrap_err();
        assert!(matches!(err, ErpError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn complete_commits_stock_and_concludes() {
        let fx = fixture(100).await;
        let order = fx
            .service
            .create(fx.client_id, vec![item(fx.product_id, 5, Decimal::new(1050, 2))])
            .await
            .unwrap();
        fx.service.process(order.id).await.unwrap();

        let concluded = fx.service.complete(order.id).await.unwrap();
        assert_eq!(concluded.status, OrderStatus::Concluido);
        assert_eq!(fx.store.balance(fx.product_id).await.unwrap().quantity, 95);
    }

    #[tokio::test]
    async fn complete_with_short_stock_changes_nothing() {
        let fx = fixture(10).await;
        let order = fx
            .service
            .create(fx.client_id, vec![item(fx.product_id, 10, Decimal::ONE)])
            .await
            .unwrap();
        fx.service.process(order.id).await.unwrap();

        // Stock drains to 5 between processing and completion.
        fx.store.decrease(fx.product_id, 5).await.unwrap();

        let err = fx.service.complete(order.id).await.unwrap_err();
        assert!(matches!(err, ErpError::InsufficientStock(_)));
        assert_eq!(
            fx.service.get(order.id).await.unwrap().status,
            OrderStatus::Processando
        );
        assert_eq!(fx.store.balance(fx.product_id).await.unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn complete_is_atomic_across_lines() {
        let fx = fixture(50).await;
        let scarce = Uuid::now_v7();
        fx.store.add_product(scarce, "Grampeador").await;
        fx.store.increase(scarce, 4).await.unwrap();

        let order = fx
            .service
            .create(
                fx.client_id,
                vec![item(fx.product_id, 3, Decimal::ONE), item(scarce, 4, Decimal::ONE)],
            )
            .await
            .unwrap();
        fx.service.process(order.id).await.unwrap();
        fx.store.decrease(scarce, 1).await.unwrap();

        let err = fx.service.complete(order.id).await.unwrap_err();
        assert!(matches!(err, ErpError::InsufficientStock(ref name) if name == "Grampeador"));
        // The first line's stock was not touched.
        assert_eq!(fx.store.balance(fx.product_id).await.unwrap().quantity, 50);
        assert_eq!(fx.store.balance(scarce).await.unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn cancel_allowed_only_before_conclusion() {
        let fx = fixture(10).await;
        let order = fx
            .service
            .create(fx.client_id, vec![item(fx.product_id, 1, Decimal::ONE)])
            .await
            .unwrap();
        fx.service.process(order.id).await.unwrap();
        fx.service.complete(order.id).await.unwrap();

        let err = fx.service.cancel(order.id).await.unwrap_err();
        assert!(matches!(err, ErpError::InvalidTransition(_)));

        let cancellable = fx
            .service
            .create(fx.client_id, vec![item(fx.product_id, 1, Decimal::ONE)])
            .await
            .unwrap();
        let cancelled = fx.service.cancel(cancellable.id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelado);

        let err = fx.service.cancel(cancellable.id).await.unwrap_err();
        assert!(matches!(err, ErpError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn list_by_status_returns_only_matching_orders() {
        let fx = fixture(100).await;
        let mut ids = Vec::new();
        for _ in 0..3 {
            let order = fx
                .service
                .create(fx.client_id, vec![item(fx.product_id, 1, Decimal::ONE)])
                .await
                .unwrap();
            ids.push(order.id);
        }
        fx.service.process(ids[1]).await.unwrap();

        let processing = fx
            .service
            .list_by_status(OrderStatus::Processando)
            .await
            .unwrap();
        assert_eq!(processing.len(), 1);
        assert_eq!(processing[0].id, ids[1]);

        let open = fx.service.list_by_status(OrderStatus::Aberto).await.unwrap();
        assert_eq!(open.len(), 2);
    }

    #[tokio::test]
    async fn listing_pages_newest_first() {
        let fx = fixture(100).await;
        for _ in 0..3 {
            fx.service
                .create(fx.client_id, vec![item(fx.product_id, 1, Decimal::ONE)])
                .await
                .unwrap();
        }

        let page = fx.service.list(0, 2).await.unwrap();
        assert_eq!(page.content.len(), 2);
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.total_pages, 2);
        assert!(page.first);
        assert!(!page.last);
        assert!(page.content[0].created_at >= page.content[1].created_at);

        let by_client = fx.service.list_by_client(fx.client_id).await.unwrap();
        assert_eq!(by_client.len(), 3);
        assert!(fx
            .service
            .list_by_client(Uuid::now_v7())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let fx = fixture(5).await;
        for result in [
            fx.service.get(Uuid::now_v7()).await,
            fx.service.process(Uuid::now_v7()).await,
            fx.service.complete(Uuid::now_v7()).await,
            fx.service.cancel(Uuid::now_v7()).await,
        ] {
            assert!(matches!(result.unwrap_err(), ErpError::NotFound(_)));
        }
    }
}
