//! Order aggregate.
//!
//! An order owns its lines and its status. The total is the sum of the line
//! subtotals, computed once at creation and never recomputed afterwards:
//! line prices are snapshots supplied by the caller, not live catalog
//! prices. Status transitions are guarded here; the stock side effect of
//! concluding an order lives in the store layer.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErpError;

/// Status workflow: ABERTO → PROCESSANDO → CONCLUIDO, with CANCELADO
/// reachable from the two non-terminal states. CONCLUIDO and CANCELADO are
/// terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "order_status", rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Aberto,
    Processando,
    Concluido,
    Cancelado,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            OrderStatus::Aberto => "ABERTO",
            OrderStatus::Processando => "PROCESSANDO",
            OrderStatus::Concluido => "CONCLUIDO",
            OrderStatus::Cancelado => "CANCELADO",
        };
        write!(f, "{token}")
    }
}

impl FromStr for OrderStatus {
    type Err = ErpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ABERTO" => Ok(OrderStatus::Aberto),
            "PROCESSANDO" => Ok(OrderStatus::Processando),
            "CONCLUIDO" => Ok(OrderStatus::Concluido),
            "CANCELADO" => Ok(OrderStatus::Cancelado),
            _ => Err(ErpError::InvalidStatus(s.to_string())),
        }
    }
}

/// One product + quantity + snapshot price entry within an order.
#[derive(Clone, Debug)]
pub struct OrderLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderLine {
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Clone, Debug)]
pub struct Order {
    pub id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub total: Decimal,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Builds a new order in ABERTO with the total fixed from its lines.
    /// Orders must carry at least one line.
    pub fn create(
        client_id: Uuid,
        client_name: impl Into<String>,
        lines: Vec<OrderLine>,
    ) -> Result<Self, ErpError> {
        if lines.is_empty() {
            return Err(ErpError::BusinessRule(
                "Pedido deve conter ao menos um item".into(),
            ));
        }
        let total = lines.iter().map(OrderLine::subtotal).sum();
        Ok(Self {
            id: Uuid::now_v7(),
            client_id,
            client_name: client_name.into(),
            created_at: Utc::now(),
            status: OrderStatus::Aberto,
            total,
            lines,
        })
    }

    pub fn process(&mut self) -> Result<(), ErpError> {
        if self.status != OrderStatus::Aberto {
            return Err(ErpError::InvalidTransition(
                "Apenas pedidos em aberto podem ser processados".into(),
            ));
        }
        self.status = OrderStatus::Processando;
        Ok(())
    }

    pub fn conclude(&mut self) -> Result<(), ErpError> {
        if self.status != OrderStatus::Processando {
            return Err(ErpError::InvalidTransition(
                "Apenas pedidos em processamento podem ser concluídos".into(),
            ));
        }
        self.status = OrderStatus::Concluido;
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), ErpError> {
        if !matches!(self.status, OrderStatus::Aberto | OrderStatus::Processando) {
            return Err(ErpError::InvalidTransition(
                "Pedidos concluídos ou cancelados não podem ser cancelados".into(),
            ));
        }
        self.status = OrderStatus::Cancelado;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i32, unit_price: Decimal) -> OrderLine {
        OrderLine {
            id: Uuid::now_v7(),
            product_id: Uuid::now_v7(),
            product_name: "Caneta Azul".into(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn total_is_the_sum_of_line_subtotals() {
        let order = Order::create(
            Uuid::now_v7(),
            "Maria",
            vec![line(2, Decimal::new(1050, 2)), line(1, Decimal::new(500, 2))],
        )
        .unwrap();
        assert_eq!(order.total, Decimal::new(2600, 2));
        assert_eq!(order.status, OrderStatus::Aberto);
    }

    #[test]
    fn rejects_empty_orders() {
        let err = Order::create(Uuid::now_v7(), "Maria", vec![]).unwrap_err();
        assert!(matches!(err, ErpError::BusinessRule(_)));
    }

    #[test]
    fn process_only_from_aberto() {
        let mut order =
            Order::create(Uuid::now_v7(), "Maria", vec![line(2, Decimal::new(1050, 2))]).unwrap();
        order.process().unwrap();
        assert_eq!(order.status, OrderStatus::Processando);
        let err = order.process().unwrap_err();
        assert!(matches!(err, ErpError::InvalidTransition(_)));
        assert_eq!(order.status, OrderStatus::Processando);
    }

    #[test]
    fn conclude_only_from_processando() {
        let mut order =
            Order::create(Uuid::now_v7(), "Maria", vec![line(1, Decimal::ONE)]).unwrap();
        assert!(order.conclude().is_err());
        order.process().unwrap();
        order.conclude().unwrap();
        assert_eq!(order.status, OrderStatus::Concluido);
    }

    #[test]
    fn terminal_states_cannot_be_cancelled() {
        let mut order =
            Order::create(Uuid::now_v7(), "Maria", vec![line(1, Decimal::ONE)]).unwrap();
        order.process().unwrap();
        order.conclude().unwrap();
        assert!(order.cancel().is_err());
        assert_eq!(order.status, OrderStatus::Concluido);

        let mut other =
            Order::create(Uuid::now_v7(), "Maria", vec![line(1, Decimal::ONE)]).unwrap();
        other.cancel().unwrap();
        assert!(other.cancel().is_err());
        assert_eq!(other.status, OrderStatus::Cancelado);
    }

    #[test]
    fn status_tokens_round_trip() {
        for token in ["ABERTO", "PROCESSANDO", "CONCLUIDO", "CANCELADO"] {
            let status: OrderStatus = token.parse().unwrap();
            assert_eq!(status.to_string(), token);
        }
        assert!("FECHADO".parse::<OrderStatus>().is_err());
        assert_eq!(
            "processando".parse::<OrderStatus>().unwrap(),
            OrderStatus::Processando
        );
    }
}
