//! In-process order store

use async_trait::async_trait;
use parking_lot::RwLock;
use shared::models::{Order, OrderLine, OrderLineStatus, OrderStatus};
use shared::util::now_millis;
use std::collections::HashMap;

use super::gateway::{GatewayError, GatewayResult, OrderGateway};

#[derive(Default)]
struct Inner {
    orders: HashMap<i64, Order>,
    /// line id -> order id
    line_index: HashMap<i64, i64>,
}

/// Process-local [`OrderGateway`]
///
/// Transitions take the write lock, so the compare-and-set is atomic with
/// respect to every other caller in the process.
#[derive(Default)]
pub struct MemoryOrderGateway {
    inner: RwLock<Inner>,
}

impl MemoryOrderGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an order and index its lines
    pub fn upsert_order(&self, order: Order) {
        let mut inner = self.inner.write();
        if let Some(previous) = inner.orders.remove(&order.id) {
            for line in &previous.lines {
                inner.line_index.remove(&line.id);
            }
        }
        for line in &order.lines {
            inner.line_index.insert(line.id, order.id);
        }
        inner.orders.insert(order.id, order);
    }

    /// Force a line status, bypassing compare-and-set (waiter actions such as cancel)
    pub fn set_line_status(&self, line_id: i64, status: OrderLineStatus) -> GatewayResult<()> {
        let mut inner = self.inner.write();
        let line = line_mut(&mut inner, line_id)?;
        line.set_status(status, now_millis());
        Ok(())
    }
}

fn line_mut(inner: &mut Inner, line_id: i64) -> GatewayResult<&mut OrderLine> {
    let order_id = *inner
        .line_index
        .get(&line_id)
        .ok_or(GatewayError::LineNotFound(line_id))?;
    inner
        .orders
        .get_mut(&order_id)
        .and_then(|o| o.lines.iter_mut().find(|l| l.id == line_id))
        .ok_or(GatewayError::LineNotFound(line_id))
}

#[async_trait]
impl OrderGateway for MemoryOrderGateway {
    async fn get_order(&self, order_id: i64) -> GatewayResult<Order> {
        self.inner
            .read()
            .orders
            .get(&order_id)
            .cloned()
            .ok_or(GatewayError::OrderNotFound(order_id))
    }

    async fn get_line(&self, line_id: i64) -> GatewayResult<OrderLine> {
        let inner = self.inner.read();
        inner
            .line_index
            .get(&line_id)
            .and_then(|order_id| inner.orders.get(order_id))
            .and_then(|o| o.lines.iter().find(|l| l.id == line_id))
            .cloned()
            .ok_or(GatewayError::LineNotFound(line_id))
    }

    async fn list_open_orders(&self) -> GatewayResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .inner
            .read()
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::Created)
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    async fn transition_line(
        &self,
        line_id: i64,
        from: OrderLineStatus,
        to: OrderLineStatus,
    ) -> GatewayResult<bool> {
        let mut inner = self.inner.write();
        let line = line_mut(&mut inner, line_id)?;
        if line.status != from {
            return Ok(false);
        }
        line.set_status(to, now_millis());
        Ok(true)
    }

    async fn transition_order(
        &self,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> GatewayResult<bool> {
        let mut inner = self.inner.write();
        let order = inner
            .orders
            .get_mut(&order_id)
            .ok_or(GatewayError::OrderNotFound(order_id))?;
        if order.status != from {
            return Ok(false);
        }
        order.status = to;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        let line = |id| OrderLine {
            id,
            order_id: 1,
            name: format!("Plato {}", id),
            quantity: 1,
            notes: None,
            takeaway: false,
            status: OrderLineStatus::Created,
            created_at: 0,
            preparing_at: None,
            served_at: None,
            canceled_at: None,
        };
        Order {
            id: 1,
            status: OrderStatus::Created,
            zone: None,
            table: None,
            staff: None,
            created_at: 0,
            lines: vec![line(10), line(11)],
        }
    }

    #[tokio::test]
    async fn test_line_transition_is_compare_and_set() {
        let gateway = MemoryOrderGateway::new();
        gateway.upsert_order(order());

        assert!(
            gateway
                .transition_line(10, OrderLineStatus::Created, OrderLineStatus::Preparing)
                .await
                .unwrap()
        );
        assert!(
            !gateway
                .transition_line(10, OrderLineStatus::Created, OrderLineStatus::Preparing)
                .await
                .unwrap()
        );

        let line = gateway.get_line(10).await.unwrap();
        assert_eq!(line.status, OrderLineStatus::Preparing);
        assert!(line.preparing_at.is_some());
    }

    #[tokio::test]
    async fn test_missing_records() {
        let gateway = MemoryOrderGateway::new();
        assert!(matches!(
            gateway.get_order(9).await,
            Err(GatewayError::OrderNotFound(9))
        ));
        assert!(matches!(
            gateway
                .transition_line(99, OrderLineStatus::Created, OrderLineStatus::Preparing)
                .await,
            Err(GatewayError::LineNotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_open_orders_and_order_transition() {
        let gateway = MemoryOrderGateway::new();
        gateway.upsert_order(order());
        assert_eq!(gateway.list_open_orders().await.unwrap().len(), 1);

        assert!(
            gateway
                .transition_order(1, OrderStatus::Created, OrderStatus::Preparing)
                .await
                .unwrap()
        );
        assert!(gateway.list_open_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_reindexes_lines() {
        let gateway = MemoryOrderGateway::new();
        gateway.upsert_order(order());

        let mut replaced = order();
        replaced.lines.truncate(1);
        gateway.upsert_order(replaced);

        assert!(gateway.get_line(10).await.is_ok());
        assert!(gateway.get_line(11).await.is_err());

        gateway.set_line_status(10, OrderLineStatus::Canceled).unwrap();
        assert!(gateway.get_line(10).await.unwrap().is_canceled());
    }
}
