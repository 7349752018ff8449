use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};
use shared::models::{Order, OrderLine, OrderLineStatus, OrderStatus};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Order {0} not found")]
    OrderNotFound(i64),

    #[error("Order line {0} not found")]
    LineNotFound(i64),

    #[error("Order service request failed: {0}")]
    Request(String),

    #[error("Order service timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unexpected order service response: {0}")]
    Response(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        let code = match &err {
            GatewayError::OrderNotFound(_) => ErrorCode::OrderNotFound,
            GatewayError::LineNotFound(_) => ErrorCode::OrderItemNotFound,
            GatewayError::Timeout(_) => ErrorCode::TimeoutError,
            GatewayError::Request(_) | GatewayError::Response(_) => ErrorCode::NetworkError,
        };
        AppError::with_message(code, err.to_string())
    }
}

/// Read and transition access to orders
///
/// Transitions are compare-and-set: they return `Ok(false)` when the current
/// status is no longer `from`, which callers treat as "someone else already
/// did it" rather than as an error.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Fetch an order with all of its lines
    async fn get_order(&self, order_id: i64) -> GatewayResult<Order>;

    /// Fetch a single order line
    async fn get_line(&self, line_id: i64) -> GatewayResult<OrderLine>;

    /// Orders still in CREATED, candidates for reconciliation
    async fn list_open_orders(&self) -> GatewayResult<Vec<Order>>;

    async fn transition_line(
        &self,
        line_id: i64,
        from: OrderLineStatus,
        to: OrderLineStatus,
    ) -> GatewayResult<bool>;

    async fn transition_order(
        &self,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> GatewayResult<bool>;
}
