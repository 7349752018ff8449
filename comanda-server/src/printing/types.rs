//! Kitchen printing types

use serde::{Deserialize, Serialize};
use shared::models::Order;

/// Order-level data printed on every ticket of the order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderContext {
    pub order_id: i64,
    pub zone: Option<String>,
    pub table: Option<String>,
    /// Assigned waiter
    pub staff: Option<String>,
    /// Any line of the order is packed to go
    pub any_takeaway: bool,
    /// Order creation time (millis)
    pub created_at: i64,
}

impl From<&Order> for OrderContext {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            zone: order.zone.clone(),
            table: order.table.clone(),
            staff: order.staff.clone(),
            any_takeaway: order.has_takeaway(),
            created_at: order.created_at,
        }
    }
}

/// Failure isolated to one line during a reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSyncError {
    pub line_id: i64,
    pub message: String,
}

/// Outcome of one reconciliation pass over an order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub order_id: i64,
    /// Lines moved CREATED -> PREPARING by this pass
    pub advanced: u32,
    /// FAILED jobs sent back to PENDING
    pub retried: u32,
    /// Lines whose job is PENDING or IN_PROGRESS
    pub in_flight: u32,
    /// Lines whose job FAILED without remaining budget
    pub exhausted: u32,
    /// Lines without any job
    pub missing: u32,
    /// Jobs created for missing lines
    pub enqueued: u32,
    pub errors: Vec<LineSyncError>,
    /// This pass moved the order CREATED -> PREPARING
    pub order_advanced: bool,
}

impl SyncReport {
    pub fn new(order_id: i64) -> Self {
        Self {
            order_id,
            ..Default::default()
        }
    }

    /// Whether the pass changed any state
    pub fn changed_anything(&self) -> bool {
        self.advanced > 0 || self.retried > 0 || self.enqueued > 0 || self.order_advanced
    }
}
